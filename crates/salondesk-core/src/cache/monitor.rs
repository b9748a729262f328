use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

/// Counters for location reads. Disabled by default; counting only
/// happens while enabled.
#[derive(Debug, Default)]
pub struct RequestMonitor {
    enabled: AtomicBool,
    requests: AtomicU64,
    cache_hits: AtomicU64,
    pending_joins: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub pending_joins: u64,
    /// Percentage of requests answered from the cache
    pub cache_hit_rate: f64,
}

impl RequestMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
        debug!("Location monitoring enabled");
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
        debug!("Location monitoring disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn record_request(&self, business_id: &str) {
        if let Some(n) = self.bump(&self.requests) {
            debug!(business_id = %business_id, request = n, "Location request");
        }
    }

    pub fn record_cache_hit(&self, business_id: &str) {
        if let Some(n) = self.bump(&self.cache_hits) {
            debug!(business_id = %business_id, hit = n, "Location cache hit");
        }
    }

    pub fn record_pending_join(&self, business_id: &str) {
        if let Some(n) = self.bump(&self.pending_joins) {
            debug!(business_id = %business_id, join = n, "Joined pending location request");
        }
    }

    pub fn stats(&self) -> MonitorStats {
        let total_requests = self.requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_hit_rate = if total_requests > 0 {
            cache_hits as f64 / total_requests as f64 * 100.0
        } else {
            0.0
        };
        MonitorStats {
            total_requests,
            cache_hits,
            pending_joins: self.pending_joins.load(Ordering::Relaxed),
            cache_hit_rate,
        }
    }

    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.pending_joins.store(0, Ordering::Relaxed);
        debug!("Location monitor stats reset");
    }

    fn bump(&self, counter: &AtomicU64) -> Option<u64> {
        if !self.is_enabled() {
            return None;
        }
        Some(counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_counts_nothing() {
        let monitor = RequestMonitor::new();
        monitor.record_request("b1");
        monitor.record_cache_hit("b1");
        assert_eq!(monitor.stats().total_requests, 0);
        assert_eq!(monitor.stats().cache_hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let monitor = RequestMonitor::new();
        monitor.enable();
        for _ in 0..4 {
            monitor.record_request("b1");
        }
        monitor.record_cache_hit("b1");
        monitor.record_pending_join("b1");

        let stats = monitor.stats();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.pending_joins, 1);
        assert_eq!(stats.cache_hit_rate, 25.0);

        monitor.reset();
        assert_eq!(monitor.stats().total_requests, 0);
        assert!(monitor.is_enabled());
    }
}
