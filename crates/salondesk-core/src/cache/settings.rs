use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default lifetime of a successful fetch (5 minutes)
const DEFAULT_SUCCESS_TTL_SECS: u64 = 5 * 60;

/// Default lifetime of a cached failure
const DEFAULT_ERROR_TTL_SECS: u64 = 10;

/// Default minimum spacing between fetches for one business
const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 1000;

/// Default interval of the background sweep
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Timings of the location cache, as stored in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub success_ttl_secs: u64,
    pub error_ttl_secs: u64,
    pub min_request_interval_ms: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            success_ttl_secs: DEFAULT_SUCCESS_TTL_SECS,
            error_ttl_secs: DEFAULT_ERROR_TTL_SECS,
            min_request_interval_ms: DEFAULT_MIN_REQUEST_INTERVAL_MS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl CacheSettings {
    pub fn success_ttl(&self) -> Duration {
        Duration::from_secs(self.success_ttl_secs)
    }

    pub fn error_ttl(&self) -> Duration {
        Duration::from_secs(self.error_ttl_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    /// Sweep interval, never zero (tokio intervals panic on a zero period).
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CacheSettings::default();
        assert_eq!(settings.success_ttl(), Duration::from_secs(300));
        assert_eq!(settings.error_ttl(), Duration::from_secs(10));
        assert_eq!(settings.min_request_interval(), Duration::from_secs(1));
        assert_eq!(settings.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_sweep_interval_is_clamped() {
        let settings = CacheSettings {
            sweep_interval_secs: 0,
            ..CacheSettings::default()
        };
        assert_eq!(settings.sweep_interval(), Duration::from_secs(1));
    }
}
