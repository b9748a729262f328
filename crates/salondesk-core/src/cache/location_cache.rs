//! Coalescing, TTL-based cache of each business's location list.
//!
//! Reads go through [`LocationCache::get_locations`], which answers from
//! memory when it can, attaches to an in-flight fetch when one exists, and
//! otherwise issues a single fetch to the backend. All bookkeeping lives in
//! one mutex that is never held across an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::LocationBackend;
use crate::models::{Location, LocationRequest};

use super::{CacheSettings, LocationError, RequestMonitor};

pub type Locations = Arc<Vec<Location>>;
pub type FetchResult = Result<Locations, LocationError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Per-call options for [`LocationCache::get_locations`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Skip the cached entry (an in-flight fetch is still joined)
    pub force_refresh: bool,
    /// Override of the success TTL for this call
    pub cache_ttl: Option<Duration>,
}

impl FetchOptions {
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            cache_ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }
}

/// Outcome of the last fetch for one business.
///
/// A failed fetch is stored with empty data and lives for the error TTL.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    data: Locations,
    fetched_at: Instant,
    error: Option<LocationError>,
}

impl CacheEntry {
    fn success(data: Locations, fetched_at: Instant) -> Self {
        Self {
            data,
            fetched_at,
            error: None,
        }
    }

    fn failure(error: LocationError, fetched_at: Instant) -> Self {
        Self {
            data: Arc::new(Vec::new()),
            fetched_at,
            error: Some(error),
        }
    }

    fn is_fresh(&self, now: Instant, success_ttl: Duration, error_ttl: Duration) -> bool {
        let ttl = if self.error.is_some() { error_ttl } else { success_ttl };
        now.saturating_duration_since(self.fetched_at) < ttl
    }

    fn outcome(&self) -> FetchResult {
        match self.error {
            Some(ref err) => Err(err.clone()),
            None => Ok(Arc::clone(&self.data)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub pending_requests: usize,
    pub last_request_times: usize,
}

/// Read-only view of one cache entry, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub business_id: String,
    pub age: Duration,
    pub has_error: bool,
    pub data_len: usize,
}

struct PendingFetch {
    ticket: u64,
    fetch: SharedFetch,
    /// Set when the entry was cleared while this fetch was running; its
    /// result goes to the callers already waiting on it, is not stored, and
    /// later readers wait for it to finish before fetching again.
    invalidated: bool,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    pending: HashMap<String, PendingFetch>,
    last_request: HashMap<String, Instant>,
    next_ticket: u64,
}

impl CacheState {
    fn throttle_remaining(&self, business_id: &str, now: Instant, min_interval: Duration) -> Option<Duration> {
        let last = self.last_request.get(business_id)?;
        let elapsed = now.saturating_duration_since(*last);
        (elapsed < min_interval).then(|| min_interval - elapsed)
    }
}

enum Step {
    Done(FetchResult),
    Join(SharedFetch),
    /// Wait for an invalidated fetch to finish, then start over
    Outlast(SharedFetch),
    Wait(Duration),
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn require_business_id(business_id: &str) -> Result<(), LocationError> {
    if business_id.trim().is_empty() {
        return Err(LocationError::MissingBusinessId);
    }
    Ok(())
}

/// Record the outcome of fetch `ticket`. Results of fetches that are no
/// longer the registered one for the business are dropped.
fn settle(state: &Mutex<CacheState>, business_id: &str, ticket: u64, result: &FetchResult) {
    let mut state = lock(state);
    let invalidated = match state.pending.get(business_id) {
        Some(pending) if pending.ticket == ticket => pending.invalidated,
        _ => {
            debug!(business_id = %business_id, "Discarding result of detached location fetch");
            return;
        }
    };

    let now = Instant::now();
    state.pending.remove(business_id);
    state.last_request.insert(business_id.to_string(), now);

    if invalidated {
        debug!(business_id = %business_id, "Location cache cleared during fetch, result not stored");
        return;
    }

    let entry = match result {
        Ok(data) => CacheEntry::success(Arc::clone(data), now),
        Err(err) => {
            warn!(business_id = %business_id, error = %err, "Location fetch failed, caching error");
            CacheEntry::failure(err.clone(), now)
        }
    };
    state.entries.insert(business_id.to_string(), entry);
}

fn sweep(state: &Mutex<CacheState>, settings: &CacheSettings) -> usize {
    let mut state = lock(state);
    let now = Instant::now();
    let (success_ttl, error_ttl) = (settings.success_ttl(), settings.error_ttl());
    let min_interval = settings.min_request_interval();

    let before = state.entries.len();
    state.entries.retain(|_, entry| entry.is_fresh(now, success_ttl, error_ttl));
    state
        .last_request
        .retain(|_, at| now.saturating_duration_since(*at) < min_interval);

    let removed = before - state.entries.len();
    if removed > 0 {
        debug!(removed, "Cleaned up expired location cache entries");
    }
    removed
}

/// Location cache over a [`LocationBackend`].
///
/// Cloning is cheap and every clone shares the same state, so one instance
/// per session can be handed to whoever needs it.
pub struct LocationCache<B> {
    backend: Arc<B>,
    state: Arc<Mutex<CacheState>>,
    settings: CacheSettings,
    monitor: Arc<RequestMonitor>,
}

impl<B> Clone for LocationCache<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            settings: self.settings.clone(),
            monitor: Arc::clone(&self.monitor),
        }
    }
}

impl<B: LocationBackend> LocationCache<B> {
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, CacheSettings::default())
    }

    pub fn with_settings(backend: B, settings: CacheSettings) -> Self {
        Self {
            backend: Arc::new(backend),
            state: Arc::new(Mutex::new(CacheState::default())),
            settings,
            monitor: Arc::new(RequestMonitor::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn monitor(&self) -> &RequestMonitor {
        &self.monitor
    }

    /// Return the locations of a business.
    ///
    /// Order of resolution:
    /// 1. a fresh cache entry (unless `force_refresh`), returned without
    ///    suspending; a cached failure is returned as the error
    /// 2. the fetch already in flight for this business, shared; if the
    ///    cache was cleared since it started, wait for it to finish and
    ///    resolve again instead of taking its result
    /// 3. if the previous fetch finished less than the minimum interval ago,
    ///    sleep out the remainder and check 1 and 2 once more
    /// 4. a new backend fetch
    pub async fn get_locations(&self, business_id: &str, options: FetchOptions) -> FetchResult {
        require_business_id(business_id)?;
        self.monitor.record_request(business_id);

        let mut throttle = true;
        loop {
            match self.next_step(business_id, options, throttle) {
                Step::Done(result) => return result,
                Step::Join(fetch) => return fetch.await,
                Step::Outlast(fetch) => {
                    debug!(business_id = %business_id, "Waiting out invalidated location request");
                    let _ = fetch.await;
                }
                Step::Wait(wait) => {
                    debug!(
                        business_id = %business_id,
                        wait = ?wait,
                        "Location request throttled, waiting"
                    );
                    tokio::time::sleep(wait).await;
                    throttle = false;
                }
            }
        }
    }

    fn next_step(&self, business_id: &str, options: FetchOptions, throttle: bool) -> Step {
        let mut state = lock(&self.state);
        let now = Instant::now();

        if !options.force_refresh {
            let ttl = options.cache_ttl.unwrap_or_else(|| self.settings.success_ttl());
            if let Some(entry) = state.entries.get(business_id) {
                if entry.is_fresh(now, ttl, self.settings.error_ttl()) {
                    if entry.error.is_none() {
                        self.monitor.record_cache_hit(business_id);
                    }
                    debug!(business_id = %business_id, "Returning cached locations");
                    return Step::Done(entry.outcome());
                }
            }
        }

        if let Some(pending) = state.pending.get(business_id) {
            if pending.invalidated {
                return Step::Outlast(pending.fetch.clone());
            }
            self.monitor.record_pending_join(business_id);
            debug!(business_id = %business_id, "Joining pending location request");
            return Step::Join(pending.fetch.clone());
        }

        if throttle {
            let min_interval = self.settings.min_request_interval();
            if let Some(wait) = state.throttle_remaining(business_id, now, min_interval) {
                return Step::Wait(wait);
            }
        }

        Step::Join(self.start_fetch(&mut state, business_id))
    }

    /// Spawn the backend fetch and register it as pending. Runs under the
    /// state lock, so the task cannot settle before it is registered.
    fn start_fetch(&self, state: &mut CacheState, business_id: &str) -> SharedFetch {
        state.next_ticket += 1;
        let ticket = state.next_ticket;
        debug!(business_id = %business_id, ticket, "Fetching locations from backend");

        let backend = Arc::clone(&self.backend);
        let task_state = Arc::clone(&self.state);
        let task_key = business_id.to_string();
        let handle = tokio::spawn(async move {
            let result: FetchResult = backend
                .list_locations(&task_key)
                .await
                .map(Arc::new)
                .map_err(LocationError::from);
            settle(&task_state, &task_key, ticket, &result);
            result
        });

        let cleanup_state: Weak<Mutex<CacheState>> = Arc::downgrade(&self.state);
        let cleanup_key = business_id.to_string();
        let fetch = async move {
            match handle.await {
                Ok(result) => result,
                Err(err) => {
                    let result: FetchResult = Err(LocationError::Interrupted(err.to_string()));
                    if let Some(state) = cleanup_state.upgrade() {
                        settle(&state, &cleanup_key, ticket, &result);
                    }
                    result
                }
            }
        }
        .boxed()
        .shared();

        state.pending.insert(
            business_id.to_string(),
            PendingFetch {
                ticket,
                fetch: fetch.clone(),
                invalidated: false,
            },
        );
        fetch
    }

    /// Fetch one location. Never cached.
    pub async fn get_location(&self, business_id: &str, location_id: &str) -> Result<Location, LocationError> {
        require_business_id(business_id)?;
        Ok(self.backend.get_location(business_id, location_id).await?)
    }

    pub async fn create_location(
        &self,
        business_id: &str,
        location: &LocationRequest,
    ) -> Result<Location, LocationError> {
        require_business_id(business_id)?;
        debug!(business_id = %business_id, "Creating location");
        let result = self.backend.create_location(business_id, location).await;
        self.clear_cache(business_id);
        Ok(result?)
    }

    pub async fn update_location(
        &self,
        business_id: &str,
        location_id: &str,
        location: &LocationRequest,
    ) -> Result<Location, LocationError> {
        require_business_id(business_id)?;
        debug!(business_id = %business_id, location_id = %location_id, "Updating location");
        let result = self.backend.update_location(business_id, location_id, location).await;
        self.clear_cache(business_id);
        Ok(result?)
    }

    pub async fn delete_location(&self, business_id: &str, location_id: &str) -> Result<(), LocationError> {
        require_business_id(business_id)?;
        debug!(business_id = %business_id, location_id = %location_id, "Deleting location");
        let result = self.backend.delete_location(business_id, location_id).await;
        self.clear_cache(business_id);
        Ok(result?)
    }

    /// Spawn the periodic sweep of expired entries. The task ends on its
    /// own once every clone of the cache has been dropped.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let state = Arc::downgrade(&self.state);
        let settings = self.settings.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(settings.sweep_interval());
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(state) = state.upgrade() else {
                    debug!("Location cache dropped, stopping sweeper");
                    break;
                };
                sweep(&state, &settings);
            }
        })
    }
}

impl<B> LocationCache<B> {
    /// Drop the cached entry of one business. A fetch already in flight
    /// still answers its callers but its result is not stored.
    pub fn clear_cache(&self, business_id: &str) {
        let mut state = lock(&self.state);
        state.entries.remove(business_id);
        if let Some(pending) = state.pending.get_mut(business_id) {
            pending.invalidated = true;
        }
        debug!(business_id = %business_id, "Cleared location cache");
    }

    pub fn clear_all_cache(&self) {
        let mut state = lock(&self.state);
        state.entries.clear();
        for pending in state.pending.values_mut() {
            pending.invalidated = true;
        }
        debug!("Cleared all location cache entries");
    }

    /// Forget everything about one business: entry, pending fetch and
    /// throttle timestamp.
    ///
    /// A fetch still running is detached rather than waited for, so the next
    /// read may start a second fetch alongside it. The detached fetch's
    /// result is discarded when it settles.
    pub fn reset_business(&self, business_id: &str) {
        let mut state = lock(&self.state);
        state.entries.remove(business_id);
        state.pending.remove(business_id);
        state.last_request.remove(business_id);
    }

    /// Remove entries older than their TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        sweep(&self.state, &self.settings)
    }

    pub fn stats(&self) -> CacheStats {
        let state = lock(&self.state);
        CacheStats {
            total_entries: state.entries.len(),
            pending_requests: state.pending.len(),
            last_request_times: state.last_request.len(),
        }
    }

    pub fn inspect(&self) -> Vec<EntrySnapshot> {
        let state = lock(&self.state);
        let now = Instant::now();
        let mut snapshots: Vec<EntrySnapshot> = state
            .entries
            .iter()
            .map(|(business_id, entry)| EntrySnapshot {
                business_id: business_id.clone(),
                age: now.saturating_duration_since(entry.fetched_at),
                has_error: entry.error.is_some(),
                data_len: entry.data.len(),
            })
            .collect();
        snapshots.sort_by(|a, b| a.business_id.cmp(&b.business_id));
        snapshots
    }
}

// ============================================================================
// Tests
// ============================================================================
