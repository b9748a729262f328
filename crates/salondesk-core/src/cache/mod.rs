//! In-memory location cache.
//!
//! `LocationCache` sits between callers and the backend:
//! - concurrent reads for one business share a single in-flight fetch
//! - results are served from memory for a TTL (5 minutes by default)
//! - failures are remembered for a shorter TTL (10 seconds)
//! - repeat fetches for one business are spaced at least 1 second apart
//! - mutations invalidate the business's entry
//!
//! `RequestMonitor` keeps optional hit/miss counters.

pub mod error;
pub mod location_cache;
pub mod monitor;
pub mod settings;

pub use error::LocationError;
pub use location_cache::{
    CacheStats, EntrySnapshot, FetchOptions, FetchResult, LocationCache, Locations,
};
pub use monitor::{MonitorStats, RequestMonitor};
pub use settings::CacheSettings;
