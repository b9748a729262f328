//! Core library for SalonDesk.
//!
//! - `api`: REST client for the SalonDesk backend
//! - `auth`: persisted bearer-token session
//! - `cache`: coalescing, TTL-based location cache
//! - `config`: application configuration
//! - `models`: location data types

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, LocationBackend};
pub use auth::{Session, SessionData};
pub use cache::{CacheSettings, FetchOptions, LocationCache, LocationError, RequestMonitor};
pub use config::Config;
pub use models::{Location, LocationRequest, LocationsResponse};
