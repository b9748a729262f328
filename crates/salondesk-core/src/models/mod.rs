//! Data models for SalonDesk entities.
//!
//! Only the location family lives here; the cache treats these as opaque
//! snapshots of what the backend returned.

pub mod location;

pub use location::{Location, LocationRequest, LocationsResponse};
