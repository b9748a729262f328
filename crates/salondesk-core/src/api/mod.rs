//! REST API client module for the SalonDesk backend.
//!
//! This module provides the `ApiClient` for reading and mutating a
//! business's locations, and the `LocationBackend` trait the location
//! cache fetches through.
//!
//! The API uses bearer token authentication obtained from the
//! `/api/v1/auth/login` endpoint.

pub mod client;
pub mod error;

use std::future::Future;

pub use client::ApiClient;
pub use error::ApiError;

use crate::models::{Location, LocationRequest};

/// Source of location data for the cache.
///
/// `ApiClient` is the production implementation; tests substitute an
/// in-memory backend.
pub trait LocationBackend: Send + Sync + 'static {
    fn list_locations(
        &self,
        business_id: &str,
    ) -> impl Future<Output = Result<Vec<Location>, ApiError>> + Send;

    fn get_location(
        &self,
        business_id: &str,
        location_id: &str,
    ) -> impl Future<Output = Result<Location, ApiError>> + Send;

    fn create_location(
        &self,
        business_id: &str,
        location: &LocationRequest,
    ) -> impl Future<Output = Result<Location, ApiError>> + Send;

    fn update_location(
        &self,
        business_id: &str,
        location_id: &str,
        location: &LocationRequest,
    ) -> impl Future<Output = Result<Location, ApiError>> + Send;

    fn delete_location(
        &self,
        business_id: &str,
        location_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}
