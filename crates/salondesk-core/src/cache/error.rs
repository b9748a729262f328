use std::sync::Arc;

use thiserror::Error;

use crate::api::ApiError;

/// Failure of a location cache operation.
///
/// Cloneable so one backend failure can be handed to every caller that
/// joined the same fetch, and kept in the cache entry.
#[derive(Error, Debug, Clone)]
pub enum LocationError {
    #[error("Business ID is required")]
    MissingBusinessId,

    #[error(transparent)]
    Backend(Arc<ApiError>),

    #[error("Location fetch task failed: {0}")]
    Interrupted(String),
}

impl From<ApiError> for LocationError {
    fn from(err: ApiError) -> Self {
        LocationError::Backend(Arc::new(err))
    }
}

impl LocationError {
    /// The backend error behind this failure, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            LocationError::Backend(err) => Some(err),
            _ => None,
        }
    }

    /// True when both values carry the very same backend failure
    pub fn same_failure(&self, other: &LocationError) -> bool {
        match (self, other) {
            (LocationError::Backend(a), LocationError::Backend(b)) => Arc::ptr_eq(a, b),
            (LocationError::MissingBusinessId, LocationError::MissingBusinessId) => true,
            (LocationError::Interrupted(a), LocationError::Interrupted(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(LocationError::MissingBusinessId.to_string(), "Business ID is required");

        let err = LocationError::from(ApiError::NotFound("b9".to_string()));
        assert_eq!(err.to_string(), "Resource not found: b9");
        assert!(matches!(err.api_error(), Some(ApiError::NotFound(_))));
    }

    #[test]
    fn test_same_failure_compares_identity() {
        let err = LocationError::from(ApiError::RateLimited);
        let shared = err.clone();
        let other = LocationError::from(ApiError::RateLimited);

        assert!(err.same_failure(&shared));
        assert!(!err.same_failure(&other));
        assert!(!err.same_failure(&LocationError::MissingBusinessId));
    }
}
