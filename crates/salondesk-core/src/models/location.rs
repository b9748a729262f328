//! Location models.
//!
//! A location is a physical site belonging to a business, with address and
//! timezone metadata. The backend owns these records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A business location as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact_info: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    /// Format the address as a single line, skipping empty parts.
    pub fn display_address(&self) -> String {
        [self.address.trim(), self.city.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Body of create and update requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRequest {
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact_info: String,
    pub timezone: String,
}

impl From<&Location> for LocationRequest {
    fn from(location: &Location) -> Self {
        Self {
            name: location.name.clone(),
            address: location.address.clone(),
            city: location.city.clone(),
            contact_info: location.contact_info.clone(),
            timezone: location.timezone.clone(),
        }
    }
}

/// Envelope of the location list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationsResponse {
    pub locations: Vec<Location>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{"locations":[{"id":"loc-1","business_id":"b1","name":"Downtown","address":"12 Main St","city":"Springfield","contact_info":"555-0100","timezone":"America/Chicago","created_at":"2024-03-01T09:00:00Z","updated_at":"2024-03-02T10:30:00Z"}]}"#
    }

    #[test]
    fn test_parse_locations_response() {
        let resp: LocationsResponse =
            serde_json::from_str(sample_json()).expect("Failed to parse locations test JSON");
        assert_eq!(resp.locations.len(), 1);

        let loc = &resp.locations[0];
        assert_eq!(loc.id, "loc-1");
        assert_eq!(loc.business_id, "b1");
        assert_eq!(loc.timezone, "America/Chicago");
        assert_eq!(loc.created_at.to_rfc3339(), "2024-03-01T09:00:00+00:00");
    }

    #[test]
    fn test_display_address() {
        let resp: LocationsResponse = serde_json::from_str(sample_json()).unwrap();
        let mut loc = resp.locations[0].clone();
        assert_eq!(loc.display_address(), "12 Main St, Springfield");

        loc.city = "  ".to_string();
        assert_eq!(loc.display_address(), "12 Main St");

        loc.address = String::new();
        assert_eq!(loc.display_address(), "");
    }

    #[test]
    fn test_request_from_location() {
        let resp: LocationsResponse = serde_json::from_str(sample_json()).unwrap();
        let req = LocationRequest::from(&resp.locations[0]);
        assert_eq!(req.name, "Downtown");
        assert_eq!(req.contact_info, "555-0100");

        let body = serde_json::to_value(&req).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["city"], "Springfield");
    }
}
