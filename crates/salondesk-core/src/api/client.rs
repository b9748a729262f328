//! API client for communicating with the SalonDesk REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests against the location endpoints and the login endpoint.

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::auth::SessionData;
use crate::models::{Location, LocationRequest, LocationsResponse};

use super::{ApiError, LocationBackend};

// ============================================================================
// Constants
// ============================================================================

/// Backend address used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:81";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<LoginToken>,
}

#[derive(Debug, Deserialize)]
struct LoginToken {
    access_token: Option<String>,
}

/// API client for the SalonDesk backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Log in with email and password and return a fresh session
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<SessionData, ApiError> {
        let url = self.endpoint(&["api", "v1", "auth", "login"])?;
        let builder = self
            .client
            .post(url.clone())
            .json(&LoginRequest { email, password });

        let body = self.send(builder).await?;
        let login: LoginResponse = Self::decode(&url, body)?;

        let token = login
            .token
            .and_then(|t| t.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("No access token in response".to_string()))?;

        Ok(SessionData::new(token, email))
    }

    /// Build an endpoint URL by appending percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn locations_url(&self, business_id: &str) -> Result<Url, ApiError> {
        self.endpoint(&["api", "v1", "businesses", business_id, "locations"])
    }

    fn location_url(&self, business_id: &str, location_id: &str) -> Result<Url, ApiError> {
        self.endpoint(&["api", "v1", "businesses", business_id, "locations", location_id])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json");
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request and return its body, or `None` when the body is empty.
    async fn send(&self, builder: RequestBuilder) -> Result<Option<String>, ApiError> {
        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    fn decode<T: DeserializeOwned>(url: &Url, body: Option<String>) -> Result<T, ApiError> {
        let body = body
            .ok_or_else(|| ApiError::InvalidResponse(format!("Empty response body from {}", url)))?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let body = self.send(self.request(Method::GET, url.clone())).await?;
        Self::decode(&url, body)
    }

    async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(method, url.clone()).json(body);
        let body = self.send(builder).await?;
        Self::decode(&url, body)
    }

    // ===== Location Endpoints =====

    /// Fetch every location of a business
    pub async fn fetch_locations(&self, business_id: &str) -> Result<Vec<Location>, ApiError> {
        let url = self.locations_url(business_id)?;
        let response: LocationsResponse = self.get(url).await?;
        debug!(business_id = %business_id, count = response.locations.len(), "Fetched locations");
        Ok(response.locations)
    }

    /// Fetch a single location
    pub async fn fetch_location(&self, business_id: &str, location_id: &str) -> Result<Location, ApiError> {
        let url = self.location_url(business_id, location_id)?;
        self.get(url).await
    }

    pub async fn post_location(
        &self,
        business_id: &str,
        location: &LocationRequest,
    ) -> Result<Location, ApiError> {
        let url = self.locations_url(business_id)?;
        self.send_json(Method::POST, url, location).await
    }

    pub async fn put_location(
        &self,
        business_id: &str,
        location_id: &str,
        location: &LocationRequest,
    ) -> Result<Location, ApiError> {
        let url = self.location_url(business_id, location_id)?;
        self.send_json(Method::PUT, url, location).await
    }

    /// Delete a location. The backend answers with an empty body.
    pub async fn remove_location(&self, business_id: &str, location_id: &str) -> Result<(), ApiError> {
        let url = self.location_url(business_id, location_id)?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

impl LocationBackend for ApiClient {
    async fn list_locations(&self, business_id: &str) -> Result<Vec<Location>, ApiError> {
        self.fetch_locations(business_id).await
    }

    async fn get_location(&self, business_id: &str, location_id: &str) -> Result<Location, ApiError> {
        self.fetch_location(business_id, location_id).await
    }

    async fn create_location(
        &self,
        business_id: &str,
        location: &LocationRequest,
    ) -> Result<Location, ApiError> {
        self.post_location(business_id, location).await
    }

    async fn update_location(
        &self,
        business_id: &str,
        location_id: &str,
        location: &LocationRequest,
    ) -> Result<Location, ApiError> {
        self.put_location(business_id, location_id, location).await
    }

    async fn delete_location(&self, business_id: &str, location_id: &str) -> Result<(), ApiError> {
        self.remove_location(business_id, location_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn location_json(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "business_id": "b1",
            "name": "Downtown",
            "address": "12 Main St",
            "city": "Springfield",
            "contact_info": "555-0100",
            "timezone": "America/Chicago",
            "created_at": "2024-03-01T09:00:00Z",
            "updated_at": "2024-03-01T09:00:00Z"
        })
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = ApiClient::new("http://localhost:81").unwrap();
        let url = client.locations_url("b 1/x").unwrap();
        assert_eq!(url.path(), "/api/v1/businesses/b%201%2Fx/locations");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ApiClient::new("https://example.com/salon/").unwrap();
        let url = client.location_url("b1", "loc-1").unwrap();
        assert_eq!(url.as_str(), "https://example.com/salon/api/v1/businesses/b1/locations/loc-1");
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        assert!(matches!(ApiClient::new("not a url"), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(ApiClient::new("mailto:someone@example.com"), Err(ApiError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_locations_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/businesses/b1/locations")
            .match_header("authorization", "Bearer secret-token")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "locations": [location_json("loc-1"), location_json("loc-2")] }).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url())
            .unwrap()
            .with_token("secret-token".to_string());
        let locations = client.fetch_locations("b1").await.unwrap();

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[1].id, "loc-2");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_authorization_header_without_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/businesses/b1/locations/loc-1")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(location_json("loc-1").to_string())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let location = client.fetch_location("b1", "loc-1").await.unwrap();
        assert_eq!(location.name, "Downtown");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_mapped() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/businesses/b1/locations")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.fetch_locations("b1").await.unwrap_err();
        assert!(matches!(err, ApiError::ServerError(ref body) if body == "maintenance"));
    }

    #[tokio::test]
    async fn test_empty_and_malformed_bodies() {
        let mut server = Server::new_async().await;
        let _empty = server
            .mock("GET", "/api/v1/businesses/empty/locations")
            .with_status(200)
            .create_async()
            .await;
        let _garbage = server
            .mock("GET", "/api/v1/businesses/garbage/locations")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        assert!(matches!(
            client.fetch_locations("empty").await,
            Err(ApiError::InvalidResponse(_))
        ));
        assert!(matches!(
            client.fetch_locations("garbage").await,
            Err(ApiError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let mut server = Server::new_async().await;
        let request = LocationRequest {
            name: "Downtown".to_string(),
            address: "12 Main St".to_string(),
            city: "Springfield".to_string(),
            contact_info: "555-0100".to_string(),
            timezone: "America/Chicago".to_string(),
        };

        let create = server
            .mock("POST", "/api/v1/businesses/b1/locations")
            .match_body(Matcher::Json(serde_json::to_value(&request).unwrap()))
            .with_status(201)
            .with_body(location_json("loc-9").to_string())
            .create_async()
            .await;
        let update = server
            .mock("PUT", "/api/v1/businesses/b1/locations/loc-9")
            .match_body(Matcher::PartialJson(serde_json::json!({ "name": "Downtown" })))
            .with_status(200)
            .with_body(location_json("loc-9").to_string())
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/v1/businesses/b1/locations/loc-9")
            .with_status(204)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let created = client.post_location("b1", &request).await.unwrap();
        assert_eq!(created.id, "loc-9");
        client.put_location("b1", "loc-9", &request).await.unwrap();
        client.remove_location("b1", "loc-9").await.unwrap();

        create.assert_async().await;
        update.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate() {
        let mut server = Server::new_async().await;
        let _ok = server
            .mock("POST", "/api/v1/auth/login")
            .match_body(Matcher::Json(serde_json::json!({ "email": "owner@salon.test", "password": "pw" })))
            .with_status(200)
            .with_body(r#"{"token":{"access_token":"abc123","token_type":"bearer"}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let session = client.authenticate("owner@salon.test", "pw").await.unwrap();
        assert_eq!(session.token, "abc123");
        assert_eq!(session.email, "owner@salon.test");
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn test_authenticate_without_token() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("POST", "/api/v1/auth/login")
            .with_status(200)
            .with_body(r#"{"token":null}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.authenticate("owner@salon.test", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
