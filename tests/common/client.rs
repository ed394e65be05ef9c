//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all songdb endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client, optionally sending basic auth credentials
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    credentials: Option<(String, String)>,
}

impl TestClient {
    /// Creates a client that sends no credentials
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            credentials: None,
        }
    }

    /// Creates a client sending [`ADMIN_USER`] / [`ADMIN_PASS`]
    pub fn authenticated(base_url: String) -> Self {
        Self::with_credentials(base_url, ADMIN_USER, ADMIN_PASS)
    }

    pub fn with_credentials(base_url: String, username: &str, password: &str) -> Self {
        Self {
            credentials: Some((username.to_string(), password.to_string())),
            ..Self::new(base_url)
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.credentials {
            Some((username, password)) => builder.basic_auth(username, Some(password)),
            None => builder,
        }
    }

    // ========================================================================
    // Song Endpoints
    // ========================================================================

    /// POST /song with `{"filter": filter}`
    pub async fn search(&self, filter: &str) -> Response {
        self.search_raw(json!({ "filter": filter })).await
    }

    /// POST /song with an arbitrary JSON body
    pub async fn search_raw(&self, body: Value) -> Response {
        self.request(reqwest::Method::POST, "/song")
            .json(&body)
            .send()
            .await
            .expect("Search request failed")
    }

    /// Searches and returns the `songs` array, asserting success
    pub async fn search_songs(&self, filter: &str) -> Vec<Value> {
        let response = self.search(filter).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Search for {:?} failed",
            filter
        );
        let body: Value = response.json().await.expect("Invalid search response");
        body["songs"]
            .as_array()
            .expect("songs must be an array")
            .clone()
    }

    /// GET /song/{id}
    pub async fn get_song(&self, id: &str) -> Response {
        self.request(reqwest::Method::GET, &format!("/song/{}", id))
            .send()
            .await
            .expect("Get song request failed")
    }

    /// GET /song/{id}/{attribute}
    pub async fn get_song_attribute(&self, id: &str, attribute: &str) -> Response {
        self.request(reqwest::Method::GET, &format!("/song/{}/{}", id, attribute))
            .send()
            .await
            .expect("Get song attribute request failed")
    }

    // ========================================================================
    // Admin Endpoints
    // ========================================================================

    /// GET /admin/info
    pub async fn get_info(&self) -> Response {
        self.request(reqwest::Method::GET, "/admin/info")
            .send()
            .await
            .expect("Info request failed")
    }

    /// GET /admin/keys
    pub async fn get_keys(&self) -> Response {
        self.request(reqwest::Method::GET, "/admin/keys")
            .send()
            .await
            .expect("Keys request failed")
    }

    /// POST /admin/reindex
    pub async fn trigger_reindex(&self) -> Response {
        self.request(reqwest::Method::POST, "/admin/reindex")
            .send()
            .await
            .expect("Reindex request failed")
    }

    // ========================================================================
    // Service Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.request(reqwest::Method::GET, "/")
            .send()
            .await
            .expect("Home request failed")
    }

    /// GET /metrics
    pub async fn get_metrics(&self) -> Response {
        self.request(reqwest::Method::GET, "/metrics")
            .send()
            .await
            .expect("Metrics request failed")
    }

    // ========================================================================
    // Polling Helpers
    // ========================================================================

    /// Polls /admin/info until `loaded` equals `expected`, returning the info
    ///
    /// # Panics
    ///
    /// Panics if the count is not reached within [`REINDEX_WAIT_TIMEOUT_MS`].
    pub async fn wait_for_loaded(&self, expected: u64) -> Value {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(REINDEX_WAIT_TIMEOUT_MS);

        loop {
            let info: Value = self
                .get_info()
                .await
                .json()
                .await
                .expect("Invalid info response");
            if info["loaded"].as_u64() == Some(expected) {
                return info;
            }
            if start.elapsed() > timeout {
                panic!("Library did not reach {} songs, last info: {}", expected, info);
            }
            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
        }
    }
}
