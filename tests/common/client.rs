//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all push endpoints.
//!
//! When API routes or request formats change, update only this file.

#![allow(dead_code)]

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Service Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    /// GET /health
    pub async fn get_health(&self) -> Response {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    // ========================================================================
    // Push Endpoints
    // ========================================================================

    /// POST /push
    pub async fn create_push(&self, owner: &str, message: &str, topic: Option<&str>) -> Response {
        let mut body = json!({
            "owner": owner,
            "message": message,
        });
        if let Some(topic) = topic {
            body["topic"] = json!(topic);
        }
        self.client
            .post(format!("{}/push", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Create push request failed")
    }

    /// POST /push and returns the created notification body
    ///
    /// # Panics
    ///
    /// Panics if the server doesn't answer 201.
    pub async fn create_push_json(
        &self,
        owner: &str,
        message: &str,
        topic: Option<&str>,
    ) -> serde_json::Value {
        let response = self.create_push(owner, message, topic).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        response.json().await.expect("Invalid create push body")
    }

    /// GET /push/{id}
    pub async fn get_push(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/push/{}", self.base_url, id))
            .send()
            .await
            .expect("Get push request failed")
    }

    /// DELETE /push/{id}
    pub async fn delete_push(&self, id: &str) -> Response {
        self.client
            .delete(format!("{}/push/{}", self.base_url, id))
            .send()
            .await
            .expect("Delete push request failed")
    }

    /// GET /push/owner/{owner}
    pub async fn list_by_owner(&self, owner: &str, limit: Option<usize>) -> Response {
        let mut request = self
            .client
            .get(format!("{}/push/owner/{}", self.base_url, owner));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        request.send().await.expect("List by owner request failed")
    }

    /// GET /push/topic/{topic}
    pub async fn list_by_topic(&self, topic: &str, limit: Option<usize>) -> Response {
        let mut request = self
            .client
            .get(format!("{}/push/topic/{}", self.base_url, topic));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        request.send().await.expect("List by topic request failed")
    }

    /// POST /push/{id}/{action} where action is sent, delivered or failed
    pub async fn mark_push(&self, id: &str, action: &str) -> Response {
        self.client
            .post(format!("{}/push/{}/{}", self.base_url, id, action))
            .send()
            .await
            .expect("Mark push request failed")
    }
}
