use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

use crate::models::{RequestStatus, SearchRequest};

/// Errors that can occur when interacting with the platform backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// HTTP client for the platform backend (the Request Store)
///
/// The backend owns SearchRequest persistence and serializes status
/// transitions; this service only reads snapshots and proxies transitions.
pub struct BackendClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Fetch a search request snapshot by id
    pub async fn get_request(&self, request_id: &str) -> Result<SearchRequest, BackendError> {
        let encoded_id = urlencoding::encode(request_id);
        let url = self.url(&format!("/requests/{}", encoded_id));

        tracing::debug!("Fetching search request from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(BackendError::NotFound(format!(
                    "Search request {} not found",
                    request_id
                )))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(BackendError::Unauthorized)
            }
            status if !status.is_success() => {
                return Err(BackendError::ApiError(format!(
                    "Failed to fetch request {}: {}",
                    request_id, status
                )))
            }
            _ => {}
        }

        response
            .json::<SearchRequest>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    /// Transition a search request's status, returning the updated snapshot
    pub async fn update_request_status(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<SearchRequest, BackendError> {
        let encoded_id = urlencoding::encode(request_id);
        let url = self.url(&format!("/requests/{}/status", encoded_id));

        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(BackendError::NotFound(format!(
                    "Search request {} not found",
                    request_id
                )))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(BackendError::Unauthorized)
            }
            status if !status.is_success() => {
                return Err(BackendError::ApiError(format!(
                    "Failed to update request {}: {}",
                    request_id, status
                )))
            }
            _ => {}
        }

        response
            .json::<SearchRequest>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = BackendClient::new("https://api.example.com/".to_string(), "key".to_string())
            .expect("client");
        assert_eq!(
            client.url("/requests/abc"),
            "https://api.example.com/requests/abc"
        );
    }
}
