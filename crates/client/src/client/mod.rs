//! HTTP client for the expensync API.
//!
//! [`ExpensyncClient`] is the remote store adapter: it implements
//! [`TransactionRepository`] and [`ChangeSource`] over the REST endpoints and
//! the SSE feed.
//!
//! [`TransactionRepository`]: expensync_core::storage::TransactionRepository
//! [`ChangeSource`]: expensync_core::storage::ChangeSource

pub mod events;
pub mod health;
pub mod transactions;

use expensync_core::storage::status_code_to_repository_error;

use crate::error::{ClientError, Result};

/// Default server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// HTTP client for the expensync API.
#[derive(Debug, Clone)]
pub struct ExpensyncClient {
    client: reqwest::Client,
    base_url: String,
}

impl ExpensyncClient {
    /// Create a new client with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns an unsuccessful response into the matching repository error.
    async fn error_from_response(
        response: reqwest::Response,
        resource_id: Option<&str>,
    ) -> ClientError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        status_code_to_repository_error(status, resource_id, message).into()
    }

    /// Decode a JSON body or map the error status.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        resource_id: Option<&str>,
    ) -> Result<T> {
        if response.status().is_success() {
            response.json().await.map_err(ClientError::from)
        } else {
            Err(Self::error_from_response(response, resource_id).await)
        }
    }

    /// Handle responses without a body.
    async fn handle_empty_response(
        &self,
        response: reqwest::Response,
        resource_id: Option<&str>,
    ) -> Result<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response, resource_id).await)
        }
    }
}
