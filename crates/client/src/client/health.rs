//! Health check operations.

use serde::{Deserialize, Serialize};

use super::ExpensyncClient;
use crate::error::Result;

/// Body of the server's `/healthz` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerHealth {
    pub healthy: bool,
    pub latest_seq: u64,
    pub event_history_size: usize,
}

impl ExpensyncClient {
    /// Fetch the change feed position from `/healthz`.
    pub async fn health(&self) -> Result<ServerHealth> {
        let response = self.client.get(self.url("/healthz")).send().await?;
        self.handle_response(response, None).await
    }
}
