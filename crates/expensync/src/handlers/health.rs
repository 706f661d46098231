//! Health check endpoints.
//!
//! - `/livez` - Basic liveness probe (immediate 200, no checks)
//! - `/healthz` - Change feed stats

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

/// Body of `/healthz`.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Sequence number of the latest published change.
    pub latest_seq: u64,
    /// Events retained for SSE replay.
    pub event_history_size: usize,
}

/// GET /livez - Basic liveness probe.
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /healthz - Change feed stats.
pub async fn healthz(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        healthy: true,
        latest_seq: state.change_feed.latest_seq().await,
        event_history_size: state.change_feed.history_len().await,
    })
}
