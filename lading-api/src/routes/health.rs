//! Health Check Endpoints
//!
//! - /health/ping - simple liveness check
//! - /health/live - process alive check with uptime
//!
//! No authentication required for health endpoints.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(live))
}

async fn ping() -> impl IntoResponse {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        uptime_seconds: None,
    })
}

async fn live(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        uptime_seconds: Some(state.start_time.elapsed().as_secs()),
    })
}
