//! HTTP Routes Module
//!
//! The HTTP surface is deliberately small: the WebSocket upgrade endpoint
//! and health checks. Shipment CRUD lives with an external collaborator;
//! the workflow operations in `services` are exposed to it as plain
//! function calls.

pub mod health;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::ws::ws_handler;

/// Assemble the API router.
pub fn create_api_router(state: AppState, config: &ApiConfig) -> ApiResult<Router> {
    let cors = build_cors_layer(config)?;

    Ok(Router::new()
        .route("/api/v1/ws", get(ws_handler))
        .nest("/health", health::create_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn build_cors_layer(config: &ApiConfig) -> ApiResult<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if config.cors_origins.is_empty() {
        warn!("CORS allows all origins; set LADING_CORS_ORIGINS before deploying");
        return Ok(layer.allow_origin(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|_| {
                ApiError::invalid_input(format!("Invalid CORS origin: {}", origin))
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(layer.allow_origin(origins))
}
