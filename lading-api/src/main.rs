//! LADING API Server Entry Point
//!
//! Bootstraps configuration, constructs the presence registry and channel
//! manager, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use lading_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, ChannelManager,
    InMemoryShipmentStore, PresenceRegistry,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ApiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let api_config = ApiConfig::from_env();
    let auth_config = AuthConfig::from_env();
    auth_config.validate_for_production()?;

    // The registry is constructed here, once, and handed into the manager;
    // nothing below reaches it through ambient state.
    let registry = Arc::new(PresenceRegistry::new());
    let manager = Arc::new(ChannelManager::new(registry));

    let state = AppState {
        store: Arc::new(InMemoryShipmentStore::new()),
        manager,
        auth: auth_config,
        start_time: std::time::Instant::now(),
    };

    let app: Router = create_api_router(state, &api_config)?;

    let addr = resolve_bind_addr(&api_config)?;
    tracing::info!(%addr, "Starting LADING API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr(config: &ApiConfig) -> ApiResult<SocketAddr> {
    let addr = format!("{}:{}", config.bind_host, config.port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
