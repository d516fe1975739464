//! Server module for the tedit relay
//!
//! Contains router assembly and the serve loop.
//!
//! # Module Structure
//!
//! - `config`: Relay configuration
//!
//! Routes: `/ws` (document relay WebSocket), `/health`, and the document
//! snapshot API under `/api/documents`.

mod config;

pub use config::RelayConfig;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tedit_sync::{relay_ws_handler, RelayState};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api;

/// Build the relay router
pub fn build_router(config: &RelayConfig) -> Router {
    let relay_state = Arc::new(RelayState::new());
    let snapshot_store = Arc::new(api::SnapshotStore::new(config.data_dir.clone()));

    let cors = match config.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) if config.allowed_origin != "*" => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        _ => CorsLayer::permissive(),
    };

    Router::new()
        .merge(api::health_routes())
        .merge(api::snapshot_routes(snapshot_store))
        .route("/ws", get(relay_ws_handler).with_state(relay_state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Run the relay server until shutdown
pub async fn run(config: RelayConfig) -> Result<()> {
    let app = build_router(&config);
    let addr = config.addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    info!("Relay listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Relay shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
