//! HTTP surface
//!
//! # Routes
//!
//! - `GET /version`, `GET /api/version` - extractor library version
//! - `GET /`, `GET /api/download` - fetch `?url=...&platform=...` and return the file
//! - `GET /health` - liveness check
//!
//! Anything else answers 404 `{"detail": "Not found"}`.

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::pipeline::DownloadPipeline;

pub mod error_response;
pub mod response;
pub mod routes;


/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DownloadPipeline>,
}

/// Create the router with all route definitions
pub fn create_router(pipeline: Arc<DownloadPipeline>) -> Router {
    let state = AppState { pipeline };

    Router::new()
        .route("/", get(routes::download).fallback(routes::method_not_allowed))
        .route("/api/download", get(routes::download).fallback(routes::method_not_allowed))
        .route("/version", get(routes::version).fallback(routes::method_not_allowed))
        .route("/api/version", get(routes::version).fallback(routes::method_not_allowed))
        .route("/health", get(routes::health_check))
        .fallback(routes::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `bind_address` and serve until Ctrl+C
pub async fn start_server(pipeline: Arc<DownloadPipeline>, bind_address: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(pipeline);

    let listener = TcpListener::bind(bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
