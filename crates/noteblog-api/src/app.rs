//! Application builder: wires router, middleware and state into an Axum app
//! and runs it.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use noteblog_core::config::AppConfig;
use noteblog_core::error::{AppError, ErrorKind};
use noteblog_extension::ExtensionManager;

use crate::render::TeraRenderer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Serves the application until Ctrl-C, then unloads every extension.
pub async fn run_server(
    config: AppConfig,
    manager: Arc<ExtensionManager>,
    renderer: Arc<TeraRenderer>,
) -> Result<(), AppError> {
    let addr = config.server.bind_address();
    let state = AppState::new(config, Arc::clone(&manager), renderer);
    let app = build_app(state);

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e)
    })?;
    info!(address = %addr, "Noteblog server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Server error", e))?;

    info!("Server stopped, unloading extensions");
    manager.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
