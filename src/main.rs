//! Noteblog server
//!
//! Main entry point that wires the extension runtime into the HTTP host and
//! starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use noteblog_api::{TeraRenderer, run_server};
use noteblog_core::config::AppConfig;
use noteblog_core::error::AppError;
use noteblog_core::traits::TemplateRenderer;
use noteblog_extension::{ExtensionCatalog, ExtensionManager};

#[tokio::main]
async fn main() {
    let env = std::env::var("NOTEBLOG_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Extensions compiled into this binary.
fn catalog() -> ExtensionCatalog {
    let mut catalog = ExtensionCatalog::new();
    plugin_friend_links::register(&mut catalog);
    catalog
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Noteblog v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Extension store ──────────────────────────────────
    tracing::info!(provider = %config.database.provider, "Connecting extension store...");
    let store = noteblog_database::connect_store(&config.database).await?;

    // ── Step 2: Templates ────────────────────────────────────────
    let renderer = Arc::new(TeraRenderer::new(&config.templates)?);
    let shared_renderer: Arc<dyn TemplateRenderer> = renderer.clone();

    // ── Step 3: Extension runtime ────────────────────────────────
    let catalog = catalog();
    tracing::info!(entries = catalog.len(), "Extension catalog ready");
    let manager = Arc::new(ExtensionManager::new(
        &config.extensions,
        store,
        Arc::new(catalog),
        shared_renderer,
    ));

    let report = manager.bootstrap().await?;
    tracing::info!(
        restored = report.restored.len(),
        failed = report.failed.len(),
        skipped = report.skipped,
        "Extensions ready"
    );
    for (key, reason) in &report.failed {
        tracing::warn!(extension = %key, reason = %reason, "Extension could not be restored");
    }

    // ── Step 4: HTTP server ──────────────────────────────────────
    run_server(config, manager, renderer).await
}
