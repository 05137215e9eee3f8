//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use noteblog_core::config::AppConfig;
use noteblog_extension::ExtensionManager;

use crate::render::TeraRenderer;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Extension lifecycle manager, owner of hooks and mounted routes
    pub manager: Arc<ExtensionManager>,
    /// Host template engine
    pub renderer: Arc<TeraRenderer>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Creates the state.
    pub fn new(config: AppConfig, manager: Arc<ExtensionManager>, renderer: Arc<TeraRenderer>) -> Self {
        Self {
            config: Arc::new(config),
            manager,
            renderer,
            started_at: Instant::now(),
        }
    }
}
