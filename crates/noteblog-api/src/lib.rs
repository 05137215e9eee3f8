//! # noteblog-api
//!
//! HTTP layer for Noteblog built on Axum.
//!
//! Provides the admin endpoints that drive the extension lifecycle, the
//! host page that runs extension hooks, dispatch of extension-owned routes
//! and static assets, and the Tera-backed template renderer.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod render;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use render::TeraRenderer;
pub use state::AppState;
