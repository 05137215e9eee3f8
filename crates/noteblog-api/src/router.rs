//! Route definitions for the Noteblog HTTP API.
//!
//! Host routes are mounted first; anything they do not claim falls through
//! to the routes mounted by active extensions.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(extension_admin_routes())
        .merge(hook_admin_routes())
        .merge(health_routes());

    Router::new()
        .route("/", get(handlers::site::home))
        .route(
            "/static/{kind}/{id}/{*path}",
            get(handlers::assets::extension_asset),
        )
        .nest("/api", api_routes)
        .fallback(handlers::site::extension_route)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Extension lifecycle and configuration
fn extension_admin_routes() -> Router<AppState> {
    use handlers::admin::extensions as ext;

    Router::new()
        .route("/admin/extensions", get(ext::list_extensions))
        .route("/admin/extensions/discover", post(ext::discover))
        .route("/admin/extensions/{kind}/{id}", get(ext::get_extension))
        .route("/admin/extensions/{kind}/{id}/install", post(ext::install))
        .route("/admin/extensions/{kind}/{id}/activate", post(ext::activate))
        .route(
            "/admin/extensions/{kind}/{id}/deactivate",
            post(ext::deactivate),
        )
        .route("/admin/extensions/{kind}/{id}/uninstall", post(ext::uninstall))
        .route(
            "/admin/extensions/{kind}/{id}/config",
            get(ext::get_config).put(ext::update_config),
        )
}

/// Hook and mount introspection
fn hook_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/hooks", get(handlers::admin::hooks::list_hooks))
        .route(
            "/admin/hooks/failures",
            get(handlers::admin::hooks::hook_failures),
        )
        .route("/admin/routes", get(handlers::admin::hooks::list_routes))
}

/// Liveness
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
