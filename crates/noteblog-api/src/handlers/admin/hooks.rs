//! Admin hook and route introspection handlers.

use axum::Json;
use axum::extract::State;

use noteblog_extension::hooks::{HookFailureCount, HookRegistration};
use noteblog_extension::mount::MountedRouteInfo;

use crate::dto::response::ApiResponse;
use crate::state::AppState;

/// GET /api/admin/hooks
pub async fn list_hooks(State(state): State<AppState>) -> Json<ApiResponse<Vec<HookRegistration>>> {
    let registrations = state.manager.hook_registry().registrations(None).await;
    Json(ApiResponse::ok(registrations))
}

/// GET /api/admin/hooks/failures
pub async fn hook_failures(State(state): State<AppState>) -> Json<ApiResponse<Vec<HookFailureCount>>> {
    Json(ApiResponse::ok(state.manager.dispatcher().failure_counts()))
}

/// GET /api/admin/routes
pub async fn list_routes(State(state): State<AppState>) -> Json<ApiResponse<Vec<MountedRouteInfo>>> {
    Json(ApiResponse::ok(state.manager.route_table().routes(None).await))
}
