//! Admin extension lifecycle and configuration handlers.

use axum::Json;
use axum::extract::{Query, State};
use serde_json::{Map, Value};

use noteblog_entity::extension::{ExtensionDescriptor, ExtensionKind};

use crate::dto::request::{ListExtensionsQuery, UpdateConfigRequest};
use crate::dto::response::{ApiResponse, ExtensionResponse};
use crate::error::ApiError;
use crate::extractors::ExtensionPath;
use crate::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

async fn respond(state: &AppState, descriptor: ExtensionDescriptor) -> ExtensionResponse {
    let live = state.manager.is_live(&descriptor.key()).await;
    ExtensionResponse { descriptor, live }
}

async fn respond_all(state: &AppState, descriptors: Vec<ExtensionDescriptor>) -> Vec<ExtensionResponse> {
    let mut out = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        out.push(respond(state, descriptor).await);
    }
    out
}

/// GET /api/admin/extensions
pub async fn list_extensions(
    State(state): State<AppState>,
    Query(query): Query<ListExtensionsQuery>,
) -> ApiResult<Vec<ExtensionResponse>> {
    let kind = query.kind.as_deref().map(str::parse::<ExtensionKind>).transpose()?;
    let descriptors = state.manager.list(kind).await;
    Ok(Json(ApiResponse::ok(respond_all(&state, descriptors).await)))
}

/// POST /api/admin/extensions/discover
pub async fn discover(State(state): State<AppState>) -> ApiResult<Vec<ExtensionResponse>> {
    let descriptors = state.manager.discover().await?;
    Ok(Json(ApiResponse::ok(respond_all(&state, descriptors).await)))
}

/// GET /api/admin/extensions/{kind}/{id}
pub async fn get_extension(
    State(state): State<AppState>,
    ExtensionPath(key): ExtensionPath,
) -> ApiResult<ExtensionResponse> {
    let descriptor = state.manager.get(&key).await?;
    Ok(Json(ApiResponse::ok(respond(&state, descriptor).await)))
}

/// POST /api/admin/extensions/{kind}/{id}/install
pub async fn install(State(state): State<AppState>, ExtensionPath(key): ExtensionPath) -> ApiResult<ExtensionResponse> {
    let descriptor = state.manager.install(&key).await?;
    Ok(Json(ApiResponse::ok(respond(&state, descriptor).await)))
}

/// POST /api/admin/extensions/{kind}/{id}/activate
pub async fn activate(State(state): State<AppState>, ExtensionPath(key): ExtensionPath) -> ApiResult<ExtensionResponse> {
    let descriptor = state.manager.activate(&key).await?;
    Ok(Json(ApiResponse::ok(respond(&state, descriptor).await)))
}

/// POST /api/admin/extensions/{kind}/{id}/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    ExtensionPath(key): ExtensionPath,
) -> ApiResult<ExtensionResponse> {
    let descriptor = state.manager.deactivate(&key).await?;
    Ok(Json(ApiResponse::ok(respond(&state, descriptor).await)))
}

/// POST /api/admin/extensions/{kind}/{id}/uninstall
pub async fn uninstall(
    State(state): State<AppState>,
    ExtensionPath(key): ExtensionPath,
) -> ApiResult<ExtensionResponse> {
    let descriptor = state.manager.uninstall(&key).await?;
    Ok(Json(ApiResponse::ok(respond(&state, descriptor).await)))
}

/// GET /api/admin/extensions/{kind}/{id}/config
pub async fn get_config(
    State(state): State<AppState>,
    ExtensionPath(key): ExtensionPath,
) -> ApiResult<Map<String, Value>> {
    let config = state.manager.safe_config(&key).await?;
    Ok(Json(ApiResponse::ok(config)))
}

/// PUT /api/admin/extensions/{kind}/{id}/config
pub async fn update_config(
    State(state): State<AppState>,
    ExtensionPath(key): ExtensionPath,
    Json(UpdateConfigRequest(patch)): Json<UpdateConfigRequest>,
) -> ApiResult<Map<String, Value>> {
    let config = state.manager.update_config(&key, patch).await?;
    Ok(Json(ApiResponse::ok(config)))
}
