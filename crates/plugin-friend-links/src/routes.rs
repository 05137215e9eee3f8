//! JSON API for managing links.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use noteblog_extension_sdk::prelude::*;

use crate::links::{FriendLinksConfig, LinkInput};

/// Base path of the link API.
pub const API_BASE: &str = "/plugins/friend_links/api/links";

/// Routes served while the plugin is active.
pub fn link_routes() -> Vec<ExtensionRoute> {
    vec![
        ExtensionRoute::get(API_BASE, RouteHandler::new(list_links)),
        ExtensionRoute::post(API_BASE, RouteHandler::new(create_link)),
        ExtensionRoute::put(format!("{API_BASE}/:id"), RouteHandler::new(update_link)),
        ExtensionRoute::delete(format!("{API_BASE}/:id"), RouteHandler::new(delete_link)),
    ]
}

async fn list_links(req: ExtensionRequest) -> AppResult<Response> {
    let config = FriendLinksConfig::load(&req.context).await?;
    Ok(Json(json!({ "success": true, "data": config.links })).into_response())
}

async fn create_link(req: ExtensionRequest) -> AppResult<Response> {
    let input: LinkInput = req.json()?;
    let link = FriendLinksConfig::modify(&req.context, |config| config.add(input)).await?;
    tracing::info!(link = link.id, "Friend link added");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": link }))).into_response())
}

async fn update_link(req: ExtensionRequest) -> AppResult<Response> {
    let id = link_id(&req)?;
    let input: LinkInput = req.json()?;
    let link = FriendLinksConfig::modify(&req.context, |config| config.edit(id, input)).await?;
    Ok(Json(json!({ "success": true, "data": link })).into_response())
}

async fn delete_link(req: ExtensionRequest) -> AppResult<Response> {
    let id = link_id(&req)?;
    FriendLinksConfig::modify(&req.context, |config| config.remove(id)).await?;
    tracing::info!(link = id, "Friend link removed");
    Ok(StatusCode::NO_CONTENT.into_response())
}

fn link_id(req: &ExtensionRequest) -> AppResult<u64> {
    req.param("id")
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::validation("Link id must be a number"))
}
