//! Static assets of active extensions.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::Uri;
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use noteblog_core::error::AppError;

use crate::error::ApiError;
use crate::extractors::path::parse_key;
use crate::state::AppState;

/// GET /static/{kind}/{id}/{*path}
pub async fn extension_asset(
    State(state): State<AppState>,
    Path((kind, id, _path)): Path<(String, String, String)>,
    request: Request,
) -> Result<Response, ApiError> {
    let key = parse_key(&kind, &id)?;
    let dir = state
        .manager
        .route_table()
        .asset_dir(&key)
        .await
        .ok_or_else(|| AppError::not_found(format!("No static assets mounted for {key}")))?;

    // ServeDir resolves the request path against `dir`, so strip the
    // `/static/{kind}/{id}` prefix from the raw, still-encoded path.
    let (mut parts, body) = request.into_parts();
    let rest = parts.uri.path().splitn(5, '/').nth(4).unwrap_or_default();
    let rewritten = match parts.uri.query() {
        Some(q) => format!("/{rest}?{q}"),
        None => format!("/{rest}"),
    };
    parts.uri = rewritten
        .parse::<Uri>()
        .map_err(|_| AppError::validation("Invalid asset path"))?;

    let response = ServeDir::new(dir)
        .oneshot(Request::from_parts(parts, body))
        .await
        .unwrap_or_else(|never: Infallible| match never {});
    Ok(response.map(Body::new))
}
