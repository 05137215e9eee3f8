//! Host pages and dispatch of extension-owned routes.

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::header::ALLOW;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde_json::{Value, json};

use noteblog_core::error::{AppError, ErrorKind};
use noteblog_core::traits::TemplateRenderer;
use noteblog_extension::hooks::HookArgs;
use noteblog_extension::mount::{ExtensionRequest, RouteMatch};

use crate::error::ApiError;
use crate::render::INDEX_TEMPLATE;
use crate::state::AppState;

/// Extension points rendered into every host page.
pub const PAGE_SLOTS: &[&str] = &[
    "head_assets",
    "header_bottom",
    "sidebar_bottom",
    "footer",
    "scripts_assets",
];

/// Filter applied to the site title.
pub const SITE_TITLE_FILTER: &str = "site_title";

/// Largest request body handed to an extension handler.
const MAX_EXTENSION_BODY: usize = 2 * 1024 * 1024;

/// GET /
pub async fn home(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let dispatcher = state.manager.dispatcher();
    let args = HookArgs::new().with("home");
    let slots = dispatcher.collect_slots(PAGE_SLOTS, &args).await;
    let title = dispatcher
        .apply(SITE_TITLE_FILTER, Value::String("Noteblog".to_string()), &args)
        .await;

    let html = state.renderer.render(
        INDEX_TEMPLATE,
        &json!({
            "site_title": title,
            "slots": slots,
            "theme": state.manager.active_theme().await.map(|t| t.id),
        }),
    )?;
    Ok(Html(html))
}

/// Fallback: routes mounted by active extensions.
pub async fn extension_route(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    match state.manager.route_table().resolve(&parts.method, &path).await {
        RouteMatch::Found { route, params } => {
            let body = to_bytes(body, MAX_EXTENSION_BODY)
                .await
                .map_err(|e| AppError::with_source(ErrorKind::Validation, "Request body too large or unreadable", e))?;

            let request = ExtensionRequest {
                method: parts.method,
                path,
                query: parts.uri.query().map(str::to_string),
                params,
                headers: parts.headers,
                body,
                context: route.context.clone(),
            };
            Ok(route.serve(request).await?)
        }
        RouteMatch::MethodNotAllowed(allowed) => {
            let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
            let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
            Ok(response)
        }
        RouteMatch::NotFound => Err(AppError::not_found(format!("No route for {path}")).into()),
    }
}
