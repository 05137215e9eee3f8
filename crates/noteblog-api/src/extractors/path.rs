//! Typed path parameter helpers.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use noteblog_core::error::AppError;
use noteblog_entity::extension::{ExtensionKey, ExtensionKind};
use noteblog_extension::manifest::validate_id;

use crate::error::ApiError;

/// Parses an extension key from `kind` and `id` path segments.
pub fn parse_key(kind: &str, id: &str) -> Result<ExtensionKey, AppError> {
    let kind: ExtensionKind = kind.parse()?;
    validate_id(id).map_err(|e| AppError::validation(e.message))?;
    Ok(ExtensionKey::new(kind, id))
}

/// Extension addressed by the `{kind}/{id}` segments of the route.
#[derive(Debug, Clone)]
pub struct ExtensionPath(pub ExtensionKey);

impl<S: Send + Sync> FromRequestParts<S> for ExtensionPath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((kind, id)) = Path::<(String, String)>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        Ok(Self(parse_key(&kind, &id)?))
    }
}
