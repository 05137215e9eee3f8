//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use noteblog_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// HTTP-facing wrapper around [`AppError`].
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status code and machine-readable code for an error kind.
    pub fn status_of(kind: ErrorKind) -> (StatusCode, &'static str) {
        match kind {
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ErrorKind::Config => (StatusCode::UNPROCESSABLE_ENTITY, "CONFIG_ERROR"),
            ErrorKind::InvalidTransition => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            ErrorKind::MountConflict => (StatusCode::CONFLICT, "MOUNT_CONFLICT"),
            ErrorKind::Lifecycle => (StatusCode::UNPROCESSABLE_ENTITY, "LIFECYCLE_ERROR"),
            ErrorKind::Load => (StatusCode::UNPROCESSABLE_ENTITY, "LOAD_ERROR"),
            ErrorKind::Dispatch
            | ErrorKind::Template
            | ErrorKind::Internal
            | ErrorKind::Database
            | ErrorKind::Storage
            | ErrorKind::Configuration
            | ErrorKind::Serialization => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, error_code) = Self::status_of(err.kind);

        if status.is_server_error() {
            tracing::error!(kind = %err.kind, error = %err, "Request failed");
        }

        let body = ApiErrorResponse {
            error: error_code.to_string(),
            message: err.message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::status_of(ErrorKind::NotFound).0, StatusCode::NOT_FOUND);
        assert_eq!(ApiError::status_of(ErrorKind::InvalidTransition).0, StatusCode::CONFLICT);
        assert_eq!(ApiError::status_of(ErrorKind::MountConflict).0, StatusCode::CONFLICT);
        assert_eq!(ApiError::status_of(ErrorKind::Lifecycle).0, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::status_of(ErrorKind::Database).0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError(AppError::not_found("Extension plugin:x not found")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
