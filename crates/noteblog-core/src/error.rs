//! Error type shared by every Noteblog crate.
//!
//! Extension failures (load, lifecycle, dispatch, mount conflict) are
//! [`ErrorKind`] variants of the one [`AppError`], so a single `AppResult`
//! flows from extension callbacks up to the admin API.

use std::fmt;
use thiserror::Error;

/// Error category. The API layer picks the HTTP status from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// No such extension, route or asset.
    NotFound,
    /// Malformed input from a client or an extension.
    Validation,
    Internal,
    /// Extension store failure.
    Database,
    /// Filesystem failure while scanning or serving files.
    Storage,
    /// Application settings could not be loaded.
    Configuration,
    Serialization,
    /// Extension code could not be loaded at discovery time.
    Load,
    /// An extension lifecycle callback failed during a transition.
    Lifecycle,
    /// A lifecycle transition is not valid from the current state.
    InvalidTransition,
    /// A hook callback failed during request-time dispatch.
    Dispatch,
    /// Two extensions claimed the same route.
    MountConflict,
    /// An extension configuration value is not serializable.
    Config,
    /// A template could not be rendered.
    Template,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Database => write!(f, "DATABASE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Load => write!(f, "LOAD"),
            Self::Lifecycle => write!(f, "LIFECYCLE"),
            Self::InvalidTransition => write!(f, "INVALID_TRANSITION"),
            Self::Dispatch => write!(f, "DISPATCH"),
            Self::MountConflict => write!(f, "MOUNT_CONFLICT"),
            Self::Config => write!(f, "CONFIG"),
            Self::Template => write!(f, "TEMPLATE"),
        }
    }
}

/// Application error: a kind, a message for humans and an optional cause.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    // Shorthand constructors, one per kind in use.

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn load(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Load, message)
    }

    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lifecycle, message)
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTransition, message)
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dispatch, message)
    }

    pub fn mount_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MountConflict, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
