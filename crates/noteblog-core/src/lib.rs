//! # noteblog-core
//!
//! Core crate for Noteblog. Contains configuration schemas, the unified
//! error system, project-relative path handling and the host-side traits
//! the extension runtime consumes.
//!
//! This crate has **no** internal dependencies on other Noteblog crates.

pub mod config;
pub mod error;
pub mod paths;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use paths::ProjectPaths;
pub use result::AppResult;
