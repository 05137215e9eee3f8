//! # noteblog-entity
//!
//! Domain entity models for Noteblog's extension runtime. Every struct in
//! this crate represents a database table row or a domain value object.
//! Database entities derive `sqlx::FromRow`.

pub mod extension;

pub use extension::{
    ExtensionDescriptor, ExtensionKey, ExtensionKind, ExtensionState, LifecycleAction,
};
