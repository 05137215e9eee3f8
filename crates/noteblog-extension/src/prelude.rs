//! Prelude for convenient imports.

pub use async_trait::async_trait;
pub use serde_json::{Map, Value, json};

pub use noteblog_core::error::{AppError, ErrorKind};
pub use noteblog_core::result::AppResult;
pub use noteblog_entity::extension::ExtensionKey;

pub use crate::api::context::ExtensionContext;
pub use crate::hooks::definitions::{ActionFn, DEFAULT_PRIORITY, FilterFn, HookArgs, HookFn};
pub use crate::mount::{
    Blueprint, CustomPage, ExtensionRequest, ExtensionRoute, RouteHandler, static_url_prefix,
};
pub use crate::traits::{Plugin, Theme};

pub use crate::hook_args;
