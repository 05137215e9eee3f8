//! Capability traits implemented by extensions.
//!
//! Plugins add behavior through hooks and routes. Themes contribute
//! blueprints and template pages and are activated one at a time.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use noteblog_core::result::AppResult;
use noteblog_entity::extension::{ExtensionDescriptor, ExtensionKind};

use crate::api::context::ExtensionContext;
use crate::mount::{Blueprint, CustomPage};

/// A plugin.
#[async_trait]
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Human-readable name.
    fn name(&self) -> &str;

    /// Version string.
    fn version(&self) -> &str;

    /// Short description.
    fn description(&self) -> &str {
        ""
    }

    /// Author or maintainer.
    fn author(&self) -> &str {
        ""
    }

    /// Configuration keys never shown to administrators.
    fn secret_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// One-time setup, typically seeding default configuration.
    ///
    /// Returning `Ok(false)` reports failure without an error value.
    async fn install(&self, ctx: &ExtensionContext) -> AppResult<bool>;

    /// One-time teardown before the persisted row is removed.
    async fn uninstall(&self, ctx: &ExtensionContext) -> AppResult<bool>;

    /// Registers hooks, routes and static assets. Called on every activation.
    async fn register_hooks(&self, ctx: &ExtensionContext) -> AppResult<()>;
}

/// A theme.
#[async_trait]
pub trait Theme: Send + Sync + fmt::Debug {
    /// Human-readable name.
    fn theme_name(&self) -> &str;

    /// Version string.
    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        ""
    }

    fn author(&self) -> &str {
        ""
    }

    fn secret_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Route groups mounted on activation.
    fn blueprints(&self) -> Vec<Blueprint> {
        Vec::new()
    }

    /// Template pages mounted on activation.
    fn custom_pages(&self) -> Vec<CustomPage> {
        Vec::new()
    }

    /// Extra activation work, e.g. hooks or static assets.
    async fn register(&self, _ctx: &ExtensionContext, _descriptor: &ExtensionDescriptor) -> AppResult<()> {
        Ok(())
    }
}

/// A loaded extension instance.
#[derive(Debug, Clone)]
pub enum Extension {
    Plugin(Arc<dyn Plugin>),
    Theme(Arc<dyn Theme>),
}

impl Extension {
    /// Kind of this extension.
    pub fn kind(&self) -> ExtensionKind {
        match self {
            Self::Plugin(_) => ExtensionKind::Plugin,
            Self::Theme(_) => ExtensionKind::Theme,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Plugin(p) => p.name(),
            Self::Theme(t) => t.theme_name(),
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Self::Plugin(p) => p.version(),
            Self::Theme(t) => t.version(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Plugin(p) => p.description(),
            Self::Theme(t) => t.description(),
        }
    }

    pub fn author(&self) -> &str {
        match self {
            Self::Plugin(p) => p.author(),
            Self::Theme(t) => t.author(),
        }
    }

    pub fn secret_keys(&self) -> Vec<String> {
        match self {
            Self::Plugin(p) => p.secret_keys(),
            Self::Theme(t) => t.secret_keys(),
        }
    }
}
