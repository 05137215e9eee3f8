//! # noteblog-extension-sdk
//!
//! SDK for developing Noteblog plugins and themes.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use noteblog_extension_sdk::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Hello;
//!
//! #[async_trait]
//! impl Plugin for Hello {
//!     fn name(&self) -> &str { "Hello" }
//!     fn version(&self) -> &str { "1.0.0" }
//!
//!     async fn install(&self, ctx: &ExtensionContext) -> AppResult<bool> {
//!         ctx.set_config(&json!({"greeting": "hi"})).await?;
//!         Ok(true)
//!     }
//!     async fn uninstall(&self, _ctx: &ExtensionContext) -> AppResult<bool> { Ok(true) }
//!     async fn register_hooks(&self, ctx: &ExtensionContext) -> AppResult<()> {
//!         ctx.register_action("sidebar_bottom", HookFn::arity0(|| async {
//!             Ok(Some("<p>hi</p>".to_string()))
//!         }), DEFAULT_PRIORITY).await
//!     }
//! }
//!
//! export_plugin!("hello", Hello::default);
//! ```

pub mod exports;

pub use noteblog_extension::catalog::ExtensionCatalog;

/// Prelude for convenient imports.
pub mod prelude {
    pub use noteblog_extension::prelude::*;

    pub use crate::export_plugin;
    pub use crate::export_theme;
    pub use crate::exports::config_or;
}
