//! # noteblog-extension
//!
//! Extension runtime for Noteblog. Provides:
//!
//! - Plugin and theme capability traits with a compiled-in factory catalog
//! - Discovery of extension directories and their manifests
//! - Lifecycle management (install, activate, deactivate, uninstall, restore)
//! - Hook registry with priority-ordered actions and filters
//! - Hook dispatcher that isolates failing callbacks
//! - Per-extension configuration with secret redaction
//! - Route and static asset mounting into the host's routing table

pub mod api;
pub mod catalog;
pub mod config_store;
pub mod hooks;
pub mod loader;
pub mod macros;
pub mod manager;
pub mod manifest;
pub mod mount;
pub mod prelude;
pub mod traits;

mod guard;

pub use api::context::ExtensionContext;
pub use catalog::ExtensionCatalog;
pub use config_store::ConfigStore;
pub use hooks::{HookArgs, HookDispatcher, HookRegistry};
pub use loader::ExtensionLoader;
pub use manager::{ExtensionManager, RestoreReport};
pub use mount::{MountCoordinator, RouteMatch, RouteTable};
pub use traits::{Extension, Plugin, Theme};
