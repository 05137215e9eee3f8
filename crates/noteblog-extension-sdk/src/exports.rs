//! Export helpers: how an extension crate hands its factories to the host.
//!
//! Extensions are compiled into the host binary. Each extension crate
//! exposes a `register` function that adds its factories to the host's
//! [`ExtensionCatalog`](crate::ExtensionCatalog); the `entry` name must match the manifest.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

/// Reads `name` from a configuration map, falling back to `default` when
/// the key is missing or holds a value of the wrong type.
pub fn config_or<T: DeserializeOwned>(config: &Map<String, Value>, name: &str, default: T) -> T {
    match config.get(name) {
        None | Some(Value::Null) => default,
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %name, error = %e, "Ignoring malformed configuration value");
                default
            }
        },
    }
}

/// Generates `pub fn register(catalog)` for a crate exporting one plugin.
///
/// # Example
/// ```rust,ignore
/// export_plugin!("friend_links", FriendLinksPlugin::new);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($entry:expr, $make:expr) => {
        /// Adds this crate's plugin to the host catalog.
        pub fn register(catalog: &mut $crate::ExtensionCatalog) {
            catalog.plugin($entry, $make);
        }
    };
}

/// Generates `pub fn register(catalog)` for a crate exporting one theme.
#[macro_export]
macro_rules! export_theme {
    ($entry:expr, $make:expr) => {
        /// Adds this crate's theme to the host catalog.
        pub fn register(catalog: &mut $crate::ExtensionCatalog) {
            catalog.theme($entry, $make);
        }
    };
}
