//! Extension runtime configuration.

use serde::{Deserialize, Serialize};

/// Extension runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Project root that stored install paths are relative to.
    ///
    /// Empty means the current working directory.
    #[serde(default)]
    pub project_root: String,
    /// Plugin directory, relative to the project root.
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: String,
    /// Theme directory, relative to the project root.
    #[serde(default = "default_themes_dir")]
    pub themes_dir: String,
    /// Upper bound for a single hook callback, in seconds.
    #[serde(default = "default_hook_timeout")]
    pub hook_timeout_seconds: u64,
    /// Whether to scan extension directories on startup.
    #[serde(default = "default_true")]
    pub auto_discover: bool,
    /// Whether to re-activate extensions persisted as active on startup.
    #[serde(default = "default_true")]
    pub restore_on_start: bool,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            project_root: String::new(),
            plugins_dir: default_plugins_dir(),
            themes_dir: default_themes_dir(),
            hook_timeout_seconds: default_hook_timeout(),
            auto_discover: true,
            restore_on_start: true,
        }
    }
}

fn default_plugins_dir() -> String {
    "plugins".to_string()
}

fn default_themes_dir() -> String {
    "themes".to_string()
}

fn default_hook_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
