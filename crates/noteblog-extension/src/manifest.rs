//! Extension manifest (`plugin.toml` / `theme.toml`).

use serde::{Deserialize, Serialize};

use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;

/// Default static asset directory inside an extension directory.
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Parsed manifest. Every field is optional; the directory name stands in
/// for a missing `id`, and `id` for a missing `entry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Stable identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Catalog entry the instance is built from.
    #[serde(default)]
    pub entry: Option<String>,
    /// Display name override.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Static asset directory relative to the extension directory.
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl ExtensionManifest {
    /// Parses manifest text.
    pub fn parse(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::load(format!("Invalid manifest: {e}")))
    }

    /// Resolved id, falling back to the directory name.
    pub fn resolved_id(&self, dir_name: &str) -> String {
        self.id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(dir_name)
            .to_string()
    }

    /// Resolved catalog entry, falling back to the id.
    pub fn resolved_entry(&self, id: &str) -> String {
        self.entry
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(id)
            .to_string()
    }

    /// Static directory name, `static` by default.
    pub fn static_dir(&self) -> &str {
        self.static_dir.as_deref().unwrap_or(DEFAULT_STATIC_DIR)
    }
}

/// Checks that `id` is usable in URLs and directory names.
pub fn validate_id(id: &str) -> AppResult<()> {
    if id.is_empty() || id.len() > 64 {
        return Err(AppError::load(format!("Extension id '{id}' must be 1-64 characters")));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::load(format!(
            "Extension id '{id}' may only contain letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}
