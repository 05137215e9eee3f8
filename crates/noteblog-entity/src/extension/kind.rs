//! Extension kind enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of extension flavors the runtime knows how to drive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "extension_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    /// Behavior extension: hooks, filters, routes.
    Plugin,
    /// Presentation extension: blueprints, custom pages, assets.
    Theme,
}

impl ExtensionKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Theme => "theme",
        }
    }

    /// Plural form used in URL and directory namespaces.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Plugin => "plugins",
            Self::Theme => "themes",
        }
    }

    /// Name of the entry-point file that marks a candidate directory.
    pub fn manifest_file(&self) -> &'static str {
        match self {
            Self::Plugin => "plugin.toml",
            Self::Theme => "theme.toml",
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExtensionKind {
    type Err = noteblog_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plugin" | "plugins" => Ok(Self::Plugin),
            "theme" | "themes" => Ok(Self::Theme),
            _ => Err(noteblog_core::AppError::validation(format!(
                "Invalid extension kind: '{s}'. Expected one of: plugin, theme"
            ))),
        }
    }
}

/// Identity of one extension: `id` is unique per kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtensionKey {
    /// Extension flavor.
    pub kind: ExtensionKind,
    /// Stable identifier.
    pub id: String,
}

impl ExtensionKey {
    /// Creates a key.
    pub fn new(kind: ExtensionKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Creates a plugin key.
    pub fn plugin(id: impl Into<String>) -> Self {
        Self::new(ExtensionKind::Plugin, id)
    }

    /// Creates a theme key.
    pub fn theme(id: impl Into<String>) -> Self {
        Self::new(ExtensionKind::Theme, id)
    }
}

impl fmt::Display for ExtensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
