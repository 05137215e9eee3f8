//! Template engine configuration.

use serde::{Deserialize, Serialize};

/// Template engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Glob of template files loaded at startup. Empty disables loading.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Whether HTML autoescaping is applied to inline templates.
    #[serde(default = "default_true")]
    pub autoescape: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            autoescape: true,
        }
    }
}

fn default_directory() -> String {
    "templates/**/*.html".to_string()
}

fn default_true() -> bool {
    true
}
