//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod database;
pub mod extension;
pub mod logging;
pub mod template;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::database::{DatabaseConfig, StoreProvider};
pub use self::extension::ExtensionConfig;
pub use self::logging::LoggingConfig;
pub use self::template::TemplateConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Extension runtime settings.
    #[serde(default)]
    pub extensions: ExtensionConfig,
    /// Template engine settings.
    #[serde(default)]
    pub templates: TemplateConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `NOTEBLOG__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config", env)
    }

    /// Load configuration from `dir/default.toml` and `dir/{env}.toml`.
    pub fn load_from(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("NOTEBLOG")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let config = AppConfig::load_from("/nonexistent/config/dir", "test").unwrap();
        assert_eq!(config.extensions.plugins_dir, "plugins");
        assert_eq!(config.extensions.themes_dir, "themes");
        assert_eq!(config.extensions.hook_timeout_seconds, 30);
        assert_eq!(config.database.provider, StoreProvider::Postgres);
    }

    #[test]
    fn test_toml_overlay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[database]\nprovider = \"memory\"\n\n[extensions]\nhook_timeout_seconds = 5\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("dev.toml"), "[server]\nport = 9000\n").unwrap();

        let config = AppConfig::load_from(dir.path().to_str().unwrap(), "dev").unwrap();
        assert_eq!(config.database.provider, StoreProvider::Memory);
        assert_eq!(config.extensions.hook_timeout_seconds, 5);
        assert_eq!(config.server.port, 9000);
        assert!(config.extensions.restore_on_start);
    }
}
