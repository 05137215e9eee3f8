//! Extension descriptor entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use noteblog_core::{AppError, AppResult, ProjectPaths};

use super::kind::{ExtensionKey, ExtensionKind};
use super::state::ExtensionState;

/// Metadata and lifecycle state for one discovered extension.
///
/// One row per `(kind, id)`. `config_blob` is JSON text owned by the
/// extension; the runtime never interprets it beyond parsing it as a map.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExtensionDescriptor {
    /// Stable identifier, unique per kind.
    pub id: String,
    /// Plugin or theme.
    pub kind: ExtensionKind,
    /// Version string reported by the extension.
    pub version: String,
    /// Human-readable name.
    pub display_name: String,
    /// Description.
    pub description: String,
    /// Author or maintainer.
    pub author: String,
    /// Lifecycle state.
    pub state: ExtensionState,
    /// Serialized configuration map.
    #[serde(skip_serializing, default = "empty_blob")]
    pub config_blob: String,
    /// Location of the extension's files, relative to the project root.
    pub install_path: String,
    /// When the row was first written.
    pub created_at: DateTime<Utc>,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
    /// Why the extension failed to load, if it did. Never persisted.
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

impl ExtensionDescriptor {
    /// Creates a freshly discovered descriptor with an empty config.
    pub fn discovered(kind: ExtensionKind, id: impl Into<String>, install_path: String) -> Self {
        let now = Utc::now();
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            kind,
            version: String::new(),
            description: String::new(),
            author: String::new(),
            state: ExtensionState::Discovered,
            config_blob: empty_blob(),
            install_path,
            created_at: now,
            updated_at: now,
            load_error: None,
        }
    }

    /// Returns the identity of this descriptor.
    pub fn key(&self) -> ExtensionKey {
        ExtensionKey::new(self.kind, self.id.clone())
    }

    /// Whether hooks of this extension may run.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Whether the loader flagged this extension as broken.
    pub fn is_loadable(&self) -> bool {
        self.load_error.is_none()
    }

    /// Resolves the stored install path against the project root.
    pub fn absolute_install_path(&self, paths: &ProjectPaths) -> std::path::PathBuf {
        paths.to_absolute(&self.install_path)
    }

    /// Parses the config blob into a map.
    ///
    /// An empty or blank blob yields an empty map.
    pub fn config_map(&self) -> AppResult<Map<String, Value>> {
        parse_blob(&self.config_blob)
    }

    /// Copies informational metadata from a fresh scan, keeping state and
    /// configuration untouched.
    pub fn refresh_metadata(&mut self, scanned: &ExtensionDescriptor) {
        self.version = scanned.version.clone();
        self.display_name = scanned.display_name.clone();
        self.description = scanned.description.clone();
        self.author = scanned.author.clone();
        self.install_path = scanned.install_path.clone();
        self.load_error = scanned.load_error.clone();
        self.updated_at = Utc::now();
    }
}

/// Serialized form of an empty configuration map.
pub fn empty_blob() -> String {
    "{}".to_string()
}

/// Parses a config blob, rejecting anything that is not a JSON object.
pub fn parse_blob(blob: &str) -> AppResult<Map<String, Value>> {
    if blob.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(blob)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(AppError::config(format!(
            "Stored configuration is not a mapping (found {})",
            json_type_name(&other)
        ))),
    }
}

/// Returns a short name for the JSON type of `value`.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_discovered_defaults() {
        let d = ExtensionDescriptor::discovered(
            ExtensionKind::Plugin,
            "friend_links",
            "plugins/friend_links".to_string(),
        );
        assert_eq!(d.state, ExtensionState::Discovered);
        assert_eq!(d.display_name, "friend_links");
        assert!(d.config_map().unwrap().is_empty());
        assert_eq!(d.key(), ExtensionKey::plugin("friend_links"));
    }

    #[test]
    fn test_refresh_preserves_state_and_config() {
        let mut known = ExtensionDescriptor::discovered(
            ExtensionKind::Theme,
            "aurora",
            "themes/aurora".to_string(),
        );
        known.state = ExtensionState::Active;
        known.config_blob = json!({"accent": "teal"}).to_string();

        let mut scanned = known.clone();
        scanned.state = ExtensionState::Discovered;
        scanned.config_blob = empty_blob();
        scanned.version = "2.0.0".to_string();
        scanned.description = "Aurora, refreshed".to_string();

        known.refresh_metadata(&scanned);
        assert_eq!(known.version, "2.0.0");
        assert_eq!(known.description, "Aurora, refreshed");
        assert_eq!(known.state, ExtensionState::Active);
        assert_eq!(known.config_map().unwrap()["accent"], "teal");
    }

    #[test]
    fn test_parse_blob_rejects_non_mapping() {
        assert!(parse_blob("[1, 2]").is_err());
        assert!(parse_blob("").unwrap().is_empty());
        assert!(parse_blob("null").unwrap().is_empty());
    }

    #[test]
    fn test_config_blob_not_serialized() {
        let mut d = ExtensionDescriptor::discovered(
            ExtensionKind::Plugin,
            "ai_summary",
            "plugins/ai_summary".to_string(),
        );
        d.config_blob = json!({"api_key": "sk-secret"}).to_string();
        let out = serde_json::to_string(&d).unwrap();
        assert!(!out.contains("sk-secret"));
    }
}
