//! Request DTOs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query for listing extensions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListExtensionsQuery {
    /// `plugin` or `theme`; both when absent.
    pub kind: Option<String>,
}

/// Configuration patch merged into an extension's stored configuration.
///
/// Secret keys sent blank or null keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateConfigRequest(pub Map<String, Value>);
