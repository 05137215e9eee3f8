//! Response DTOs.

use serde::{Deserialize, Serialize};

use noteblog_entity::extension::ExtensionDescriptor;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Application version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Extensions whose hooks are live.
    pub active_extensions: usize,
}

/// One extension as shown to administrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionResponse {
    /// Persisted descriptor.
    #[serde(flatten)]
    pub descriptor: ExtensionDescriptor,
    /// Whether hooks and routes are registered in this process.
    pub live: bool,
}
