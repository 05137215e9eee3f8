//! Persistence for extension descriptors.
//!
//! The extension runtime only talks to [`ExtensionStore`]; the concrete
//! backend (PostgreSQL or in-memory) is picked from configuration at
//! startup.

pub mod extension;
pub mod memory;

use async_trait::async_trait;

use noteblog_core::result::AppResult;
use noteblog_entity::extension::{ExtensionDescriptor, ExtensionKey, ExtensionKind, ExtensionState};

pub use extension::ExtensionRepository;
pub use memory::MemoryExtensionStore;

/// Key-value row store for extension descriptors, keyed by `(kind, id)`.
///
/// Every write is a single-row statement, so a failed write leaves the
/// previously stored row untouched.
#[async_trait]
pub trait ExtensionStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find one descriptor.
    async fn find(&self, key: &ExtensionKey) -> AppResult<Option<ExtensionDescriptor>>;

    /// List descriptors, optionally restricted to one kind, ordered by id.
    async fn list(&self, kind: Option<ExtensionKind>) -> AppResult<Vec<ExtensionDescriptor>>;

    /// Insert a descriptor or overwrite the existing row for its key.
    async fn upsert(&self, descriptor: &ExtensionDescriptor) -> AppResult<()>;

    /// Refresh version, display name, description, author and install path
    /// from a rescanned descriptor. State and config blob are never
    /// touched. Fails with `NotFound` if no row exists.
    async fn update_metadata(&self, scanned: &ExtensionDescriptor) -> AppResult<()>;

    /// Update the lifecycle state. Fails with `NotFound` if no row exists.
    async fn update_state(&self, key: &ExtensionKey, state: ExtensionState) -> AppResult<()>;

    /// Replace the config blob. Fails with `NotFound` if no row exists.
    async fn update_config(&self, key: &ExtensionKey, blob: &str) -> AppResult<()>;

    /// Delete the row. Returns `true` if a row was removed.
    async fn delete(&self, key: &ExtensionKey) -> AppResult<bool>;
}
