//! In-memory extension store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;
use noteblog_entity::extension::{ExtensionDescriptor, ExtensionKey, ExtensionKind, ExtensionState};

use super::ExtensionStore;

/// Process-local store used for tests and database-less development.
#[derive(Debug, Default)]
pub struct MemoryExtensionStore {
    rows: RwLock<BTreeMap<ExtensionKey, ExtensionDescriptor>>,
}

impl MemoryExtensionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Whether the store holds no rows.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ExtensionStore for MemoryExtensionStore {
    async fn find(&self, key: &ExtensionKey) -> AppResult<Option<ExtensionDescriptor>> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn list(&self, kind: Option<ExtensionKind>) -> AppResult<Vec<ExtensionDescriptor>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|d| kind.is_none_or(|k| d.kind == k))
            .cloned()
            .collect())
    }

    async fn upsert(&self, descriptor: &ExtensionDescriptor) -> AppResult<()> {
        let mut row = descriptor.clone();
        row.load_error = None;
        row.updated_at = Utc::now();

        let mut rows = self.rows.write().await;
        if let Some(existing) = rows.get(&row.key()) {
            row.created_at = existing.created_at;
        }
        rows.insert(row.key(), row);
        Ok(())
    }

    async fn update_metadata(&self, scanned: &ExtensionDescriptor) -> AppResult<()> {
        let key = scanned.key();
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&key)
            .ok_or_else(|| AppError::not_found(format!("Extension '{key}' not found")))?;
        row.version = scanned.version.clone();
        row.display_name = scanned.display_name.clone();
        row.description = scanned.description.clone();
        row.author = scanned.author.clone();
        row.install_path = scanned.install_path.clone();
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn update_state(&self, key: &ExtensionKey, state: ExtensionState) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(key)
            .ok_or_else(|| AppError::not_found(format!("Extension '{key}' not found")))?;
        row.state = state;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn update_config(&self, key: &ExtensionKey, blob: &str) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(key)
            .ok_or_else(|| AppError::not_found(format!("Extension '{key}' not found")))?;
        row.config_blob = blob.to_string();
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, key: &ExtensionKey) -> AppResult<bool> {
        Ok(self.rows.write().await.remove(key).is_some())
    }
}
