//! PostgreSQL extension repository.

use async_trait::async_trait;
use sqlx::PgPool;

use noteblog_core::error::{AppError, ErrorKind};
use noteblog_core::result::AppResult;
use noteblog_entity::extension::{ExtensionDescriptor, ExtensionKey, ExtensionKind, ExtensionState};

use super::ExtensionStore;

/// Repository for extension descriptor rows.
#[derive(Debug, Clone)]
pub struct ExtensionRepository {
    pool: PgPool,
}

impl ExtensionRepository {
    /// Create a new extension repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExtensionStore for ExtensionRepository {
    async fn find(&self, key: &ExtensionKey) -> AppResult<Option<ExtensionDescriptor>> {
        sqlx::query_as::<_, ExtensionDescriptor>(
            "SELECT * FROM extensions WHERE kind = $1 AND id = $2",
        )
        .bind(key.kind)
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find extension", e))
    }

    async fn list(&self, kind: Option<ExtensionKind>) -> AppResult<Vec<ExtensionDescriptor>> {
        let query = match kind {
            Some(kind) => sqlx::query_as::<_, ExtensionDescriptor>(
                "SELECT * FROM extensions WHERE kind = $1 ORDER BY id ASC",
            )
            .bind(kind),
            None => sqlx::query_as::<_, ExtensionDescriptor>(
                "SELECT * FROM extensions ORDER BY kind ASC, id ASC",
            ),
        };

        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list extensions", e))
    }

    async fn upsert(&self, descriptor: &ExtensionDescriptor) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO extensions \
             (id, kind, version, display_name, description, author, state, config_blob, install_path, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) \
             ON CONFLICT (kind, id) DO UPDATE SET \
             version = EXCLUDED.version, display_name = EXCLUDED.display_name, \
             description = EXCLUDED.description, author = EXCLUDED.author, \
             state = EXCLUDED.state, config_blob = EXCLUDED.config_blob, \
             install_path = EXCLUDED.install_path, updated_at = NOW()",
        )
        .bind(&descriptor.id)
        .bind(descriptor.kind)
        .bind(&descriptor.version)
        .bind(&descriptor.display_name)
        .bind(&descriptor.description)
        .bind(&descriptor.author)
        .bind(descriptor.state)
        .bind(&descriptor.config_blob)
        .bind(&descriptor.install_path)
        .bind(descriptor.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save extension", e))?;
        Ok(())
    }

    async fn update_metadata(&self, scanned: &ExtensionDescriptor) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE extensions SET version = $3, display_name = $4, description = $5, author = $6, \
             install_path = $7, updated_at = NOW() WHERE kind = $1 AND id = $2",
        )
        .bind(scanned.kind)
        .bind(&scanned.id)
        .bind(&scanned.version)
        .bind(&scanned.display_name)
        .bind(&scanned.description)
        .bind(&scanned.author)
        .bind(&scanned.install_path)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to refresh extension metadata", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Extension '{}' not found", scanned.key())));
        }
        Ok(())
    }

    async fn update_state(&self, key: &ExtensionKey, state: ExtensionState) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE extensions SET state = $3, updated_at = NOW() WHERE kind = $1 AND id = $2",
        )
        .bind(key.kind)
        .bind(&key.id)
        .bind(state)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update extension state", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Extension '{key}' not found")));
        }
        Ok(())
    }

    async fn update_config(&self, key: &ExtensionKey, blob: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE extensions SET config_blob = $3, updated_at = NOW() WHERE kind = $1 AND id = $2",
        )
        .bind(key.kind)
        .bind(&key.id)
        .bind(blob)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update extension config", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Extension '{key}' not found")));
        }
        Ok(())
    }

    async fn delete(&self, key: &ExtensionKey) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM extensions WHERE kind = $1 AND id = $2")
            .bind(key.kind)
            .bind(&key.id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete extension", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
