//! # noteblog-database
//!
//! PostgreSQL connection management and the persistence backends for
//! extension descriptors.

pub mod connection;
pub mod migration;
pub mod repositories;

use std::sync::Arc;

use tracing::info;

use noteblog_core::config::{DatabaseConfig, StoreProvider};
use noteblog_core::result::AppResult;

pub use connection::DatabasePool;
pub use repositories::{ExtensionRepository, ExtensionStore, MemoryExtensionStore};

/// Builds the extension store selected by `config.provider`.
///
/// For PostgreSQL this connects the pool and runs pending migrations.
pub async fn connect_store(config: &DatabaseConfig) -> AppResult<Arc<dyn ExtensionStore>> {
    match config.provider {
        StoreProvider::Postgres => {
            let pool = DatabasePool::connect(config).await?;
            migration::run_migrations(pool.pool()).await?;
            Ok(Arc::new(ExtensionRepository::new(pool.into_pool())))
        }
        StoreProvider::Memory => {
            info!("Using in-memory extension store; state will not survive a restart");
            Ok(Arc::new(MemoryExtensionStore::new()))
        }
    }
}
