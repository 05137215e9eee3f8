//! Per-extension configuration persisted in the descriptor's config blob.
//!
//! Writes for one extension are serialized through a lock per key, so a
//! read-modify-write never loses a concurrent update.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;
use noteblog_database::ExtensionStore;
use noteblog_entity::extension::ExtensionKey;
use noteblog_entity::extension::model::{json_type_name, parse_blob};

/// Reads and writes extension configuration maps.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    store: Arc<dyn ExtensionStore>,
    locks: Arc<DashMap<ExtensionKey, Arc<Mutex<()>>>>,
}

impl ConfigStore {
    /// Creates a config store over the descriptor store.
    pub fn new(store: Arc<dyn ExtensionStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Returns the underlying descriptor store.
    pub fn store(&self) -> &Arc<dyn ExtensionStore> {
        &self.store
    }

    /// Returns the stored configuration, or an empty map if nothing is
    /// stored yet.
    pub async fn get_config(&self, key: &ExtensionKey) -> AppResult<Map<String, Value>> {
        match self.store.find(key).await? {
            Some(descriptor) => parse_blob(&descriptor.config_blob),
            None => Ok(Map::new()),
        }
    }

    /// Replaces the stored configuration with `value`.
    ///
    /// `value` must serialize to a JSON object that survives a text round
    /// trip unchanged. On any failure the previous blob is left intact.
    pub async fn set_config<T: Serialize + ?Sized>(&self, key: &ExtensionKey, value: &T) -> AppResult<()> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;
        self.write(key, value).await
    }

    /// Applies `edit` to the stored configuration under the key's lock.
    ///
    /// `edit` receives the current map and returns the value to store plus
    /// a result for the caller. If `edit` fails nothing is written.
    pub async fn modify_config<T, R, F>(&self, key: &ExtensionKey, edit: F) -> AppResult<R>
    where
        T: Serialize,
        F: FnOnce(Map<String, Value>) -> AppResult<(T, R)>,
    {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;
        let (next, out) = edit(self.get_config(key).await?)?;
        self.write(key, &next).await?;
        Ok(out)
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &ExtensionKey, value: &T) -> AppResult<()> {
        let map = to_config_map(key, value)?;
        let blob = serde_json::to_string(&Value::Object(map))
            .map_err(|e| AppError::config(format!("Configuration for {key} is not serializable: {e}")))?;

        self.store.update_config(key, &blob).await?;
        debug!(extension = %key, bytes = blob.len(), "Extension configuration saved");
        Ok(())
    }

    /// Returns the stored configuration with `secret_keys` removed.
    pub async fn safe_view(&self, key: &ExtensionKey, secret_keys: &[String]) -> AppResult<Map<String, Value>> {
        let mut config = self.get_config(key).await?;
        for secret in secret_keys {
            config.remove(secret);
        }
        Ok(config)
    }

    /// Merges `patch` into the stored configuration and persists the result.
    ///
    /// A secret key whose patched value is null or an empty string keeps
    /// its stored value, so a form that never echoes secrets back does not
    /// erase them. Returns the safe view of the merged configuration.
    pub async fn update_config(
        &self,
        key: &ExtensionKey,
        patch: Map<String, Value>,
        secret_keys: &[String],
    ) -> AppResult<Map<String, Value>> {
        self.modify_config(key, |mut config| {
            for (name, value) in patch {
                let blank = value.is_null() || value.as_str().is_some_and(str::is_empty);
                if blank && secret_keys.contains(&name) {
                    continue;
                }
                config.insert(name, value);
            }
            let mut view = config.clone();
            for secret in secret_keys {
                view.remove(secret);
            }
            Ok((config, view))
        })
        .await
    }

    fn key_lock(&self, key: &ExtensionKey) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key.clone()).or_default().value())
    }
}

fn to_config_map<T: Serialize + ?Sized>(key: &ExtensionKey, value: &T) -> AppResult<Map<String, Value>> {
    let value = serde_json::to_value(value)
        .map_err(|e| AppError::config(format!("Configuration for {key} is not serializable: {e}")))?;

    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(AppError::config(format!(
                "Configuration for {key} must be a mapping, got {}",
                json_type_name(&other)
            )));
        }
    };

    // Reject anything that would not read back the same after a text round
    // trip, e.g. maps whose keys collapse to the same string.
    let text = serde_json::to_string(&map)?;
    let reread: Map<String, Value> = serde_json::from_str(&text)
        .map_err(|e| AppError::config(format!("Configuration for {key} does not round-trip: {e}")))?;
    if reread != map {
        return Err(AppError::config(format!(
            "Configuration for {key} does not round-trip through JSON"
        )));
    }
    Ok(map)
}
