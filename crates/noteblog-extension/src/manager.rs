//! Extension manager: lifecycle management for plugins and themes.
//!
//! Every transition for a given extension runs inside that extension's own
//! critical section. Activation collects hooks and routes first and makes
//! them visible only after every fallible step has succeeded, so dispatch
//! never reaches an extension that is not becoming Active. Theme
//! activations are additionally serialized because the incoming theme
//! replaces the outgoing one.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use noteblog_core::config::ExtensionConfig;
use noteblog_core::error::{AppError, ErrorKind};
use noteblog_core::paths::ProjectPaths;
use noteblog_core::result::AppResult;
use noteblog_core::traits::TemplateRenderer;
use noteblog_database::ExtensionStore;
use noteblog_entity::extension::model::empty_blob;
use noteblog_entity::extension::{
    ExtensionDescriptor, ExtensionKey, ExtensionKind, ExtensionState, LifecycleAction,
};

use crate::api::context::{ExtensionContext, StagedActivation};
use crate::catalog::ExtensionCatalog;
use crate::config_store::ConfigStore;
use crate::guard;
use crate::hooks::dispatcher::HookDispatcher;
use crate::hooks::registry::{HookRegistry, StagedHook};
use crate::loader::{DiscoveredExtension, ExtensionLoader};
use crate::mount::{MountCoordinator, RouteTable};
use crate::traits::Extension;

/// Environment switch that skips restoring extensions at startup.
pub const SKIP_INIT_ENV: &str = "NOTEBLOG_SKIP_EXTENSION_INIT";

#[derive(Debug, Clone)]
struct ExtensionSlot {
    descriptor: ExtensionDescriptor,
    instance: Option<Extension>,
    static_dir: Option<PathBuf>,
    /// Hooks registered and routes mounted in this process.
    live: bool,
}

/// Outcome of [`ExtensionManager::restore`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    /// Extensions activated again.
    pub restored: Vec<ExtensionKey>,
    /// Extensions that could not be activated, with the reason.
    pub failed: Vec<(ExtensionKey, String)>,
    /// Whether restoring was skipped entirely.
    pub skipped: bool,
}

/// Drives extensions through their lifecycle.
#[derive(Debug)]
pub struct ExtensionManager {
    store: Arc<dyn ExtensionStore>,
    configs: ConfigStore,
    hooks: Arc<HookRegistry>,
    dispatcher: Arc<HookDispatcher>,
    mounts: MountCoordinator,
    loader: ExtensionLoader,
    renderer: Arc<dyn TemplateRenderer>,
    paths: ProjectPaths,
    settings: ExtensionConfig,
    slots: RwLock<BTreeMap<ExtensionKey, ExtensionSlot>>,
    locks: DashMap<ExtensionKey, Arc<Mutex<()>>>,
    theme_switch: Mutex<()>,
}

impl ExtensionManager {
    /// Creates a manager. Nothing is scanned until [`discover`](Self::discover).
    pub fn new(
        settings: &ExtensionConfig,
        store: Arc<dyn ExtensionStore>,
        catalog: Arc<ExtensionCatalog>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        let paths = ProjectPaths::new(&settings.project_root);
        let hooks = Arc::new(HookRegistry::new());
        let timeout = Duration::from_secs(settings.hook_timeout_seconds.max(1));
        let dispatcher = Arc::new(HookDispatcher::new(Arc::clone(&hooks), timeout));

        Self {
            configs: ConfigStore::new(Arc::clone(&store)),
            store,
            hooks,
            dispatcher,
            mounts: MountCoordinator::new(Arc::new(RouteTable::new())),
            loader: ExtensionLoader::new(catalog, paths.clone()),
            renderer,
            paths,
            settings: settings.clone(),
            slots: RwLock::new(BTreeMap::new()),
            locks: DashMap::new(),
            theme_switch: Mutex::new(()),
        }
    }

    /// Returns the hook dispatcher for running extension points.
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.dispatcher
    }

    /// Returns the hook registry.
    pub fn hook_registry(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// Returns the live routing table.
    pub fn route_table(&self) -> &Arc<RouteTable> {
        self.mounts.table()
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.configs
    }

    pub fn renderer(&self) -> &Arc<dyn TemplateRenderer> {
        &self.renderer
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Scans, then restores persisted state, as configured.
    pub async fn bootstrap(&self) -> AppResult<RestoreReport> {
        if self.settings.auto_discover {
            self.discover().await?;
        }
        if !self.settings.restore_on_start {
            info!("Extension restore disabled by configuration");
            return Ok(RestoreReport {
                skipped: true,
                ..RestoreReport::default()
            });
        }
        Ok(self.restore().await)
    }

    /// Scans the plugin and theme directories and reconciles the results
    /// with persisted descriptors.
    ///
    /// Known extensions keep their state and configuration; only metadata
    /// is refreshed. Persisted rows whose files are gone are reported with
    /// a load error.
    pub async fn discover(&self) -> AppResult<Vec<ExtensionDescriptor>> {
        let plugins_root = self.paths.project_path([&self.settings.plugins_dir]);
        let themes_root = self.paths.project_path([&self.settings.themes_dir]);

        let mut scanned = self.loader.discover(&plugins_root, ExtensionKind::Plugin).await?;
        scanned.extend(self.loader.discover(&themes_root, ExtensionKind::Theme).await?);

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(scanned.len());
        for found in scanned {
            let key = found.descriptor.key();
            if !seen.insert(key.clone()) {
                warn!(extension = %key, path = %found.descriptor.install_path, "Duplicate extension id, ignoring");
                continue;
            }
            let lock = self.key_lock(&key);
            let _guard = lock.lock().await;
            out.push(self.reconcile(found).await?);
        }

        let rows = self.store.list(None).await?;
        let persisted: HashSet<ExtensionKey> = rows.iter().map(|r| r.key()).collect();
        for mut row in rows {
            let key = row.key();
            if seen.contains(&key) {
                continue;
            }
            let lock = self.key_lock(&key);
            let _guard = lock.lock().await;
            row.load_error = Some("Extension files not found on disk".to_string());
            let mut slots = self.slots.write().await;
            let (instance, live) = match slots.get(&key) {
                Some(slot) if slot.live => (slot.instance.clone(), true),
                _ => (None, false),
            };
            slots.insert(
                key,
                ExtensionSlot {
                    descriptor: row.clone(),
                    instance,
                    static_dir: None,
                    live,
                },
            );
            out.push(row);
        }

        self.slots
            .write()
            .await
            .retain(|key, slot| seen.contains(key) || persisted.contains(key) || slot.live);

        out.sort_by_key(|d| d.key());
        info!(count = out.len(), "Extension discovery complete");
        Ok(out)
    }

    async fn reconcile(&self, found: DiscoveredExtension) -> AppResult<ExtensionDescriptor> {
        let key = found.descriptor.key();
        let descriptor = match self.store.find(&key).await? {
            Some(mut row) => {
                // Only metadata is written back; state and config stay as
                // whatever is stored when the update lands.
                self.store.update_metadata(&found.descriptor).await?;
                row.refresh_metadata(&found.descriptor);
                debug!(extension = %key, state = %row.state, "Known extension refreshed");
                row
            }
            None => {
                self.store.upsert(&found.descriptor).await?;
                info!(extension = %key, "New extension discovered");
                found.descriptor.clone()
            }
        };

        let mut slots = self.slots.write().await;
        // A running extension keeps the instance its hooks were registered from.
        let (instance, live) = match slots.get(&key) {
            Some(slot) if slot.live => (slot.instance.clone(), true),
            _ => (found.instance, false),
        };
        slots.insert(
            key,
            ExtensionSlot {
                descriptor: descriptor.clone(),
                instance,
                static_dir: found.static_dir,
                live,
            },
        );
        Ok(descriptor)
    }

    /// Runs the extension's install callback and marks it Installed.
    pub async fn install(&self, key: &ExtensionKey) -> AppResult<ExtensionDescriptor> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let slot = self.slot(key).await?;
        let next = slot.descriptor.state.apply(LifecycleAction::Install)?;
        let instance = require_instance(&slot)?;

        // After an uninstall the row is gone; the callback needs one to
        // seed configuration into.
        let created_row = if self.store.find(key).await?.is_none() {
            let mut row = slot.descriptor.clone();
            row.config_blob = empty_blob();
            self.store.upsert(&row).await?;
            true
        } else {
            false
        };

        let ctx = self.context_for(&slot, &instance);
        let outcome = match &instance {
            Extension::Plugin(plugin) => {
                let result = guard::call_async(plugin.install(&ctx), |d| {
                    AppError::lifecycle(format!("install of {key} {d}"))
                })
                .await;
                expect_success(key, LifecycleAction::Install, result)
            }
            Extension::Theme(_) => Ok(()),
        };

        if let Err(e) = outcome {
            if created_row {
                if let Err(cleanup) = self.store.delete(key).await {
                    error!(extension = %key, error = %cleanup, "Failed to remove row after failed install");
                }
            }
            warn!(extension = %key, error = %e.message, "Extension install failed");
            return Err(e);
        }

        self.store.update_state(key, next).await?;
        let descriptor = self.set_state(key, next, false).await?;
        info!(extension = %key, version = %descriptor.version, "Extension installed");
        Ok(descriptor)
    }

    /// Registers the extension's hooks and mounts its routes.
    ///
    /// Activating an extension that is already active is a no-op. Hooks
    /// and routes are collected and checked first and become visible
    /// together once the new state is persisted; on any failure nothing is
    /// visible and the state is left as it was. A theme replaces the
    /// currently active theme only once it is ready to take over.
    pub async fn activate(&self, key: &ExtensionKey) -> AppResult<ExtensionDescriptor> {
        let _switch = match key.kind {
            ExtensionKind::Theme => Some(self.theme_switch.lock().await),
            ExtensionKind::Plugin => None,
        };
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let slot = self.slot(key).await?;
        if slot.live {
            debug!(extension = %key, "Extension already active");
            return Ok(slot.descriptor);
        }

        // Persisted as Active but not running here: this is a restore.
        let restoring = slot.descriptor.state == ExtensionState::Active;
        if !restoring {
            slot.descriptor.state.apply(LifecycleAction::Activate)?;
        }
        let instance = require_instance(&slot)?;

        let outgoing = match key.kind {
            ExtensionKind::Theme => self.other_active_theme(key).await,
            ExtensionKind::Plugin => None,
        };
        let outgoing_lock = outgoing.as_ref().map(|other| self.key_lock(other));
        let _outgoing_guard = match &outgoing_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        // It may have been deactivated while we waited for its lock.
        let outgoing = match outgoing {
            Some(other) if self.slot(&other).await.is_ok_and(|s| s.descriptor.is_active()) => Some(other),
            _ => None,
        };

        let (hooks, routes) = self.stage(&slot, &instance, outgoing.as_ref()).await?;

        if let Err(e) = self.persist_activation(key, &slot, restoring, outgoing.as_ref()).await {
            self.mounts.discard(key).await;
            return Err(e);
        }

        // Everything fallible is done; make it visible.
        let hook_count = self.hooks.commit(key, hooks, outgoing.as_ref()).await;
        self.mounts.publish(key, outgoing.as_ref()).await;
        if let Some(previous) = &outgoing {
            info!(previous = %previous, next = %key, "Switched active theme");
            self.set_state(previous, ExtensionState::Inactive, false).await?;
        }

        let descriptor = self.set_state(key, ExtensionState::Active, true).await?;
        info!(extension = %key, hooks = hook_count, routes, restored = restoring, "Extension activated");
        Ok(descriptor)
    }

    /// Removes the extension's hooks and routes and marks it Inactive.
    pub async fn deactivate(&self, key: &ExtensionKey) -> AppResult<ExtensionDescriptor> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let slot = self.slot(key).await?;
        self.deactivate_locked(&slot).await
    }

    /// Runs the uninstall callback and deletes the persisted row.
    ///
    /// An active extension is deactivated first. Configuration is gone
    /// afterwards.
    pub async fn uninstall(&self, key: &ExtensionKey) -> AppResult<ExtensionDescriptor> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let mut slot = self.slot(key).await?;
        slot.descriptor.state.apply(LifecycleAction::Uninstall)?;

        if slot.descriptor.state == ExtensionState::Active {
            slot.descriptor = self.deactivate_locked(&slot).await?;
        } else {
            self.tear_down(key).await;
        }

        match &slot.instance {
            Some(Extension::Plugin(plugin)) => {
                let ctx = self.context_for(&slot, &Extension::Plugin(Arc::clone(plugin)));
                let result = guard::call_async(plugin.uninstall(&ctx), |d| {
                    AppError::lifecycle(format!("uninstall of {key} {d}"))
                })
                .await;
                if let Err(e) = expect_success(key, LifecycleAction::Uninstall, result) {
                    warn!(extension = %key, error = %e.message, "Extension uninstall failed");
                    return Err(e);
                }
            }
            Some(Extension::Theme(_)) => {}
            None => {
                warn!(extension = %key, "Extension is not loaded, skipping its uninstall callback");
            }
        }

        self.store.delete(key).await?;
        self.hooks.forget(key).await;
        let descriptor = {
            let mut slots = self.slots.write().await;
            let slot = slots
                .get_mut(key)
                .ok_or_else(|| AppError::not_found(format!("Extension {key} not found")))?;
            slot.descriptor.state = ExtensionState::Uninstalled;
            slot.descriptor.config_blob = empty_blob();
            slot.live = false;
            slot.descriptor.clone()
        };
        info!(extension = %key, "Extension uninstalled");
        Ok(descriptor)
    }

    /// Re-activates every extension persisted as Active.
    ///
    /// Failures are logged and the extension is left Installed in memory;
    /// startup continues.
    pub async fn restore(&self) -> RestoreReport {
        if skip_init_requested() {
            info!(env = SKIP_INIT_ENV, "Skipping extension restore");
            return RestoreReport {
                skipped: true,
                ..RestoreReport::default()
            };
        }

        let pending: Vec<ExtensionKey> = {
            let slots = self.slots.read().await;
            slots
                .values()
                .filter(|s| s.descriptor.state == ExtensionState::Active && !s.live)
                .map(|s| s.descriptor.key())
                .collect()
        };

        let mut report = RestoreReport::default();
        for key in pending {
            match self.activate(&key).await {
                Ok(_) => report.restored.push(key),
                Err(e) => {
                    error!(extension = %key, error = %e, "Failed to restore extension");
                    if let Err(missing) = self.set_state(&key, ExtensionState::Installed, false).await {
                        debug!(extension = %key, error = %missing, "Extension vanished during restore");
                    }
                    report.failed.push((key, e.message));
                }
            }
        }

        info!(
            restored = report.restored.len(),
            failed = report.failed.len(),
            "Extension restore complete"
        );
        report
    }

    /// Removes every hook and mount without touching persisted state.
    pub async fn shutdown(&self) {
        let live: Vec<ExtensionKey> = {
            let slots = self.slots.read().await;
            slots.values().filter(|s| s.live).map(|s| s.descriptor.key()).collect()
        };

        for key in &live {
            let lock = self.key_lock(key);
            let _guard = lock.lock().await;
            self.tear_down(key).await;
            if let Some(slot) = self.slots.write().await.get_mut(key) {
                slot.live = false;
            }
        }
        info!(count = live.len(), "All extensions unloaded");
    }

    /// Descriptors known to this process, optionally of one kind.
    pub async fn list(&self, kind: Option<ExtensionKind>) -> Vec<ExtensionDescriptor> {
        let slots = self.slots.read().await;
        slots
            .values()
            .filter(|s| kind.is_none_or(|k| s.descriptor.kind == k))
            .map(|s| s.descriptor.clone())
            .collect()
    }

    /// One descriptor.
    pub async fn get(&self, key: &ExtensionKey) -> AppResult<ExtensionDescriptor> {
        Ok(self.slot(key).await?.descriptor)
    }

    /// The active theme, if any.
    pub async fn active_theme(&self) -> Option<ExtensionDescriptor> {
        let slots = self.slots.read().await;
        slots
            .values()
            .find(|s| s.descriptor.kind == ExtensionKind::Theme && s.descriptor.is_active())
            .map(|s| s.descriptor.clone())
    }

    /// Whether the extension's hooks and routes are live in this process.
    pub async fn is_live(&self, key: &ExtensionKey) -> bool {
        self.slots.read().await.get(key).is_some_and(|s| s.live)
    }

    /// Stored configuration with the extension's secret keys removed.
    pub async fn safe_config(&self, key: &ExtensionKey) -> AppResult<Map<String, Value>> {
        let slot = self.slot(key).await?;
        self.configs.safe_view(key, &secret_keys(&slot)).await
    }

    /// Merges `patch` into the stored configuration.
    pub async fn update_config(&self, key: &ExtensionKey, patch: Map<String, Value>) -> AppResult<Map<String, Value>> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let slot = self.slot(key).await?;
        if !slot.descriptor.state.is_installed() {
            return Err(AppError::invalid_transition(format!(
                "Extension {key} must be installed before it can be configured"
            )));
        }
        let view = self.configs.update_config(key, patch, &secret_keys(&slot)).await?;
        info!(extension = %key, keys = view.len(), "Extension configuration updated");
        Ok(view)
    }

    async fn deactivate_locked(&self, slot: &ExtensionSlot) -> AppResult<ExtensionDescriptor> {
        let key = slot.descriptor.key();
        let next = slot.descriptor.state.apply(LifecycleAction::Deactivate)?;

        self.tear_down(&key).await;
        if let Some(s) = self.slots.write().await.get_mut(&key) {
            s.live = false;
        }
        self.store.update_state(&key, next).await?;

        let descriptor = self.set_state(&key, next, false).await?;
        info!(extension = %key, "Extension deactivated");
        Ok(descriptor)
    }

    async fn other_active_theme(&self, incoming: &ExtensionKey) -> Option<ExtensionKey> {
        let slots = self.slots.read().await;
        slots
            .values()
            .filter(|s| s.descriptor.kind == ExtensionKind::Theme && s.descriptor.is_active())
            .map(|s| s.descriptor.key())
            .find(|k| k != incoming)
    }

    /// Runs the extension's registration callbacks and reserves its routes.
    ///
    /// Returns the collected hooks and the number of staged routes. Nothing
    /// is visible to dispatch or routing yet.
    async fn stage(
        &self,
        slot: &ExtensionSlot,
        instance: &Extension,
        replacing: Option<&ExtensionKey>,
    ) -> AppResult<(Vec<StagedHook>, usize)> {
        let key = slot.descriptor.key();
        let ctx = self.context_for(slot, instance);
        let wrap = |detail: String| AppError::lifecycle(format!("activation of {key} {detail}"));

        ctx.begin_activation().await;
        let declared = async {
            let mut routes = Vec::new();
            match instance {
                Extension::Plugin(plugin) => {
                    guard::call_async(plugin.register_hooks(&ctx), wrap)
                        .await
                        .map_err(|e| as_lifecycle(&key, LifecycleAction::Activate, e))?;
                }
                Extension::Theme(theme) => {
                    let (blueprints, pages) =
                        guard::call_sync(|| Ok((theme.blueprints(), theme.custom_pages())), wrap)?;
                    for blueprint in blueprints {
                        routes.extend(blueprint.into_routes());
                    }
                    for page in pages {
                        routes.push(page.into_route()?);
                    }
                    guard::call_async(theme.register(&ctx, &slot.descriptor), wrap)
                        .await
                        .map_err(|e| as_lifecycle(&key, LifecycleAction::Activate, e))?;
                }
            }
            Ok::<_, AppError>(routes)
        }
        .await;
        let StagedActivation { hooks, mut mounts } = ctx.finish_activation().await;

        let result = match declared {
            Ok(mut routes) => {
                routes.append(&mut mounts.routes);
                mounts.routes = routes;
                if mounts.static_dir.is_none() {
                    mounts.static_dir = slot.static_dir.clone();
                }
                self.mounts.stage(&key, &ctx, mounts, replacing).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(routes) => Ok((hooks, routes)),
            Err(e) => {
                warn!(extension = %key, staged_hooks = hooks.len(), error = %e, "Activation failed, nothing was registered");
                Err(e)
            }
        }
    }

    /// Persists the incoming extension as Active and the outgoing theme as
    /// Inactive, restoring the incoming row if the second write fails.
    async fn persist_activation(
        &self,
        key: &ExtensionKey,
        slot: &ExtensionSlot,
        restoring: bool,
        outgoing: Option<&ExtensionKey>,
    ) -> AppResult<()> {
        if !restoring {
            self.store.update_state(key, ExtensionState::Active).await?;
        }
        let Some(previous) = outgoing else {
            return Ok(());
        };
        if let Err(e) = self.store.update_state(previous, ExtensionState::Inactive).await {
            if !restoring {
                if let Err(revert) = self.store.update_state(key, slot.descriptor.state).await {
                    error!(extension = %key, error = %revert, "Failed to revert state after failed theme switch");
                }
            }
            return Err(e);
        }
        Ok(())
    }

    async fn tear_down(&self, key: &ExtensionKey) {
        self.hooks.remove_all(key).await;
        self.mounts.unmount(key).await;
    }

    fn context_for(&self, slot: &ExtensionSlot, instance: &Extension) -> ExtensionContext {
        ExtensionContext::new(
            slot.descriptor.key(),
            slot.descriptor.absolute_install_path(&self.paths),
            instance.secret_keys(),
            self.configs.clone(),
            Arc::clone(&self.renderer),
        )
    }

    fn key_lock(&self, key: &ExtensionKey) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key.clone()).or_default().value())
    }

    async fn slot(&self, key: &ExtensionKey) -> AppResult<ExtensionSlot> {
        self.slots
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Extension {key} not found")))
    }

    async fn set_state(&self, key: &ExtensionKey, state: ExtensionState, live: bool) -> AppResult<ExtensionDescriptor> {
        let mut slots = self.slots.write().await;
        let slot = slots
            .get_mut(key)
            .ok_or_else(|| AppError::not_found(format!("Extension {key} not found")))?;
        slot.descriptor.state = state;
        slot.descriptor.updated_at = chrono::Utc::now();
        slot.live = live;
        Ok(slot.descriptor.clone())
    }
}

fn require_instance(slot: &ExtensionSlot) -> AppResult<Extension> {
    let key = slot.descriptor.key();
    match (&slot.instance, &slot.descriptor.load_error) {
        (Some(instance), None) => Ok(instance.clone()),
        (_, Some(reason)) => Err(AppError::load(format!("Extension {key} failed to load: {reason}"))),
        (None, None) => Err(AppError::load(format!("Extension {key} is not loaded"))),
    }
}

fn secret_keys(slot: &ExtensionSlot) -> Vec<String> {
    slot.instance.as_ref().map(Extension::secret_keys).unwrap_or_default()
}

fn expect_success(key: &ExtensionKey, action: LifecycleAction, result: AppResult<bool>) -> AppResult<()> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(AppError::lifecycle(format!("{action} of {key} reported failure"))),
        Err(e) => Err(as_lifecycle(key, action, e)),
    }
}

fn as_lifecycle(key: &ExtensionKey, action: LifecycleAction, error: AppError) -> AppError {
    if error.is(ErrorKind::Lifecycle) {
        error
    } else {
        let message = format!("{action} of {key} failed: {}", error.message);
        AppError::with_source(ErrorKind::Lifecycle, message, error)
    }
}

fn skip_init_requested() -> bool {
    std::env::var(SKIP_INIT_ENV)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use noteblog_database::MemoryExtensionStore;

    use crate::hooks::definitions::{HookArgs, HookFn};
    use crate::mount::{Blueprint, CustomPage, ExtensionRoute, RouteMatch};
    use crate::traits::{Plugin, Theme};
    use axum::http::Method;

    #[derive(Debug)]
    struct EchoRenderer;

    impl TemplateRenderer for EchoRenderer {
        fn render(&self, template: &str, context: &Value) -> AppResult<String> {
            Ok(format!("{template}:{context}"))
        }
    }

    #[derive(Debug, Default)]
    struct Sidebar {
        fail_install: bool,
        route: Option<&'static str>,
        /// Stall between registering the hook and declaring the route.
        pause: Option<Duration>,
    }

    #[async_trait]
    impl Plugin for Sidebar {
        fn name(&self) -> &str {
            "Sidebar"
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn secret_keys(&self) -> Vec<String> {
            vec!["token".to_string()]
        }
        async fn install(&self, ctx: &ExtensionContext) -> AppResult<bool> {
            if self.fail_install {
                return Ok(false);
            }
            ctx.set_config(&json!({"title": "Links", "token": "s3cret"})).await?;
            Ok(true)
        }
        async fn uninstall(&self, _ctx: &ExtensionContext) -> AppResult<bool> {
            Ok(true)
        }
        async fn register_hooks(&self, ctx: &ExtensionContext) -> AppResult<()> {
            let id = ctx.id().to_string();
            ctx.register_action(
                "sidebar_bottom",
                HookFn::arity0(move || {
                    let id = id.clone();
                    async move { Ok(Some(format!("<div>{id}</div>"))) }
                }),
                10,
            )
            .await?;
            if let Some(pause) = self.pause {
                tokio::time::sleep(pause).await;
            }
            if let Some(path) = self.route {
                ctx.register_route(ExtensionRoute::template(path, "page.html", json!({}))).await?;
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Skin(&'static str);

    #[async_trait]
    impl Theme for Skin {
        fn theme_name(&self) -> &str {
            self.0
        }
        fn blueprints(&self) -> Vec<Blueprint> {
            vec![Blueprint::new(self.0, format!("/admin/theme/{}", self.0))
                .route(ExtensionRoute::template("/status", "status.html", json!({})))]
        }
        fn custom_pages(&self) -> Vec<CustomPage> {
            vec![CustomPage {
                name: "about".into(),
                route: "/about".into(),
                template: format!("{}/about.html", self.0),
                methods: vec![],
                context: json!({}),
            }]
        }
    }

    /// Claims a path some plugin already serves.
    #[derive(Debug)]
    struct Squatter;

    #[async_trait]
    impl Theme for Squatter {
        fn theme_name(&self) -> &str {
            "squatter"
        }
        fn blueprints(&self) -> Vec<Blueprint> {
            vec![Blueprint::new("squatter", "/").route(ExtensionRoute::template("/links", "links.html", json!({})))]
        }
    }

    /// Delays row writes for one extension so a config write can land in
    /// between.
    #[derive(Debug)]
    struct SlowStore {
        inner: MemoryExtensionStore,
        slow: ExtensionKey,
        delay: Duration,
    }

    impl SlowStore {
        async fn stall(&self, key: ExtensionKey) {
            if key == self.slow {
                tokio::time::sleep(self.delay).await;
            }
        }
    }

    #[async_trait]
    impl ExtensionStore for SlowStore {
        async fn find(&self, key: &ExtensionKey) -> AppResult<Option<ExtensionDescriptor>> {
            self.inner.find(key).await
        }
        async fn list(&self, kind: Option<ExtensionKind>) -> AppResult<Vec<ExtensionDescriptor>> {
            self.inner.list(kind).await
        }
        async fn upsert(&self, descriptor: &ExtensionDescriptor) -> AppResult<()> {
            self.stall(descriptor.key()).await;
            self.inner.upsert(descriptor).await
        }
        async fn update_metadata(&self, scanned: &ExtensionDescriptor) -> AppResult<()> {
            self.stall(scanned.key()).await;
            self.inner.update_metadata(scanned).await
        }
        async fn update_state(&self, key: &ExtensionKey, state: ExtensionState) -> AppResult<()> {
            self.inner.update_state(key, state).await
        }
        async fn update_config(&self, key: &ExtensionKey, blob: &str) -> AppResult<()> {
            self.inner.update_config(key, blob).await
        }
        async fn delete(&self, key: &ExtensionKey) -> AppResult<bool> {
            self.inner.delete(key).await
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        store: Arc<MemoryExtensionStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().to_path_buf();
            for id in ["alpha", "beta", "broken", "clasher", "grumpy", "sloth", "stalled"] {
                let d = root.join("plugins").join(id);
                std::fs::create_dir_all(&d).unwrap();
                std::fs::write(d.join("plugin.toml"), "").unwrap();
            }
            for id in ["dawn", "dusk", "squatter"] {
                let d = root.join("themes").join(id);
                std::fs::create_dir_all(&d).unwrap();
                std::fs::write(d.join("theme.toml"), "").unwrap();
            }
            Self {
                _dir: dir,
                root,
                store: Arc::new(MemoryExtensionStore::new()),
            }
        }

        fn manager(&self) -> ExtensionManager {
            self.manager_with(self.store.clone())
        }

        fn manager_with(&self, store: Arc<dyn ExtensionStore>) -> ExtensionManager {
            let pause = Some(Duration::from_millis(200));
            let mut catalog = ExtensionCatalog::new();
            catalog
                .plugin("alpha", || Sidebar { route: Some("/links"), ..Sidebar::default() })
                .plugin("beta", Sidebar::default)
                .plugin("clasher", || Sidebar { route: Some("/links"), ..Sidebar::default() })
                .plugin("grumpy", || Sidebar { fail_install: true, ..Sidebar::default() })
                .plugin("sloth", move || Sidebar { pause, ..Sidebar::default() })
                .plugin("stalled", move || Sidebar { route: Some("/links"), pause, ..Sidebar::default() })
                .theme("dawn", || Skin("dawn"))
                .theme("dusk", || Skin("dusk"))
                .theme("squatter", || Squatter);
            let settings = ExtensionConfig {
                project_root: self.root.to_string_lossy().into_owned(),
                hook_timeout_seconds: 2,
                ..ExtensionConfig::default()
            };
            ExtensionManager::new(&settings, store, Arc::new(catalog), Arc::new(EchoRenderer))
        }
    }

    async fn sidebar(manager: &ExtensionManager) -> Vec<String> {
        manager.dispatcher().collect("sidebar_bottom", &HookArgs::new()).await
    }

    #[tokio::test]
    async fn test_end_to_end_hook_output() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let alpha = ExtensionKey::plugin("alpha");

        manager.install(&alpha).await.unwrap();
        assert!(sidebar(&manager).await.is_empty());

        let d = manager.activate(&alpha).await.unwrap();
        assert_eq!(d.state, ExtensionState::Active);
        assert_eq!(sidebar(&manager).await, vec!["<div>alpha</div>"]);
        assert!(matches!(
            manager.route_table().resolve(&Method::GET, "/links").await,
            RouteMatch::Found { .. }
        ));

        manager.deactivate(&alpha).await.unwrap();
        assert!(sidebar(&manager).await.is_empty());
        assert!(manager.hook_registry().registrations(Some(&alpha)).await.is_empty());
        assert!(matches!(
            manager.route_table().resolve(&Method::GET, "/links").await,
            RouteMatch::NotFound
        ));
        assert_eq!(fx.store.find(&alpha).await.unwrap().unwrap().state, ExtensionState::Inactive);
    }

    #[tokio::test]
    async fn test_activate_twice_is_noop() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let beta = ExtensionKey::plugin("beta");
        manager.install(&beta).await.unwrap();
        manager.activate(&beta).await.unwrap();
        manager.activate(&beta).await.unwrap();
        assert_eq!(sidebar(&manager).await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let beta = ExtensionKey::plugin("beta");

        let err = manager.activate(&beta).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidTransition));
        let err = manager.deactivate(&beta).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidTransition));
        manager.install(&beta).await.unwrap();
        let err = manager.install(&beta).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidTransition));
        let err = manager.get(&ExtensionKey::plugin("ghost")).await.unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_failed_install_keeps_state() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let grumpy = ExtensionKey::plugin("grumpy");

        let err = manager.install(&grumpy).await.unwrap_err();
        assert!(err.is(ErrorKind::Lifecycle));
        assert_eq!(manager.get(&grumpy).await.unwrap().state, ExtensionState::Discovered);
        assert_eq!(fx.store.find(&grumpy).await.unwrap().unwrap().state, ExtensionState::Discovered);
    }

    #[tokio::test]
    async fn test_broken_extension_cannot_install() {
        let fx = Fixture::new();
        let manager = fx.manager();
        let found = manager.discover().await.unwrap();
        let broken = found.iter().find(|d| d.id == "broken").unwrap();
        assert!(broken.load_error.is_some());

        let err = manager.install(&ExtensionKey::plugin("broken")).await.unwrap_err();
        assert!(err.is(ErrorKind::Load));
    }

    #[tokio::test]
    async fn test_mount_conflict_rolls_back() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let alpha = ExtensionKey::plugin("alpha");
        let clasher = ExtensionKey::plugin("clasher");
        for key in [&alpha, &clasher] {
            manager.install(key).await.unwrap();
        }
        manager.activate(&alpha).await.unwrap();

        let err = manager.activate(&clasher).await.unwrap_err();
        assert!(err.is(ErrorKind::MountConflict));
        assert_eq!(manager.get(&clasher).await.unwrap().state, ExtensionState::Installed);
        assert!(manager.hook_registry().registrations(Some(&clasher)).await.is_empty());
        assert_eq!(sidebar(&manager).await, vec!["<div>alpha</div>"]);
    }

    #[tokio::test]
    async fn test_rediscovery_preserves_state_and_config() {
        let fx = Fixture::new();
        let manager = fx.manager();
        let first = manager.discover().await.unwrap();
        let beta = ExtensionKey::plugin("beta");
        manager.install(&beta).await.unwrap();
        manager.activate(&beta).await.unwrap();

        let second = manager.discover().await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(fx.store.len().await, first.len());

        let d = manager.get(&beta).await.unwrap();
        assert_eq!(d.state, ExtensionState::Active);
        assert!(manager.is_live(&beta).await);
        let config = manager.config_store().get_config(&beta).await.unwrap();
        assert_eq!(config["title"], "Links");
    }

    #[tokio::test]
    async fn test_uninstall_active_extension() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let beta = ExtensionKey::plugin("beta");
        manager.install(&beta).await.unwrap();
        manager.activate(&beta).await.unwrap();

        let d = manager.uninstall(&beta).await.unwrap();
        assert_eq!(d.state, ExtensionState::Uninstalled);
        assert!(fx.store.find(&beta).await.unwrap().is_none());
        assert!(sidebar(&manager).await.is_empty());
        let err = manager.uninstall(&beta).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidTransition));

        let d = manager.install(&beta).await.unwrap();
        assert_eq!(d.state, ExtensionState::Installed);
        assert!(fx.store.find(&beta).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_single_active_theme() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let dawn = ExtensionKey::theme("dawn");
        let dusk = ExtensionKey::theme("dusk");
        for key in [&dawn, &dusk] {
            manager.install(key).await.unwrap();
        }

        manager.activate(&dawn).await.unwrap();
        assert!(matches!(
            manager.route_table().resolve(&Method::GET, "/about").await,
            RouteMatch::Found { .. }
        ));
        manager.activate(&dusk).await.unwrap();

        assert_eq!(manager.active_theme().await.unwrap().id, "dusk");
        assert_eq!(manager.get(&dawn).await.unwrap().state, ExtensionState::Inactive);
        assert!(matches!(
            manager.route_table().resolve(&Method::GET, "/admin/theme/dawn/status").await,
            RouteMatch::NotFound
        ));
        match manager.route_table().resolve(&Method::GET, "/about").await {
            RouteMatch::Found { route, .. } => assert_eq!(route.owner, dusk),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_restore_after_restart() {
        let fx = Fixture::new();
        {
            let manager = fx.manager();
            manager.discover().await.unwrap();
            let alpha = ExtensionKey::plugin("alpha");
            manager.install(&alpha).await.unwrap();
            manager.activate(&alpha).await.unwrap();
            manager.shutdown().await;
            assert!(sidebar(&manager).await.is_empty());
        }

        let manager = fx.manager();
        let report = manager.bootstrap().await.unwrap();
        assert_eq!(report.restored, vec![ExtensionKey::plugin("alpha")]);
        assert_eq!(sidebar(&manager).await, vec!["<div>alpha</div>"]);
    }

    #[tokio::test]
    async fn test_safe_config_and_update() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let beta = ExtensionKey::plugin("beta");

        let err = manager.update_config(&beta, Map::new()).await.unwrap_err();
        assert!(err.is(ErrorKind::InvalidTransition));

        manager.install(&beta).await.unwrap();
        let safe = manager.safe_config(&beta).await.unwrap();
        assert!(!safe.contains_key("token"));

        let patch = json!({"title": "Friends", "token": ""}).as_object().cloned().unwrap();
        let view = manager.update_config(&beta, patch).await.unwrap();
        assert_eq!(view["title"], "Friends");
        let stored = manager.config_store().get_config(&beta).await.unwrap();
        assert_eq!(stored["token"], "s3cret");
    }

    #[tokio::test]
    async fn test_dispatch_never_sees_half_activated_extension() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let alpha = ExtensionKey::plugin("alpha");
        let stalled = ExtensionKey::plugin("stalled");
        let sloth = ExtensionKey::plugin("sloth");
        for key in [&alpha, &stalled, &sloth] {
            manager.install(key).await.unwrap();
        }
        manager.activate(&alpha).await.unwrap();

        let midway = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            sidebar(&manager).await
        };

        // Fails on its route after its hook was requested.
        let (result, seen) = tokio::join!(manager.activate(&stalled), midway);
        assert!(result.unwrap_err().is(ErrorKind::MountConflict));
        assert_eq!(seen, vec!["<div>alpha</div>"]);
        assert_eq!(sidebar(&manager).await, vec!["<div>alpha</div>"]);

        let midway = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            sidebar(&manager).await
        };
        let (result, seen) = tokio::join!(manager.activate(&sloth), midway);
        result.unwrap();
        assert_eq!(seen, vec!["<div>alpha</div>"]);
        assert_eq!(sidebar(&manager).await, vec!["<div>alpha</div>", "<div>sloth</div>"]);
    }

    #[tokio::test]
    async fn test_concurrent_transitions_on_one_key() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let sloth = ExtensionKey::plugin("sloth");
        manager.install(&sloth).await.unwrap();

        let (first, second) = tokio::join!(manager.activate(&sloth), manager.activate(&sloth));
        first.unwrap();
        second.unwrap();
        assert_eq!(sidebar(&manager).await, vec!["<div>sloth</div>"]);
        assert_eq!(manager.hook_registry().registrations(Some(&sloth)).await.len(), 1);

        let (first, second) = tokio::join!(manager.deactivate(&sloth), manager.deactivate(&sloth));
        let failures: Vec<AppError> = [first, second].into_iter().filter_map(Result::err).collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].is(ErrorKind::InvalidTransition));
        assert!(manager.hook_registry().registrations(Some(&sloth)).await.is_empty());
        assert_eq!(manager.get(&sloth).await.unwrap().state, ExtensionState::Inactive);
    }

    #[tokio::test]
    async fn test_failed_theme_switch_keeps_current_theme() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let alpha = ExtensionKey::plugin("alpha");
        let dawn = ExtensionKey::theme("dawn");
        let squatter = ExtensionKey::theme("squatter");
        for key in [&alpha, &dawn, &squatter] {
            manager.install(key).await.unwrap();
        }
        manager.activate(&alpha).await.unwrap();
        manager.activate(&dawn).await.unwrap();

        let err = manager.activate(&squatter).await.unwrap_err();
        assert!(err.is(ErrorKind::MountConflict));

        assert_eq!(manager.active_theme().await.unwrap().id, "dawn");
        assert!(manager.is_live(&dawn).await);
        assert_eq!(fx.store.find(&dawn).await.unwrap().unwrap().state, ExtensionState::Active);
        assert_eq!(manager.get(&squatter).await.unwrap().state, ExtensionState::Installed);
        assert_eq!(fx.store.find(&squatter).await.unwrap().unwrap().state, ExtensionState::Installed);
        match manager.route_table().resolve(&Method::GET, "/about").await {
            RouteMatch::Found { route, .. } => assert_eq!(route.owner, dawn),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rescan_does_not_revert_concurrent_config_write() {
        let fx = Fixture::new();
        let beta = ExtensionKey::plugin("beta");
        let store = Arc::new(SlowStore {
            inner: MemoryExtensionStore::new(),
            slow: beta.clone(),
            delay: Duration::from_millis(200),
        });
        let manager = fx.manager_with(store.clone());
        manager.discover().await.unwrap();
        manager.install(&beta).await.unwrap();

        let write = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            manager.config_store().set_config(&beta, &json!({"links": 2})).await
        };
        let (rescan, written) = tokio::join!(manager.discover(), write);
        rescan.unwrap();
        written.unwrap();

        let config = manager.config_store().get_config(&beta).await.unwrap();
        assert_eq!(Value::Object(config), json!({"links": 2}));
        assert_eq!(store.find(&beta).await.unwrap().unwrap().state, ExtensionState::Installed);
    }

    #[tokio::test]
    async fn test_uninstall_forgets_ordering_slots() {
        let fx = Fixture::new();
        let manager = fx.manager();
        manager.discover().await.unwrap();
        let beta = ExtensionKey::plugin("beta");
        manager.install(&beta).await.unwrap();
        manager.activate(&beta).await.unwrap();
        assert_eq!(manager.hook_registry().remembered_slots().await, 1);

        manager.uninstall(&beta).await.unwrap();
        assert_eq!(manager.hook_registry().remembered_slots().await, 0);
    }
}
