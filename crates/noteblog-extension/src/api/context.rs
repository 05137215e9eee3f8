//! Extension context: the services an extension can reach.
//!
//! One context is built per extension for each lifecycle call and handed
//! to route handlers of that extension. Hook, route and static asset
//! registrations are only accepted while the extension is being activated.
//! They are held back until activation commits them all at once.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;
use noteblog_core::traits::TemplateRenderer;
use noteblog_entity::extension::ExtensionKey;

use crate::config_store::ConfigStore;
use crate::hooks::definitions::{ActionFn, FilterFn, HookKind};
use crate::hooks::registry::{HookRegistry, StagedHook};
use crate::mount::{ExtensionRoute, MountPlan};

#[derive(Debug, Default)]
struct Staging {
    open: bool,
    hooks: Vec<StagedHook>,
    routes: Vec<ExtensionRoute>,
    static_dir: Option<PathBuf>,
}

/// Registrations collected during one activation.
#[derive(Debug, Default)]
pub(crate) struct StagedActivation {
    pub hooks: Vec<StagedHook>,
    pub mounts: MountPlan,
}

/// Handle passed to extension code.
#[derive(Clone)]
pub struct ExtensionContext {
    key: ExtensionKey,
    install_dir: PathBuf,
    secret_keys: Arc<Vec<String>>,
    configs: ConfigStore,
    renderer: Arc<dyn TemplateRenderer>,
    staging: Arc<Mutex<Staging>>,
}

impl fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("key", &self.key)
            .field("install_dir", &self.install_dir)
            .finish()
    }
}

impl ExtensionContext {
    pub(crate) fn new(
        key: ExtensionKey,
        install_dir: PathBuf,
        secret_keys: Vec<String>,
        configs: ConfigStore,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            key,
            install_dir,
            secret_keys: Arc::new(secret_keys),
            configs,
            renderer,
            staging: Arc::new(Mutex::new(Staging::default())),
        }
    }

    /// Identity of the extension.
    pub fn key(&self) -> &ExtensionKey {
        &self.key
    }

    /// Extension id.
    pub fn id(&self) -> &str {
        &self.key.id
    }

    /// Absolute directory the extension was discovered in.
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Stored configuration, empty if none.
    pub async fn get_config(&self) -> AppResult<Map<String, Value>> {
        self.configs.get_config(&self.key).await
    }

    /// One configuration value, or `default` if unset.
    pub async fn config_value(&self, name: &str, default: Value) -> AppResult<Value> {
        Ok(self.get_config().await?.remove(name).unwrap_or(default))
    }

    /// Replaces the stored configuration.
    pub async fn set_config<T: Serialize + ?Sized>(&self, value: &T) -> AppResult<()> {
        self.configs.set_config(&self.key, value).await
    }

    /// Stored configuration without secret keys.
    pub async fn safe_config(&self) -> AppResult<Map<String, Value>> {
        self.configs.safe_view(&self.key, &self.secret_keys).await
    }

    /// Merges `patch` into the stored configuration, keeping secrets that
    /// the patch leaves blank.
    pub async fn update_config(&self, patch: Map<String, Value>) -> AppResult<Map<String, Value>> {
        self.configs.update_config(&self.key, patch, &self.secret_keys).await
    }

    /// Reads, changes and writes back the configuration while holding the
    /// extension's config lock.
    ///
    /// `edit` returns the new configuration and a value handed back to the
    /// caller. Nothing is written if it fails.
    pub async fn modify_config<T, R, F>(&self, edit: F) -> AppResult<R>
    where
        T: Serialize,
        F: FnOnce(Map<String, Value>) -> AppResult<(T, R)>,
    {
        self.configs.modify_config(&self.key, edit).await
    }

    /// Registers an action callback owned by this extension.
    pub async fn register_action(&self, point: &str, hook: ActionFn, priority: i32) -> AppResult<()> {
        HookRegistry::validate(HookKind::Action, point, hook.arity(), &self.key)?;
        self.stage("action", |staging| {
            staging.hooks.push(StagedHook::Action {
                point: point.to_string(),
                hook,
                priority,
            })
        })
        .await
    }

    /// Registers a filter callback owned by this extension.
    pub async fn register_filter(&self, point: &str, hook: FilterFn, priority: i32) -> AppResult<()> {
        HookRegistry::validate(HookKind::Filter, point, hook.arity(), &self.key)?;
        self.stage("filter", |staging| {
            staging.hooks.push(StagedHook::Filter {
                point: point.to_string(),
                hook,
                priority,
            })
        })
        .await
    }

    /// Asks the host to serve `route` once activation completes.
    pub async fn register_route(&self, route: ExtensionRoute) -> AppResult<()> {
        debug!(extension = %self.key, path = %route.path, "Route requested");
        self.stage("route", |staging| staging.routes.push(route)).await
    }

    /// Serves `dir` (relative to the install directory, or absolute) under
    /// the extension's static URL prefix.
    pub async fn register_static_assets(&self, dir: impl AsRef<Path>) -> AppResult<()> {
        let dir = dir.as_ref();
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.install_dir.join(dir)
        };
        self.stage("static asset directory", |staging| staging.static_dir = Some(dir))
            .await
    }

    /// Renders a template through the host's engine.
    pub fn render(&self, template: &str, context: &Value) -> AppResult<String> {
        self.renderer.render(template, context)
    }

    async fn stage(&self, what: &str, apply: impl FnOnce(&mut Staging)) -> AppResult<()> {
        let mut staging = self.staging.lock().await;
        if !staging.open {
            warn!(extension = %self.key, what, "Registration outside activation rejected");
            return Err(AppError::invalid_transition(format!(
                "{} can only register a {what} while it is being activated",
                self.key
            )));
        }
        apply(&mut *staging);
        Ok(())
    }

    /// Starts collecting registrations, dropping anything left over.
    pub(crate) async fn begin_activation(&self) {
        let mut staging = self.staging.lock().await;
        *staging = Staging {
            open: true,
            ..Staging::default()
        };
    }

    /// Stops collecting and hands over everything registered.
    pub(crate) async fn finish_activation(&self) -> StagedActivation {
        let mut staging = self.staging.lock().await;
        let taken = std::mem::take(&mut *staging);
        StagedActivation {
            hooks: taken.hooks,
            mounts: MountPlan {
                routes: taken.routes,
                static_dir: taken.static_dir,
            },
        }
    }
}
