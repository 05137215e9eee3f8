//! Mount coordinator: attaches extension routes and static assets to the
//! host's live routing table, and detaches them again.

pub mod route;
pub mod table;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;
use noteblog_entity::extension::ExtensionKey;

use crate::api::context::ExtensionContext;

pub use route::{
    Blueprint, CustomPage, ExtensionRequest, ExtensionRoute, RouteFuture, RouteHandler, RouteTarget,
};
pub use table::{MountedRoute, MountedRouteInfo, RouteMatch, RoutePattern, RouteTable};

/// Path prefixes owned by the host that extensions may not claim.
pub const RESERVED_PREFIXES: &[&str] = &["/api", "/static"];

/// Everything an extension wants served once it is active.
#[derive(Debug, Clone, Default)]
pub struct MountPlan {
    /// Routes to serve.
    pub routes: Vec<ExtensionRoute>,
    /// Absolute static asset directory, served under
    /// `/static/{plugins|themes}/{id}/`.
    pub static_dir: Option<PathBuf>,
}

impl MountPlan {
    /// Whether there is nothing to mount.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.static_dir.is_none()
    }
}

/// URL prefix under which `key`'s static assets are served.
pub fn static_url_prefix(key: &ExtensionKey) -> String {
    format!("/static/{}/{}", key.kind.plural(), key.id)
}

/// Validates and applies mount plans against a [`RouteTable`].
#[derive(Debug, Clone)]
pub struct MountCoordinator {
    table: Arc<RouteTable>,
    reserved: Vec<String>,
}

impl MountCoordinator {
    /// Creates a coordinator over `table` with the default reserved prefixes.
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self {
            table,
            reserved: RESERVED_PREFIXES.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Adds a host-owned prefix extensions may not mount under.
    pub fn reserve(mut self, prefix: impl Into<String>) -> Self {
        self.reserved.push(prefix.into());
        self
    }

    /// Returns the routing table.
    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    /// Mounts every route of `plan` for `key`, or none of them.
    pub async fn mount(&self, key: &ExtensionKey, context: &ExtensionContext, plan: MountPlan) -> AppResult<usize> {
        self.stage(key, context, plan, None).await?;
        Ok(self.publish(key, None).await)
    }

    /// Validates `plan` and reserves its paths without serving them.
    ///
    /// Paths held by `replacing` do not count as conflicts.
    pub async fn stage(
        &self,
        key: &ExtensionKey,
        context: &ExtensionContext,
        plan: MountPlan,
        replacing: Option<&ExtensionKey>,
    ) -> AppResult<usize> {
        if plan.is_empty() {
            debug!(extension = %key, "Nothing to mount");
            return Ok(0);
        }

        let mut mounted = Vec::with_capacity(plan.routes.len());
        for route in plan.routes {
            let pattern = RoutePattern::parse(&route.path)?;
            if let Some(prefix) = self.reserved.iter().find(|p| pattern.is_under(p)) {
                return Err(AppError::mount_conflict(format!(
                    "Route '{}' from {key} is under host prefix '{prefix}'",
                    pattern.as_str()
                )));
            }
            if route.methods.is_empty() {
                return Err(AppError::validation(format!(
                    "Route '{}' from {key} allows no methods",
                    pattern.as_str()
                )));
            }
            mounted.push(MountedRoute {
                owner: key.clone(),
                pattern,
                methods: route.methods,
                target: route.target,
                context: context.clone(),
            });
        }

        if let Some(dir) = &plan.static_dir {
            if !dir.is_dir() {
                return Err(AppError::validation(format!(
                    "Static directory '{}' for {key} does not exist",
                    dir.display()
                )));
            }
        }

        let count = mounted.len();
        self.table.stage_batch(key, mounted, plan.static_dir, replacing).await?;
        debug!(extension = %key, routes = count, "Extension routes staged");
        Ok(count)
    }

    /// Serves what was staged for `key`, unmounting `replacing` in the same
    /// step.
    pub async fn publish(&self, key: &ExtensionKey, replacing: Option<&ExtensionKey>) -> usize {
        let count = self.table.publish(key, replacing).await;
        let has_assets = self.table.asset_dir(key).await.is_some();
        info!(
            extension = %key,
            routes = count,
            static_assets = has_assets,
            "Extension routes mounted"
        );
        count
    }

    /// Releases what was staged for `key` after a failed activation.
    pub async fn discard(&self, key: &ExtensionKey) {
        if self.table.discard(key).await {
            debug!(extension = %key, "Staged routes released");
        }
    }

    /// Removes everything mounted for `key`. Safe to call when nothing is.
    pub async fn unmount(&self, key: &ExtensionKey) -> usize {
        let removed = self.table.remove_owner(key).await;
        if removed > 0 {
            info!(extension = %key, routes = removed, "Extension routes unmounted");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use serde_json::{Value, json};

    use noteblog_core::ErrorKind;
    use noteblog_core::traits::TemplateRenderer;

    #[derive(Debug)]
    struct Blank;

    impl TemplateRenderer for Blank {
        fn render(&self, _template: &str, _context: &Value) -> AppResult<String> {
            Ok(String::new())
        }
    }

    fn context(key: &ExtensionKey) -> ExtensionContext {
        let store = Arc::new(noteblog_database::MemoryExtensionStore::new());
        ExtensionContext::new(
            key.clone(),
            PathBuf::from("/srv"),
            Vec::new(),
            crate::config_store::ConfigStore::new(store),
            Arc::new(Blank),
        )
    }

    fn plan(path: &str, methods: Vec<Method>) -> MountPlan {
        MountPlan {
            routes: vec![ExtensionRoute::template(path, "t.html", json!({})).with_methods(methods)],
            static_dir: None,
        }
    }

    #[tokio::test]
    async fn test_reserved_prefix_is_conflict() {
        let coordinator = MountCoordinator::new(Arc::new(RouteTable::new())).reserve("/admin");
        let key = ExtensionKey::plugin("sneaky");
        let ctx = context(&key);

        for path in ["/api/extensions", "/static/x.css", "/admin"] {
            let err = coordinator
                .mount(&key, &ctx, plan(path, vec![Method::GET]))
                .await
                .unwrap_err();
            assert!(err.is(ErrorKind::MountConflict), "{path}");
        }
        assert!(coordinator.table().routes(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_plans() {
        let coordinator = MountCoordinator::new(Arc::new(RouteTable::new()));
        let key = ExtensionKey::plugin("links");
        let ctx = context(&key);

        let err = coordinator.mount(&key, &ctx, plan("/links", vec![])).await.unwrap_err();
        assert!(err.is(ErrorKind::Validation));

        let missing = MountPlan {
            routes: Vec::new(),
            static_dir: Some(PathBuf::from("/definitely/not/here")),
        };
        let err = coordinator.mount(&key, &ctx, missing).await.unwrap_err();
        assert!(err.is(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_mount_and_unmount() {
        let coordinator = MountCoordinator::new(Arc::new(RouteTable::new()));
        let key = ExtensionKey::plugin("links");
        let ctx = context(&key);
        let dir = tempfile::tempdir().unwrap();

        let mut p = plan("/links", vec![Method::GET]);
        p.static_dir = Some(dir.path().to_path_buf());
        assert_eq!(coordinator.mount(&key, &ctx, p).await.unwrap(), 1);
        assert_eq!(coordinator.table().asset_dir(&key).await.as_deref(), Some(dir.path()));
        assert_eq!(static_url_prefix(&key), "/static/plugins/links");

        assert_eq!(coordinator.unmount(&key).await, 1);
        assert!(coordinator.table().asset_dir(&key).await.is_none());
        assert_eq!(coordinator.unmount(&key).await, 0);
    }
}
