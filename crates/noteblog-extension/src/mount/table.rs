//! Live routing table consulted by the host for extension routes.

use std::collections::HashMap;
use std::path::PathBuf;

use axum::http::Method;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;

use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;
use noteblog_entity::extension::ExtensionKey;

use super::route::{ExtensionRequest, RouteTarget};
use crate::api::context::ExtensionContext;
use crate::guard;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parses a path such as `/archive/:year/:slug`.
    ///
    /// `{name}` is accepted as an alias for `:name`. A trailing slash is
    /// ignored.
    pub fn parse(path: &str) -> AppResult<Self> {
        if !path.starts_with('/') {
            return Err(AppError::validation(format!("Route '{path}' must start with '/'")));
        }

        let mut segments = Vec::new();
        for part in split_path(path) {
            let param = part
                .strip_prefix(':')
                .or_else(|| part.strip_prefix('{').and_then(|p| p.strip_suffix('}')));
            match param {
                Some("") => {
                    return Err(AppError::validation(format!("Route '{path}' has an unnamed parameter")));
                }
                Some(name) => {
                    if segments.iter().any(|s| matches!(s, Segment::Param(n) if n == name)) {
                        return Err(AppError::validation(format!(
                            "Route '{path}' repeats parameter '{name}'"
                        )));
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        let raw = if segments.is_empty() {
            "/".to_string()
        } else {
            let parts: Vec<String> = segments
                .iter()
                .map(|s| match s {
                    Segment::Literal(l) => l.clone(),
                    Segment::Param(p) => format!(":{p}"),
                })
                .collect();
            format!("/{}", parts.join("/"))
        };
        Ok(Self { raw, segments })
    }

    /// Normalized path text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this pattern and `other` can match the same request path.
    pub fn overlaps(&self, other: &RoutePattern) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|pair| match pair {
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                (Segment::Param(_), Segment::Param(_)) => true,
                _ => false,
            })
    }

    /// Whether some request path is matched by both patterns.
    ///
    /// Unlike [`overlaps`](Self::overlaps), a parameter segment shadows
    /// any literal in the same position.
    pub fn shadows(&self, other: &RoutePattern) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|pair| match pair {
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                _ => true,
            })
    }

    /// Whether the pattern starts with the literal prefix `prefix`.
    pub fn is_under(&self, prefix: &str) -> bool {
        let prefix: Vec<&str> = split_path(prefix).collect();
        !prefix.is_empty()
            && self.segments.len() >= prefix.len()
            && prefix
                .iter()
                .zip(&self.segments)
                .all(|(p, s)| matches!(s, Segment::Literal(l) if l == p))
    }

    /// Matches a request path, returning captured parameters.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(l) if l == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|p| !p.is_empty())
}

/// One route currently served on behalf of an extension.
#[derive(Debug, Clone)]
pub struct MountedRoute {
    /// Owning extension.
    pub owner: ExtensionKey,
    /// Parsed path.
    pub pattern: RoutePattern,
    /// Allowed methods.
    pub methods: Vec<Method>,
    /// Behavior.
    pub target: RouteTarget,
    /// Owner's context, handed to handlers.
    pub context: ExtensionContext,
}

impl MountedRoute {
    /// Serves a request that resolved to this route.
    ///
    /// Template targets see their static context plus `params` and
    /// `query`. A panicking handler yields an `Internal` error.
    pub async fn serve(&self, request: ExtensionRequest) -> AppResult<Response> {
        match &self.target {
            RouteTarget::Template { template, context } => {
                let mut merged = match context {
                    Value::Object(map) => map.clone(),
                    Value::Null => Map::new(),
                    other => Map::from_iter([("context".to_string(), other.clone())]),
                };
                merged.insert("params".to_string(), json!(request.params));
                merged.insert(
                    "query".to_string(),
                    request.query.clone().map(Value::String).unwrap_or(Value::Null),
                );
                let html = self.context.render(template, &Value::Object(merged))?;
                Ok(Html(html).into_response())
            }
            RouteTarget::Handler(handler) => {
                guard::call_async(handler.call(request), |detail| {
                    AppError::internal(format!("Route handler of {} {detail}", self.owner))
                })
                .await
            }
        }
    }
}

/// Serializable summary of a mounted route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountedRouteInfo {
    /// Owning extension.
    pub owner: ExtensionKey,
    /// Normalized path.
    pub path: String,
    /// Allowed methods.
    pub methods: Vec<String>,
}

/// Result of looking up a request in the table.
#[derive(Debug)]
pub enum RouteMatch {
    /// A route accepts the request.
    Found {
        /// The route.
        route: MountedRoute,
        /// Captured path parameters.
        params: HashMap<String, String>,
    },
    /// The path matched but not the method.
    MethodNotAllowed(Vec<Method>),
    /// Nothing matched.
    NotFound,
}

#[derive(Debug, Default)]
struct StagedBatch {
    routes: Vec<MountedRoute>,
    assets: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct TableInner {
    routes: Vec<MountedRoute>,
    assets: HashMap<ExtensionKey, PathBuf>,
    /// Batches that passed the conflict check but are not served yet.
    staged: HashMap<ExtensionKey, StagedBatch>,
}

/// Two routes collide when they share a method and can match the same path.
/// Within one owner only identical shapes collide; the more literal route
/// wins at resolve time.
fn collides(route: &MountedRoute, other: &MountedRoute) -> bool {
    let same_path = if route.owner == other.owner {
        route.pattern.overlaps(&other.pattern)
    } else {
        route.pattern.shadows(&other.pattern)
    };
    same_path && shares_method(&route.methods, &other.methods)
}

/// Routes and static asset directories mounted by active extensions.
#[derive(Debug, Default)]
pub struct RouteTable {
    inner: RwLock<TableInner>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch of routes for `owner`, all or nothing, and serves it.
    pub async fn insert_batch(
        &self,
        owner: &ExtensionKey,
        routes: Vec<MountedRoute>,
        assets: Option<PathBuf>,
    ) -> AppResult<usize> {
        self.stage_batch(owner, routes, assets, None).await?;
        Ok(self.publish(owner, None).await)
    }

    /// Reserves a batch of routes for `owner` without serving it.
    ///
    /// Fails with `MountConflict` if any route collides with a mounted or
    /// staged route, or with another route of the batch. Routes owned by
    /// `replacing` are ignored, since [`publish`](Self::publish) removes
    /// them.
    pub async fn stage_batch(
        &self,
        owner: &ExtensionKey,
        routes: Vec<MountedRoute>,
        assets: Option<PathBuf>,
        replacing: Option<&ExtensionKey>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;

        for (i, route) in routes.iter().enumerate() {
            let mounted = inner
                .routes
                .iter()
                .filter(|r| Some(&r.owner) != replacing)
                .map(|r| (r, "mounted"));
            let staged = inner
                .staged
                .iter()
                .filter(|(k, _)| *k != owner)
                .flat_map(|(_, batch)| batch.routes.iter())
                .map(|r| (r, "pending"));
            let earlier = routes[..i].iter().map(|r| (r, "batch"));
            for (other, origin) in mounted.chain(staged).chain(earlier) {
                if collides(route, other) {
                    return Err(AppError::mount_conflict(format!(
                        "Route '{}' from {owner} collides with '{}' ({origin}, owned by {})",
                        route.pattern.as_str(),
                        other.pattern.as_str(),
                        other.owner
                    )));
                }
            }
        }

        inner.staged.insert(owner.clone(), StagedBatch { routes, assets });
        Ok(())
    }

    /// Starts serving the staged batch of `owner`, dropping everything of
    /// `replacing` in the same step. Returns the number of routes served.
    pub async fn publish(&self, owner: &ExtensionKey, replacing: Option<&ExtensionKey>) -> usize {
        let mut inner = self.inner.write().await;
        if let Some(previous) = replacing {
            inner.routes.retain(|r| &r.owner != previous);
            inner.assets.remove(previous);
        }
        let Some(batch) = inner.staged.remove(owner) else {
            return 0;
        };
        let count = batch.routes.len();
        inner.routes.extend(batch.routes);
        if let Some(dir) = batch.assets {
            inner.assets.insert(owner.clone(), dir);
        }
        count
    }

    /// Drops the staged batch of `owner`, if any.
    pub async fn discard(&self, owner: &ExtensionKey) -> bool {
        self.inner.write().await.staged.remove(owner).is_some()
    }

    /// Removes every route and asset directory of `owner`.
    pub async fn remove_owner(&self, owner: &ExtensionKey) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.routes.len();
        inner.routes.retain(|r| &r.owner != owner);
        inner.assets.remove(owner);
        inner.staged.remove(owner);
        before - inner.routes.len()
    }

    /// Looks up a request.
    ///
    /// Among matching routes the one with the most literal segments wins.
    pub async fn resolve(&self, method: &Method, path: &str) -> RouteMatch {
        let inner = self.inner.read().await;
        let mut allowed: Vec<Method> = Vec::new();
        let mut best: Option<(usize, &MountedRoute, HashMap<String, String>)> = None;

        for route in &inner.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            if !route.methods.contains(method) {
                for m in &route.methods {
                    if !allowed.contains(m) {
                        allowed.push(m.clone());
                    }
                }
                continue;
            }
            let score = route.pattern.literal_count();
            if best.as_ref().is_none_or(|(s, _, _)| score > *s) {
                best = Some((score, route, params));
            }
        }

        match best {
            Some((_, route, params)) => RouteMatch::Found {
                route: route.clone(),
                params,
            },
            None if !allowed.is_empty() => RouteMatch::MethodNotAllowed(allowed),
            None => RouteMatch::NotFound,
        }
    }

    /// Static directory mounted for `owner`.
    pub async fn asset_dir(&self, owner: &ExtensionKey) -> Option<PathBuf> {
        self.inner.read().await.assets.get(owner).cloned()
    }

    /// Summaries of mounted routes, optionally for one owner.
    pub async fn routes(&self, owner: Option<&ExtensionKey>) -> Vec<MountedRouteInfo> {
        let inner = self.inner.read().await;
        inner
            .routes
            .iter()
            .filter(|r| owner.is_none_or(|o| &r.owner == o))
            .map(|r| MountedRouteInfo {
                owner: r.owner.clone(),
                path: r.pattern.as_str().to_string(),
                methods: r.methods.iter().map(|m| m.as_str().to_string()).collect(),
            })
            .collect()
    }
}

fn shares_method(a: &[Method], b: &[Method]) -> bool {
    a.iter().any(|m| b.contains(m))
}
