//! Routes contributed by extensions.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use axum::response::Response;
use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;

use crate::api::context::ExtensionContext;

/// Future returned by a route handler.
pub type RouteFuture = BoxFuture<'static, AppResult<Response>>;

/// An incoming request routed to an extension handler.
#[derive(Debug, Clone)]
pub struct ExtensionRequest {
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Values captured by `:name` segments.
    pub params: HashMap<String, String>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
    /// Context of the extension that owns the route.
    pub context: ExtensionContext,
}

impl ExtensionRequest {
    /// Returns a captured path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Parses the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AppError::validation(format!("Invalid JSON body: {e}")))
    }
}

/// Handler for a dynamic extension route.
#[derive(Clone)]
pub struct RouteHandler(Arc<dyn Fn(ExtensionRequest) -> RouteFuture + Send + Sync>);

impl RouteHandler {
    /// Wraps an async handler function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(ExtensionRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Response>> + Send + 'static,
    {
        Self(Arc::new(move |req| Box::pin(f(req))))
    }

    /// Invokes the handler.
    pub fn call(&self, request: ExtensionRequest) -> RouteFuture {
        (self.0)(request)
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RouteHandler(<closure>)")
    }
}

/// What a mounted route does when hit.
#[derive(Debug, Clone)]
pub enum RouteTarget {
    /// Render a template with a static context.
    Template {
        /// Template name.
        template: String,
        /// Context handed to the template.
        context: Value,
    },
    /// Call an extension-supplied handler.
    Handler(RouteHandler),
}

/// A route an extension asks the host to serve.
#[derive(Debug, Clone)]
pub struct ExtensionRoute {
    /// Absolute path, `:name` segments capture parameters.
    pub path: String,
    /// Allowed methods.
    pub methods: Vec<Method>,
    /// Behavior.
    pub target: RouteTarget,
}

impl ExtensionRoute {
    /// A route with explicit methods.
    pub fn new(path: impl Into<String>, methods: Vec<Method>, target: RouteTarget) -> Self {
        Self {
            path: path.into(),
            methods,
            target,
        }
    }

    /// A GET route served by `handler`.
    pub fn get(path: impl Into<String>, handler: RouteHandler) -> Self {
        Self::new(path, vec![Method::GET], RouteTarget::Handler(handler))
    }

    /// A POST route served by `handler`.
    pub fn post(path: impl Into<String>, handler: RouteHandler) -> Self {
        Self::new(path, vec![Method::POST], RouteTarget::Handler(handler))
    }

    pub fn put(path: impl Into<String>, handler: RouteHandler) -> Self {
        Self::new(path, vec![Method::PUT], RouteTarget::Handler(handler))
    }

    pub fn delete(path: impl Into<String>, handler: RouteHandler) -> Self {
        Self::new(path, vec![Method::DELETE], RouteTarget::Handler(handler))
    }

    /// A GET route rendering `template` with `context`.
    pub fn template(path: impl Into<String>, template: impl Into<String>, context: Value) -> Self {
        Self::new(
            path,
            vec![Method::GET],
            RouteTarget::Template {
                template: template.into(),
                context,
            },
        )
    }

    /// Replaces the allowed methods.
    pub fn with_methods(mut self, methods: Vec<Method>) -> Self {
        self.methods = methods;
        self
    }
}

/// A group of routes under a common prefix.
#[derive(Debug, Clone)]
pub struct Blueprint {
    /// Name, for logs.
    pub name: String,
    /// Prefix prepended to every route path.
    pub url_prefix: String,
    /// Routes relative to the prefix.
    pub routes: Vec<ExtensionRoute>,
}

impl Blueprint {
    /// Creates an empty blueprint.
    pub fn new(name: impl Into<String>, url_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_prefix: url_prefix.into(),
            routes: Vec::new(),
        }
    }

    /// Adds a route.
    pub fn route(mut self, route: ExtensionRoute) -> Self {
        self.routes.push(route);
        self
    }

    /// Flattens into absolute routes.
    pub fn into_routes(self) -> Vec<ExtensionRoute> {
        let prefix = self.url_prefix.trim_end_matches('/').to_string();
        self.routes
            .into_iter()
            .map(|mut route| {
                let tail = route.path.trim_start_matches('/');
                route.path = if tail.is_empty() {
                    if prefix.is_empty() { "/".to_string() } else { prefix.clone() }
                } else {
                    format!("{prefix}/{tail}")
                };
                route
            })
            .collect()
    }
}

/// A theme page served straight from a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPage {
    /// Page name.
    pub name: String,
    /// Route path.
    pub route: String,
    /// Template name.
    pub template: String,
    /// Allowed methods, `GET` when empty.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Static template context.
    #[serde(default)]
    pub context: Value,
}

impl CustomPage {
    /// Converts the page into a template route.
    pub fn into_route(self) -> AppResult<ExtensionRoute> {
        let methods = if self.methods.is_empty() {
            vec![Method::GET]
        } else {
            self.methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| {
                        AppError::validation(format!("Page '{}' has invalid method '{m}'", self.name))
                    })
                })
                .collect::<AppResult<Vec<_>>>()?
        };
        Ok(ExtensionRoute::new(
            self.route,
            methods,
            RouteTarget::Template {
                template: self.template,
                context: self.context,
            },
        ))
    }
}
