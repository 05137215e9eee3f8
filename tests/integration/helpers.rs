//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use noteblog_api::{AppState, TeraRenderer, build_app};
use noteblog_core::config::{AppConfig, ExtensionConfig, TemplateConfig};
use noteblog_core::error::AppError;
use noteblog_core::result::AppResult;
use noteblog_core::traits::TemplateRenderer;
use noteblog_database::{ExtensionStore, MemoryExtensionStore};
use noteblog_extension::hooks::HookFn;
use noteblog_extension::mount::{Blueprint, CustomPage, ExtensionRequest, ExtensionRoute, RouteHandler};
use noteblog_extension::{ExtensionCatalog, ExtensionContext, ExtensionManager, Plugin, Theme};

/// Test application context
pub struct TestApp {
    /// Project root holding `plugins/` and `themes/`
    pub root: TempDir,
    /// Shared extension store, kept to simulate restarts
    pub store: Arc<dyn ExtensionStore>,
    /// The extension manager behind the router
    pub manager: Arc<ExtensionManager>,
    /// The Axum router for making test requests
    pub router: Router,
}

/// A captured response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub text: String,
}

impl TestResponse {
    /// Body parsed as JSON, `Null` when it is not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }
}

impl TestApp {
    /// Creates an app over a project with the friend links plugin, the
    /// `paper` and `ink` themes and a `noisy` test plugin.
    pub async fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create project dir");
        seed_project(root.path());
        Self::start(root, Arc::new(MemoryExtensionStore::new())).await
    }

    /// Starts a fresh process over an existing project and store.
    pub async fn start(root: TempDir, store: Arc<dyn ExtensionStore>) -> Self {
        let mut config = AppConfig::default();
        config.extensions = ExtensionConfig {
            project_root: root.path().to_string_lossy().into_owned(),
            hook_timeout_seconds: 2,
            ..ExtensionConfig::default()
        };
        config.templates = TemplateConfig {
            directory: String::new(),
            autoescape: true,
        };

        let renderer = Arc::new(TeraRenderer::new(&config.templates).expect("Failed to load templates"));
        let shared: Arc<dyn TemplateRenderer> = renderer.clone();
        let manager = Arc::new(ExtensionManager::new(
            &config.extensions,
            Arc::clone(&store),
            Arc::new(catalog()),
            shared,
        ));
        manager.bootstrap().await.expect("Failed to bootstrap extensions");

        let router = build_app(AppState::new(config, Arc::clone(&manager), renderer));
        Self {
            root,
            store,
            manager,
            router,
        }
    }

    /// Simulates a restart: drops this process and starts another one over
    /// the same project and store.
    pub async fn restart(self) -> Self {
        self.manager.shutdown().await;
        Self::start(self.root, self.store).await
    }

    /// Make an HTTP request to the app
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("Failed to build request"))
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        TestResponse {
            status,
            headers,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Option<Value>) -> TestResponse {
        self.request("POST", uri, body).await
    }

    /// Installs and activates through the admin API.
    pub async fn enable(&self, kind: &str, id: &str) {
        let installed = self.post(&format!("/api/admin/extensions/{kind}/{id}/install"), None).await;
        assert_eq!(installed.status, StatusCode::OK, "install {id}: {}", installed.text);
        let activated = self.post(&format!("/api/admin/extensions/{kind}/{id}/activate"), None).await;
        assert_eq!(activated.status, StatusCode::OK, "activate {id}: {}", activated.text);
    }
}

fn write(dir: &Path, file: &str, body: &str) {
    if let Some(parent) = dir.join(file).parent() {
        std::fs::create_dir_all(parent).expect("Failed to create dir");
    }
    std::fs::write(dir.join(file), body).expect("Failed to write fixture");
}

/// Lays out extension directories the way a deployment does.
pub fn seed_project(root: &Path) {
    let links = root.join("plugins").join("friend_links");
    write(&links, "plugin.toml", "entry = \"friend_links\"\n");
    write(&links, "static/css/friend_links.css", ".friend-links { color: teal; }\n");
    write(&links, "static/js/friend_links.js", "console.log('links');\n");

    write(&root.join("plugins").join("noisy"), "plugin.toml", "name = \"Noisy\"\n");
    write(&root.join("plugins").join("ghost"), "plugin.toml", "entry = \"not_compiled_in\"\n");

    write(&root.join("themes").join("paper"), "theme.toml", "version = \"2.0.0\"\n");
    write(&root.join("themes").join("ink"), "theme.toml", "");
}

/// Catalog with the shipped plugin and the test extensions.
pub fn catalog() -> ExtensionCatalog {
    let mut catalog = ExtensionCatalog::new();
    plugin_friend_links::register(&mut catalog);
    catalog.plugin("noisy", || NoisyPlugin);
    catalog.theme("paper", || PaperTheme { name: "Paper" });
    catalog.theme("ink", || PaperTheme { name: "Ink" });
    catalog
}

/// Plugin with a failing action, a title filter and a panicking route.
#[derive(Debug)]
pub struct NoisyPlugin;

#[async_trait]
impl Plugin for NoisyPlugin {
    fn name(&self) -> &str {
        "Noisy"
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn secret_keys(&self) -> Vec<String> {
        vec!["api_key".to_string()]
    }

    async fn install(&self, ctx: &ExtensionContext) -> AppResult<bool> {
        ctx.set_config(&json!({"greeting": "hi", "api_key": "s3cr3t"})).await?;
        Ok(true)
    }

    async fn uninstall(&self, _ctx: &ExtensionContext) -> AppResult<bool> {
        Ok(true)
    }

    async fn register_hooks(&self, ctx: &ExtensionContext) -> AppResult<()> {
        ctx.register_action(
            "footer",
            HookFn::arity0(|| async {
                Err::<Option<String>, _>(AppError::internal("footer exploded"))
            }),
            1,
        )
        .await?;
        ctx.register_action(
            "footer",
            HookFn::arity1(|page: Value| async move {
                Ok(Some(format!("<p>noisy footer on {}</p>", page.as_str().unwrap_or("?"))))
            }),
            20,
        )
        .await?;
        ctx.register_filter(
            "site_title",
            HookFn::arity1(|title: Value| async move {
                Ok(Value::String(format!("{} (loud)", title.as_str().unwrap_or_default())))
            }),
            10,
        )
        .await?;
        ctx.register_route(ExtensionRoute::get("/noisy/panic", RouteHandler::new(explode)))
            .await
    }
}

async fn explode(_req: ExtensionRequest) -> AppResult<Response> {
    panic!("route handler panicked")
}

/// Theme contributing a blueprint and a template page.
#[derive(Debug)]
pub struct PaperTheme {
    pub name: &'static str,
}

#[async_trait]
impl Theme for PaperTheme {
    fn theme_name(&self) -> &str {
        self.name
    }

    fn blueprints(&self) -> Vec<Blueprint> {
        let name = self.name;
        vec![Blueprint::new("pages", "/theme").route(ExtensionRoute::get(
            "/whoami",
            RouteHandler::new(move |_req| async move { Ok(name.into_response()) }),
        ))]
    }

    fn custom_pages(&self) -> Vec<CustomPage> {
        vec![CustomPage {
            name: "about".to_string(),
            route: "/about".to_string(),
            template: "<h1>About {{ title }}</h1>".to_string(),
            methods: Vec::new(),
            context: json!({"title": self.name}),
        }]
    }
}
