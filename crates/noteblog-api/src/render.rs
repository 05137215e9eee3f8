//! Tera-backed template renderer handed to extensions.

use std::path::Path;

use serde_json::Value;
use tera::{Context, Tera};
use tracing::{debug, info, warn};

use noteblog_core::config::TemplateConfig;
use noteblog_core::error::{AppError, ErrorKind};
use noteblog_core::result::AppResult;
use noteblog_core::traits::TemplateRenderer;

/// Name of the host page template.
pub const INDEX_TEMPLATE: &str = "index.html";

/// Renders named templates loaded at startup, or inline template source.
#[derive(Debug)]
pub struct TeraRenderer {
    tera: Tera,
    autoescape: bool,
}

impl TeraRenderer {
    /// Loads every template matching `config.directory`. A built-in
    /// `index.html` is used unless the directory provides one.
    pub fn new(config: &TemplateConfig) -> AppResult<Self> {
        let mut tera = if glob_root_exists(&config.directory) {
            Tera::new(&config.directory).map_err(|e| {
                AppError::with_source(
                    ErrorKind::Template,
                    format!("Failed to load templates from '{}'", config.directory),
                    e,
                )
            })?
        } else {
            if !config.directory.is_empty() {
                warn!(glob = %config.directory, "Template directory not found, using built-in templates");
            }
            Tera::default()
        };

        if !tera.get_template_names().any(|n| n == INDEX_TEMPLATE) {
            tera.add_raw_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))
                .map_err(|e| AppError::with_source(ErrorKind::Template, "Invalid built-in index template", e))?;
        }

        info!(count = tera.get_template_names().count(), "Templates loaded");
        Ok(Self {
            tera,
            autoescape: config.autoescape,
        })
    }

    /// Whether a template named `name` is loaded.
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

impl TemplateRenderer for TeraRenderer {
    fn render(&self, template: &str, context: &Value) -> AppResult<String> {
        let ctx = match context {
            Value::Null => Context::new(),
            other => Context::from_serialize(other).map_err(|e| {
                AppError::with_source(ErrorKind::Template, "Template context must be a JSON object", e)
            })?,
        };

        let rendered = if self.has_template(template) {
            debug!(template = %template, "Rendering named template");
            self.tera.render(template, &ctx)
        } else {
            Tera::one_off(template, &ctx, self.autoescape)
        };

        rendered.map_err(|e| {
            let label: String = template.chars().take(40).collect();
            AppError::with_source(ErrorKind::Template, format!("Failed to render '{label}'"), e)
        })
    }
}

// Directory part of a glob such as `templates/**/*.html`.
fn glob_root_exists(glob: &str) -> bool {
    if glob.is_empty() {
        return false;
    }
    let literal: String = glob.chars().take_while(|c| !matches!(c, '*' | '?' | '[' | '{')).collect();
    let root = Path::new(&literal);
    let dir = if literal.ends_with('/') { Some(root) } else { root.parent() };
    dir.is_some_and(|d| d.as_os_str().is_empty() || d.is_dir())
}
