//! Template rendering capability consumed from the host.

use serde_json::Value;

use crate::result::AppResult;

/// Renders a named template or an inline template source.
///
/// The extension runtime never owns templates itself; it hands a template
/// reference and a JSON context to whatever engine the host wired in.
pub trait TemplateRenderer: Send + Sync + std::fmt::Debug {
    /// Renders `template` with `context`.
    ///
    /// `template` is looked up as a registered template name first and
    /// otherwise treated as inline template source.
    fn render(&self, template: &str, context: &Value) -> AppResult<String>;
}
