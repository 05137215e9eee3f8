//! Core traits defined in `noteblog-core` and implemented by other crates.

pub mod renderer;

pub use renderer::TemplateRenderer;
