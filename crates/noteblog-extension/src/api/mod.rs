//! Surface exposed to extension code.

pub mod context;

pub use context::ExtensionContext;
