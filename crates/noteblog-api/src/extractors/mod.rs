//! Custom extractors and path helpers.

pub mod path;

pub use path::ExtensionPath;
