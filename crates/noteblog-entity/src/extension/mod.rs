//! Extension domain entities.

pub mod kind;
pub mod model;
pub mod state;

pub use kind::{ExtensionKey, ExtensionKind};
pub use model::ExtensionDescriptor;
pub use state::{ExtensionState, LifecycleAction};
