//! Hook system: callback definitions, registry and dispatcher.

pub mod definitions;
pub mod dispatcher;
pub mod registry;

pub use definitions::{
    ActionFn, DEFAULT_PRIORITY, FilterFn, HookArgs, HookFn, HookKind, HookRegistration,
};
pub use dispatcher::{DispatchReport, HookDispatcher, HookFailureCount};
pub use registry::{HookRegistry, StagedHook};
