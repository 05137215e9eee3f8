//! Extension lifecycle state machine.
//!
//! ```text
//! Discovered ──install──▶ Installed ──activate──▶ Active
//!      ▲                                  ▲         │
//!      │                        activate  │         │ deactivate
//!      │                                  │         ▼
//!   (rescan)   Uninstalled ◀──uninstall── Inactive ◀┘
//! ```
//!
//! `Uninstalled` is reachable from every other state, and `install` is
//! valid again from there.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use noteblog_core::AppError;

/// Lifecycle state of an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "extension_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExtensionState {
    /// Found on disk, never installed.
    Discovered,
    /// One-time setup done, hooks not registered.
    Installed,
    /// Hooks registered and routes mounted.
    Active,
    /// Previously active, hooks and routes removed.
    Inactive,
    /// Persisted row removed.
    Uninstalled,
}

/// A requested lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    /// Run one-time setup.
    Install,
    /// Register hooks and mount routes.
    Activate,
    /// Remove hooks and unmount routes.
    Deactivate,
    /// Tear down and delete the persisted row.
    Uninstall,
}

impl LifecycleAction {
    /// Return the action as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ExtensionState {
    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Installed => "installed",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Uninstalled => "uninstalled",
        }
    }

    /// Whether hooks of an extension in this state may be dispatched.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether `install` has completed and `uninstall` has not.
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed | Self::Active | Self::Inactive)
    }

    /// Returns the state reached by applying `action`, or an
    /// `InvalidTransition` error.
    pub fn apply(self, action: LifecycleAction) -> Result<Self, AppError> {
        let next = match (self, action) {
            (Self::Discovered | Self::Uninstalled, LifecycleAction::Install) => Self::Installed,
            (Self::Installed | Self::Inactive, LifecycleAction::Activate) => Self::Active,
            (Self::Active, LifecycleAction::Deactivate) => Self::Inactive,
            (state, LifecycleAction::Uninstall) if state != Self::Uninstalled => Self::Uninstalled,
            (state, action) => {
                return Err(AppError::invalid_transition(format!(
                    "Cannot {action} an extension in state '{state}'"
                )));
            }
        };
        Ok(next)
    }
}

impl fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExtensionState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "discovered" => Ok(Self::Discovered),
            "installed" => Ok(Self::Installed),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "uninstalled" => Ok(Self::Uninstalled),
            _ => Err(AppError::validation(format!(
                "Invalid extension state: '{s}'"
            ))),
        }
    }
}
