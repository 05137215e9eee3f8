//! Catalog of compiled-in extension factories.
//!
//! A manifest's `entry` names a factory in this catalog; the loader calls
//! it to obtain a fresh extension instance.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use noteblog_core::result::AppResult;
use noteblog_entity::extension::ExtensionKind;

use crate::traits::{Extension, Plugin, Theme};

/// Builds an extension instance.
pub type ExtensionFactory = Arc<dyn Fn() -> AppResult<Extension> + Send + Sync>;

/// Entry name to factory, per kind.
#[derive(Clone, Default)]
pub struct ExtensionCatalog {
    factories: BTreeMap<(ExtensionKind, String), ExtensionFactory>,
}

impl fmt::Debug for ExtensionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionCatalog")
            .field("entries", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a raw factory. A later registration under the same name
    /// replaces the earlier one.
    pub fn register<F>(&mut self, kind: ExtensionKind, entry: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> AppResult<Extension> + Send + Sync + 'static,
    {
        let entry = entry.into();
        debug!(kind = %kind, entry = %entry, "Extension factory registered");
        self.factories.insert((kind, entry), Arc::new(factory));
        self
    }

    /// Registers a plugin constructor.
    pub fn plugin<P, F>(&mut self, entry: impl Into<String>, make: F) -> &mut Self
    where
        P: Plugin + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.register(ExtensionKind::Plugin, entry, move || {
            Ok(Extension::Plugin(Arc::new(make())))
        })
    }

    /// Registers a theme constructor.
    pub fn theme<T, F>(&mut self, entry: impl Into<String>, make: F) -> &mut Self
    where
        T: Theme + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register(ExtensionKind::Theme, entry, move || {
            Ok(Extension::Theme(Arc::new(make())))
        })
    }

    /// Looks up a factory.
    pub fn get(&self, kind: ExtensionKind, entry: &str) -> Option<ExtensionFactory> {
        self.factories.get(&(kind, entry.to_string())).cloned()
    }

    /// Looks up an entry name under either kind, for reporting kind
    /// mismatches.
    pub fn kind_of(&self, entry: &str) -> Option<ExtensionKind> {
        self.factories
            .keys()
            .find(|(_, name)| name == entry)
            .map(|(kind, _)| *kind)
    }

    /// Registered entry names for `kind`.
    pub fn entries(&self, kind: ExtensionKind) -> Vec<String> {
        self.factories
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
