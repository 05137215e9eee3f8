//! Extension loader: scans extension directories and builds instances from
//! the compiled-in catalog.
//!
//! A candidate is any immediate subdirectory holding the kind's manifest
//! file. A candidate that cannot be loaded still yields a descriptor, with
//! `load_error` set, so the failure is visible to administrators.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use noteblog_core::error::AppError;
use noteblog_core::paths::ProjectPaths;
use noteblog_core::result::AppResult;
use noteblog_entity::extension::{ExtensionDescriptor, ExtensionKind};

use crate::catalog::ExtensionCatalog;
use crate::guard;
use crate::manifest::{ExtensionManifest, validate_id};
use crate::traits::Extension;

/// One scanned candidate.
#[derive(Debug, Clone)]
pub struct DiscoveredExtension {
    /// Descriptor built from the manifest and instance metadata.
    pub descriptor: ExtensionDescriptor,
    /// The instance, absent when loading failed.
    pub instance: Option<Extension>,
    /// Absolute static asset directory, if one exists on disk.
    pub static_dir: Option<PathBuf>,
}

/// Discovers extensions on disk.
#[derive(Debug, Clone)]
pub struct ExtensionLoader {
    catalog: Arc<ExtensionCatalog>,
    paths: ProjectPaths,
}

impl ExtensionLoader {
    /// Creates a loader.
    pub fn new(catalog: Arc<ExtensionCatalog>, paths: ProjectPaths) -> Self {
        Self { catalog, paths }
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &Arc<ExtensionCatalog> {
        &self.catalog
    }

    /// Scans the immediate subdirectories of `root` for extensions of `kind`.
    ///
    /// A missing root yields an empty list. Results are ordered by
    /// directory name.
    pub async fn discover(&self, root: &Path, kind: ExtensionKind) -> AppResult<Vec<DiscoveredExtension>> {
        if !root.exists() {
            debug!(root = %root.display(), kind = %kind, "Extension directory does not exist");
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(root).await.map_err(|e| {
            AppError::with_source(
                noteblog_core::ErrorKind::Storage,
                format!("Cannot read extension directory '{}'", root.display()),
                e,
            )
        })?;

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() || !path.join(kind.manifest_file()).is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || name.starts_with("__") {
                continue;
            }
            candidates.push((name, path));
        }
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let mut found = Vec::with_capacity(candidates.len());
        for (name, path) in candidates {
            found.push(self.load_candidate(&name, &path, kind).await);
        }

        let broken = found.iter().filter(|d| d.instance.is_none()).count();
        info!(
            root = %root.display(),
            kind = %kind,
            found = found.len(),
            broken,
            "Extension scan complete"
        );
        Ok(found)
    }

    async fn load_candidate(&self, dir_name: &str, dir: &Path, kind: ExtensionKind) -> DiscoveredExtension {
        let install_path = self.paths.to_relative(dir);

        let manifest = match tokio::fs::read_to_string(dir.join(kind.manifest_file())).await {
            Ok(text) => ExtensionManifest::parse(&text),
            Err(e) => Err(AppError::load(format!("Cannot read manifest: {e}"))),
        };
        let manifest = match manifest {
            Ok(m) => m,
            Err(e) => return broken(kind, dir_name, install_path, e),
        };

        let id = manifest.resolved_id(dir_name);
        if let Err(e) = validate_id(&id) {
            return broken(kind, dir_name, install_path, e);
        }

        let mut descriptor = ExtensionDescriptor::discovered(kind, id.clone(), install_path);
        apply_manifest(&mut descriptor, &manifest);

        let static_dir = Some(dir.join(manifest.static_dir())).filter(|p| p.is_dir());

        let entry = manifest.resolved_entry(&id);
        match self.instantiate(kind, &entry) {
            Ok(instance) => {
                fill_from_instance(&mut descriptor, &manifest, &instance);
                debug!(extension = %descriptor.key(), entry = %entry, "Extension loaded");
                DiscoveredExtension {
                    descriptor,
                    instance: Some(instance),
                    static_dir,
                }
            }
            Err(e) => {
                warn!(extension = %descriptor.key(), entry = %entry, error = %e.message, "Extension failed to load");
                descriptor.load_error = Some(e.message);
                DiscoveredExtension {
                    descriptor,
                    instance: None,
                    static_dir,
                }
            }
        }
    }

    fn instantiate(&self, kind: ExtensionKind, entry: &str) -> AppResult<Extension> {
        let factory = self.catalog.get(kind, entry).ok_or_else(|| match self.catalog.kind_of(entry) {
            Some(other) => AppError::load(format!("Entry '{entry}' is a {other}, expected a {kind}")),
            None => AppError::load(format!("No {kind} named '{entry}' is compiled in")),
        })?;

        let instance = guard::call_sync(|| factory(), |detail| {
            AppError::load(format!("Factory for '{entry}' {detail}"))
        })?;

        if instance.kind() != kind {
            return Err(AppError::load(format!(
                "Entry '{entry}' produced a {}, expected a {kind}",
                instance.kind()
            )));
        }
        Ok(instance)
    }
}

fn broken(kind: ExtensionKind, dir_name: &str, install_path: String, error: AppError) -> DiscoveredExtension {
    warn!(kind = %kind, dir = %dir_name, error = %error.message, "Extension failed to load");
    let mut descriptor = ExtensionDescriptor::discovered(kind, dir_name, install_path);
    descriptor.load_error = Some(error.message);
    DiscoveredExtension {
        descriptor,
        instance: None,
        static_dir: None,
    }
}

fn apply_manifest(descriptor: &mut ExtensionDescriptor, manifest: &ExtensionManifest) {
    if let Some(name) = manifest.name.as_ref().filter(|s| !s.is_empty()) {
        descriptor.display_name = name.clone();
    }
    if let Some(version) = &manifest.version {
        descriptor.version = version.clone();
    }
    if let Some(description) = &manifest.description {
        descriptor.description = description.clone();
    }
    if let Some(author) = &manifest.author {
        descriptor.author = author.clone();
    }
}

// Manifest values win; the instance fills whatever the manifest left out.
fn fill_from_instance(descriptor: &mut ExtensionDescriptor, manifest: &ExtensionManifest, instance: &Extension) {
    if manifest.name.as_deref().is_none_or(str::is_empty) && !instance.display_name().is_empty() {
        descriptor.display_name = instance.display_name().to_string();
    }
    if manifest.version.is_none() {
        descriptor.version = instance.version().to_string();
    }
    if manifest.description.is_none() {
        descriptor.description = instance.description().to_string();
    }
    if manifest.author.is_none() {
        descriptor.author = instance.author().to_string();
    }
}
