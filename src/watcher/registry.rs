//! Watch registry: installed directory watches and the config that owns each.
//!
//! Every directory below a configured source gets exactly one watch handle.
//! The handle-keyed table is authoritative; the directory index exists
//! because the OS backend reports events by path.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::backend::WatchBackend;
use super::error::WatchError;
use crate::types::{WatchConfig, WatchHandle};

/// One installed watch.
#[derive(Debug, Clone)]
struct RegistryEntry {
    directory: PathBuf,
    config: Arc<WatchConfig>,
}

/// Result of registering a directory discovered at runtime.
#[derive(Debug, Default)]
pub struct Extension {
    /// Handles installed by this call (already-watched directories excluded).
    pub handles: Vec<WatchHandle>,
    /// Entries that already existed below the new directory, parents first.
    pub existing: Vec<PathBuf>,
}

/// Handle → config table plus the operations that install watches.
pub struct WatchRegistry {
    backend: Box<dyn WatchBackend>,
    entries: HashMap<WatchHandle, RegistryEntry>,
    by_directory: HashMap<PathBuf, WatchHandle>,
    /// Configs registered through `register_tree`, in registration order.
    roots: Vec<Arc<WatchConfig>>,
    next_handle: NonZeroU64,
}

impl WatchRegistry {
    pub fn new(backend: impl WatchBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            entries: HashMap::new(),
            by_directory: HashMap::new(),
            roots: Vec::new(),
            next_handle: NonZeroU64::MIN,
        }
    }

    /// Watch `config.source` and every directory below it.
    ///
    /// Directories already watched for an enclosing source are handed over to
    /// `config`. Any walk or watch failure is returned; nothing is rolled
    /// back, since a failed tree aborts startup anyway.
    pub fn register_tree(&mut self, config: &Arc<WatchConfig>) -> Result<usize, WatchError> {
        let mut installed = 0;
        if !self.roots.iter().any(|root| Arc::ptr_eq(root, config)) {
            self.roots.push(Arc::clone(config));
        }

        for entry in WalkDir::new(&config.source).follow_links(false) {
            let entry = entry.map_err(|e| WatchError::SourceUnreadable {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| config.source.clone()),
                source: e.into(),
            })?;

            if entry.file_type().is_dir() {
                let known = self.by_directory.contains_key(entry.path());
                self.register_one(entry.path(), config)?;
                if !known {
                    installed += 1;
                }
            }
        }

        crate::log_event!(
            "registry",
            "registered",
            "{installed} directories for {config}"
        );
        Ok(installed)
    }

    /// Install a watch on a single directory.
    ///
    /// The directory is owned by the registered source closest to it, falling
    /// back to `config`. Among identical sources the later one wins. A
    /// directory that is already watched keeps its handle; its config moves
    /// to the new owner when that owner's source is at least as specific.
    pub fn register_one(
        &mut self,
        directory: &Path,
        config: &Arc<WatchConfig>,
    ) -> Result<WatchHandle, WatchError> {
        let owner = self
            .owner_for(directory)
            .unwrap_or_else(|| Arc::clone(config));

        if let Some(&handle) = self.by_directory.get(directory) {
            if let Some(entry) = self.entries.get_mut(&handle) {
                if !Arc::ptr_eq(&entry.config, &owner)
                    && owner.source.starts_with(&entry.config.source)
                {
                    crate::debug_event!(
                        "registry",
                        "rebound",
                        "{} {handle} to {owner}",
                        directory.display()
                    );
                    entry.config = owner;
                    return Ok(handle);
                }
            }
            crate::debug_event!(
                "registry",
                "already watched",
                "{} ({handle})",
                directory.display()
            );
            return Ok(handle);
        }

        if !directory.is_dir() {
            return Err(WatchError::PathWatchFailed {
                path: directory.to_path_buf(),
                reason: "not an existing directory".to_string(),
            });
        }

        self.backend.watch(directory)?;

        let handle = self.next_handle();
        self.entries.insert(
            handle,
            RegistryEntry {
                directory: directory.to_path_buf(),
                config: owner,
            },
        );
        self.by_directory.insert(directory.to_path_buf(), handle);

        crate::debug_event!("registry", "watching", "{} {handle}", directory.display());
        Ok(handle)
    }

    /// Register a directory created at runtime together with everything
    /// already nested inside it.
    ///
    /// Entries that disappear during the walk are skipped. Fails only when
    /// `directory` itself cannot be watched.
    pub fn extend(
        &mut self,
        directory: &Path,
        config: &Arc<WatchConfig>,
    ) -> Result<Extension, WatchError> {
        let mut extension = Extension::default();

        let known = self.by_directory.contains_key(directory);
        let root = self.register_one(directory, config)?;
        if !known {
            extension.handles.push(root);
        }

        for entry in WalkDir::new(directory).follow_links(false).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    crate::debug_event!("registry", "walk skipped", "{e}");
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                let known = self.by_directory.contains_key(entry.path());
                match self.register_one(entry.path(), config) {
                    Ok(handle) if !known => extension.handles.push(handle),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("[registry] cannot watch nested directory: {e}");
                        continue;
                    }
                }
            }
            extension.existing.push(entry.into_path());
        }

        Ok(extension)
    }

    /// Config that owns `handle`.
    ///
    /// An unknown handle means the registry and the event stream disagree.
    pub fn lookup(&self, handle: WatchHandle) -> Result<&Arc<WatchConfig>, WatchError> {
        self.entries
            .get(&handle)
            .map(|entry| &entry.config)
            .ok_or(WatchError::UnknownHandle(handle))
    }

    /// Handle watching `directory`, if any.
    pub fn resolve(&self, directory: &Path) -> Option<WatchHandle> {
        self.by_directory.get(directory).copied()
    }

    /// Directory watched by `handle`.
    pub fn directory(&self, handle: WatchHandle) -> Option<&Path> {
        self.entries.get(&handle).map(|entry| entry.directory.as_path())
    }

    pub fn contains_directory(&self, directory: &Path) -> bool {
        self.by_directory.contains_key(directory)
    }

    pub fn handles(&self) -> impl Iterator<Item = WatchHandle> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-arm a handle after its events were processed.
    ///
    /// Returns false, and drops the entry, when the watched directory no
    /// longer exists. That is the normal outcome of deleting a watched
    /// directory.
    pub fn rearm(&mut self, handle: WatchHandle) -> bool {
        let Some(entry) = self.entries.get(&handle) else {
            return false;
        };
        if entry.directory.is_dir() {
            return true;
        }

        let directory = entry.directory.clone();
        self.remove(handle);
        crate::log_event!(
            "registry",
            "watch no longer valid",
            "{} {handle}",
            directory.display()
        );
        false
    }

    /// Drop the watch on `directory` and on every watched directory below it.
    pub fn drop_subtree(&mut self, directory: &Path) -> usize {
        let doomed: Vec<WatchHandle> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.directory.starts_with(directory))
            .map(|(handle, _)| *handle)
            .collect();

        for handle in &doomed {
            self.remove(*handle);
        }

        if !doomed.is_empty() {
            crate::log_event!(
                "registry",
                "dropped",
                "{} watches under {}",
                doomed.len(),
                directory.display()
            );
        }
        doomed.len()
    }

    fn remove(&mut self, handle: WatchHandle) {
        if let Some(entry) = self.entries.remove(&handle) {
            self.by_directory.remove(&entry.directory);
            // The OS usually dropped the watch together with the directory
            if let Err(e) = self.backend.unwatch(&entry.directory) {
                crate::debug_event!("registry", "unwatch", "{e}");
            }
        }
    }

    /// Root config with the deepest source containing `directory`.
    fn owner_for(&self, directory: &Path) -> Option<Arc<WatchConfig>> {
        self.roots
            .iter()
            .filter(|root| directory.starts_with(&root.source))
            // max_by_key keeps the last of equal keys
            .max_by_key(|root| root.source.components().count())
            .cloned()
    }

    fn next_handle(&mut self) -> WatchHandle {
        let handle = WatchHandle::from(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        handle
    }
}
