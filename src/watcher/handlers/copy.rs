//! Handler that mirrors changes into the destination tree.
//!
//! Created and modified entries are copied, deleted entries are removed.
//! No content comparison is done: every event rewrites the mirrored file.
//! Symlinks are never followed: a link is mirrored as a link to the same
//! target, matching the registry, which never watches through one.

use std::fs;
use std::io;
use std::path::Path;

use crate::types::{WatchConfig, WatchHandle};
use crate::watcher::{ChangeEvent, ChangeHandler, ChangeKind, WatchError};

/// Mirrors source changes into `config.destination`.
#[derive(Debug, Default)]
pub struct CopyHandler {
    copied: u64,
    removed: u64,
}

impl CopyHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files copied so far.
    pub fn copied(&self) -> u64 {
        self.copied
    }

    /// Number of destination entries removed so far.
    pub fn removed(&self) -> u64 {
        self.removed
    }

    fn copy(&mut self, source: &Path, target: &Path) -> io::Result<()> {
        let metadata = match fs::symlink_metadata(source) {
            Ok(metadata) => metadata,
            // Gone again; the matching delete event follows
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        if metadata.file_type().is_symlink() {
            return self.link(source, target);
        }

        if metadata.is_dir() {
            fs::create_dir_all(target)?;
            return Ok(());
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, target)?;
        self.copied += 1;
        crate::debug_event!("copy", "copied", "{} -> {}", source.display(), target.display());
        Ok(())
    }

    #[cfg(unix)]
    fn link(&mut self, source: &Path, target: &Path) -> io::Result<()> {
        let link_target = match fs::read_link(source) {
            Ok(link_target) => link_target,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        clear(target)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        std::os::unix::fs::symlink(&link_target, target)?;
        self.copied += 1;
        crate::debug_event!(
            "copy",
            "linked",
            "{} -> {}",
            target.display(),
            link_target.display()
        );
        Ok(())
    }

    #[cfg(not(unix))]
    fn link(&mut self, source: &Path, _target: &Path) -> io::Result<()> {
        crate::debug_event!("copy", "symlink skipped", "{}", source.display());
        Ok(())
    }

    fn remove(&mut self, target: &Path) -> io::Result<()> {
        let metadata = match fs::symlink_metadata(target) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        if metadata.is_dir() {
            fs::remove_dir_all(target)?;
        } else {
            fs::remove_file(target)?;
        }
        self.removed += 1;
        crate::debug_event!("copy", "removed", "{}", target.display());
        Ok(())
    }
}

/// Remove whatever sits at `target` without following links.
#[cfg(unix)]
fn clear(target: &Path) -> io::Result<()> {
    match fs::symlink_metadata(target) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(target),
        Ok(_) => fs::remove_file(target),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

impl ChangeHandler for CopyHandler {
    fn name(&self) -> &str {
        "copy"
    }

    fn handle(
        &mut self,
        _handle: WatchHandle,
        event: &ChangeEvent,
        config: &WatchConfig,
    ) -> Result<(), WatchError> {
        let source = event.path();
        let target = config
            .mirror_path(&source)
            .ok_or_else(|| WatchError::OutsideSource {
                path: source.clone(),
                source_root: config.source.clone(),
            })?;

        let result = match event.kind {
            ChangeKind::Created | ChangeKind::Modified => self.copy(&source, &target),
            ChangeKind::Deleted => self.remove(&target),
        };

        result.map_err(|e| WatchError::HandlerFailed {
            handler: self.name().to_string(),
            path: source,
            reason: e.to_string(),
        })
    }
}
