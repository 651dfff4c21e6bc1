//! Change events as seen by the watch loop.
//!
//! The OS backend reports full paths; a [`ChangeEvent`] splits each path into
//! the directory it was reported against and the entry name inside it, which
//! is how the registry routes it back to a watch handle.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

/// What happened to a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Deleted,
    Modified,
}

/// A single change reported against a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub watched_directory: PathBuf,
    pub name: OsString,
}

impl ChangeEvent {
    pub fn new(
        kind: ChangeKind,
        watched_directory: impl Into<PathBuf>,
        name: impl Into<OsString>,
    ) -> Self {
        Self {
            kind,
            watched_directory: watched_directory.into(),
            name: name.into(),
        }
    }

    /// Build an event from a full path. `None` for paths with no parent or
    /// no final component (e.g. `/`).
    pub fn for_path(kind: ChangeKind, path: &Path) -> Option<Self> {
        let parent = path.parent()?;
        let name = path.file_name()?;
        Some(Self::new(kind, parent, name))
    }

    /// Full path of the affected entry.
    pub fn path(&self) -> PathBuf {
        self.watched_directory.join(&self.name)
    }

    /// Convert a notify event into zero or more change events, one per path.
    pub fn from_notify(event: &notify::Event) -> Vec<ChangeEvent> {
        let kind = match event.kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Remove(_) => Some(ChangeKind::Deleted),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(ChangeKind::Deleted),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(ChangeKind::Created),
            // Reported alongside separate From/To halves
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => return Vec::new(),
            EventKind::Modify(ModifyKind::Name(_)) => None,
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
        };

        event
            .paths
            .iter()
            .filter_map(|path| {
                // Ambiguous renames: decide by what is on disk now
                let kind = kind.unwrap_or_else(|| {
                    if path.exists() {
                        ChangeKind::Created
                    } else {
                        ChangeKind::Deleted
                    }
                });
                ChangeEvent::for_path(kind, path)
            })
            .collect()
    }
}
