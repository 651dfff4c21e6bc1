//! OS notification backend behind the registry.

use std::path::Path;

use crossbeam_channel::Sender;
use notify::{Event, RecursiveMode, Watcher};

use super::WatchError;

/// Installs and removes single-directory (non-recursive) watches.
///
/// The registry owns one backend and is its only caller.
pub trait WatchBackend: Send {
    /// Start receiving notifications for the immediate contents of `dir`.
    fn watch(&mut self, dir: &Path) -> Result<(), WatchError>;

    /// Stop receiving notifications for `dir`.
    fn unwatch(&mut self, dir: &Path) -> Result<(), WatchError>;
}

/// Backend built on `notify::RecommendedWatcher`.
///
/// Raw events are forwarded unchanged into the channel given at creation.
pub struct NotifyBackend {
    watcher: notify::RecommendedWatcher,
}

impl NotifyBackend {
    pub fn new(events: Sender<notify::Result<Event>>) -> Result<Self, WatchError> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the loop has shut down
            let _ = events.send(res);
        })?;

        Ok(Self { watcher })
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn unwatch(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.watcher
            .unwatch(dir)
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })
    }
}
