//! Error types for the watch registry and loop.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::WatchHandle;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("No source/destination pairs configured")]
    NoConfigs,

    #[error("Cannot read source tree {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Watch handle {0} is not registered")]
    UnknownHandle(WatchHandle),

    #[error("{path} is outside source {source_root}")]
    OutsideSource { path: PathBuf, source_root: PathBuf },

    #[error("Handler '{handler}' failed for {path}: {reason}")]
    HandlerFailed {
        handler: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Watcher already started")]
    AlreadyStarted,

    #[error("Failed to spawn watch worker: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Watch worker panicked")]
    WorkerPanicked,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
