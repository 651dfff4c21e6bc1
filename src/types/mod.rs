use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

/// Opaque identity of one installed directory watch.
///
/// Handles are allocated by the registry from a monotonic counter and are
/// never reused, even after the directory they watched is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(NonZeroU64);

impl WatchHandle {
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn value(&self) -> u64 {
        self.0.get()
    }
}

impl From<NonZeroU64> for WatchHandle {
    fn from(value: NonZeroU64) -> Self {
        Self(value)
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One mirroring relationship: changes below `source` are reproduced below
/// `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl WatchConfig {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Make both paths absolute and canonicalize the source.
    ///
    /// Fails when the source does not exist or is not a directory. The
    /// destination may not exist yet.
    pub fn resolve(&self) -> io::Result<Self> {
        let source = std::fs::canonicalize(&self.source)?;
        if !source.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", source.display()),
            ));
        }
        let destination = std::path::absolute(&self.destination)?;

        Ok(Self {
            source,
            destination,
        })
    }

    /// Map a path under `source` to its mirror under `destination`.
    pub fn mirror_path(&self, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(&self.source).ok()?;
        if relative.as_os_str().is_empty() {
            return Some(self.destination.clone());
        }
        Some(self.destination.join(relative))
    }
}

impl fmt::Display for WatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.source.display(),
            self.destination.display()
        )
    }
}
