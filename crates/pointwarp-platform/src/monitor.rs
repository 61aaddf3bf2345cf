//! Modification-time polling for a bounded set of files.
//!
//! Used for live configuration reload. Polling keeps the monitor independent
//! of any filesystem notification subsystem; the owner calls
//! [`FileMonitor::poll_changes`] on its own cadence.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::error::PlatformError;

/// Maximum number of watched paths.
pub const MONITOR_CAPACITY: usize = 32;

/// Longest accepted path, in bytes.
pub const MAX_PATH_LEN: usize = 4096;

#[derive(Debug, Clone)]
struct MonitoredFile {
    path: PathBuf,
    /// `None` while the file does not exist.
    mtime: Option<SystemTime>,
}

/// Append-only set of watched paths with their last seen mtimes.
#[derive(Debug)]
pub struct FileMonitor {
    files: Vec<MonitoredFile>,
    capacity: usize,
}

impl Default for FileMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl FileMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MONITOR_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            files: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }

    /// Register `path` with its current modification time.
    ///
    /// A path that does not exist yet is accepted; its creation is reported
    /// as a change. Registering past capacity fails with
    /// [`PlatformError::MonitorFull`].
    pub fn watch(&mut self, path: impl Into<PathBuf>) -> Result<(), PlatformError> {
        let path = path.into();
        let len = path.as_os_str().len();
        if len > MAX_PATH_LEN {
            return Err(PlatformError::PathTooLong {
                path,
                len,
                max: MAX_PATH_LEN,
            });
        }
        if self.files.len() >= self.capacity {
            return Err(PlatformError::MonitorFull {
                capacity: self.capacity,
            });
        }
        let mtime = modified(&path)?;
        info!(path = %path.display(), exists = mtime.is_some(), "watching file");
        self.files.push(MonitoredFile { path, mtime });
        Ok(())
    }

    /// Re-read every modification time and return the paths that changed
    /// since the previous poll. Appearing and disappearing count as changes.
    ///
    /// An entry that cannot be read keeps its stored time and is retried on
    /// the next poll; it does not hide changes to the other entries.
    pub fn poll_changes(&mut self) -> Vec<PathBuf> {
        let mut changed = Vec::new();
        for file in &mut self.files {
            let mtime = match modified(&file.path) {
                Ok(mtime) => mtime,
                Err(e) => {
                    warn!(
                        path = %file.path.display(),
                        error = %e,
                        "cannot read modification time"
                    );
                    continue;
                }
            };
            if mtime != file.mtime {
                debug!(path = %file.path.display(), "file changed");
                file.mtime = mtime;
                changed.push(file.path.clone());
            }
        }
        changed
    }
}

fn modified(path: &Path) -> Result<Option<SystemTime>, PlatformError> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.modified()?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
