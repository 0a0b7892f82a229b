//! Advisory lock serializing operations on one artifact path set.
//!
//! Two processes pointed at the same wrapped-key path take the same lock
//! file, so a `generate-keys` can never interleave with an `encrypt` that is
//! halfway through reading the old keys.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

/// Exclusive lock on a path set; released on drop.
#[derive(Debug)]
pub struct PathSetLock {
    file: File,
    path: PathBuf,
}

impl PathSetLock {
    /// Block until the lock at `path` is held.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;

        file.lock()?;
        debug!(path = %path.display(), "Acquired path-set lock");

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PathSetLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(path = %self.path.display(), error = %e, "Failed to release path-set lock");
        }
    }
}
