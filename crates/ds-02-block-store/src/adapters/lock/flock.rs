//! # File Lock Implementation
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::domain::errors::LockError;

/// Exclusive lock on one store's files.
///
/// Held for the lifetime of a `FileRecordStore`, released on drop.
pub struct DatabaseLock {
    /// Kept open to maintain the lock
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DatabaseLock {
    /// Acquire `<dir>/<name>.lock` without blocking.
    ///
    /// # Errors
    ///
    /// `LockError::AlreadyLocked` if another handle holds the lock, including
    /// one opened earlier by this same process.
    pub fn acquire(dir: &Path, name: &str) -> Result<Self, LockError> {
        let path = dir.join(format!("{name}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::CreateFailed {
                path: path.clone(),
                source,
            })?;

        if file.try_lock_exclusive().is_err() {
            return Err(LockError::AlreadyLocked { path });
        }

        let pid = std::process::id();
        let mut locked = file;
        if let Err(source) = write_pid(&mut locked, pid) {
            let _ = locked.unlock();
            return Err(LockError::CreateFailed { path, source });
        }

        tracing::debug!("[ds-02] Acquired store lock {}", path.display());
        Ok(Self {
            file: locked,
            path,
            pid,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_pid(file: &mut File, pid: u32) -> io::Result<()> {
    file.set_len(0)?;
    writeln!(file, "{}", pid)?;
    file.sync_all()
}

impl Drop for DatabaseLock {
    fn drop(&mut self) {
        // Remove first so a waiting opener never locks a file about to vanish.
        let _ = std::fs::remove_file(&self.path);
        let _ = self.file.unlock();
    }
}
