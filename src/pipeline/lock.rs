//! Whole-run mutual exclusion over a storage directory.
//!
//! The lock is a `flock(2)` exclusive lock on `scraper.pid` in the storage
//! root. The kernel drops it when the descriptor is closed, which covers both
//! an explicit release and process death. The file's content is never used.

use crate::constants::LOCK_FILE_NAME;
use crate::error::{Result, ScraperError};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct RunLock {
    path: PathBuf,
    _flock: Flock<File>,
}

impl fmt::Debug for RunLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLock").field("path", &self.path).finish()
    }
}

impl RunLock {
    /// Take the lock on `dir`, failing immediately with `LockHeld` if another
    /// handle has it. Never waits.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = lock_path(dir)?;
        let file = open_lock_file(&path)?;

        debug!("Acquiring lock: {}", path.display());
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => Ok(Self { path, _flock: flock }),
            Err((_, Errno::EWOULDBLOCK)) => {
                crate::observability::metrics::lock_held();
                Err(ScraperError::LockHeld { path })
            }
            Err((_, errno)) => Err(ScraperError::Io(errno.into())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock now rather than at drop.
    pub fn release(self) {
        debug!("Releasing lock: {}", self.path.display());
    }
}

fn lock_path(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(ScraperError::MissingStorageRoot {
            path: dir.to_path_buf(),
        });
    }
    Ok(dir.join(LOCK_FILE_NAME))
}

fn open_lock_file(path: &Path) -> Result<File> {
    if !path.is_file() {
        debug!("Lock file {} not present. Creating.", path.display());
        OpenOptions::new().write(true).create(true).open(path)?;
    }
    Ok(File::open(path)?)
}
