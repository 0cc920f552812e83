//! Append-only file store with a "never shrink" acceptance rule.
//!
//! Before a tracked file is replaced, its current version is hard linked to a
//! sibling named `<stem>-<UTC timestamp>.<ext>`. The new content is written to
//! a temporary sibling and renamed over the live path, so the inode shared with
//! the backup is never written through.

use crate::error::{Result, ScraperError};
use chrono::{DateTime, Utc};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// UTC ISO 8601 with microseconds, e.g. `2020-05-01T14:03:22.123456`.
pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No previous version existed.
    Created,
    /// The previous version was preserved at `backup`.
    Replaced { backup: PathBuf },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VersionedStore;

impl VersionedStore {
    pub fn new() -> Self {
        Self
    }

    /// Save `data` to `path` unless the version already on disk is larger.
    pub fn save(&self, path: &Path, data: &[u8]) -> Result<SaveOutcome> {
        self.save_at(path, data, Utc::now())
    }

    /// Same as [`save`](Self::save) with an explicit backup timestamp.
    pub fn save_at(&self, path: &Path, data: &[u8], now: DateTime<Utc>) -> Result<SaveOutcome> {
        let existing = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            Ok(_) => {
                return Err(ScraperError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} exists and is not a regular file", path.display()),
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let outcome = match existing {
            // Sizes are comparable because every payload is UTF-8 by the time it gets here.
            Some(existing) if existing > data.len() as u64 => {
                crate::observability::metrics::store::rejected();
                warn!(
                    "{} is smaller than the cached version we have on disk ({} < {} bytes)",
                    path.display(),
                    data.len(),
                    existing
                );
                return Err(ScraperError::StaleOrSuspiciousWrite {
                    path: path.to_path_buf(),
                    existing,
                    candidate: data.len() as u64,
                });
            }
            Some(_) => {
                let backup = backup(path, now)?;
                write_atomic(path, data)?;
                SaveOutcome::Replaced { backup }
            }
            None => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                write_atomic(path, data)?;
                SaveOutcome::Created
            }
        };

        crate::observability::metrics::store::write();
        info!("Saved a new version of {}", path.display());
        Ok(outcome)
    }
}

/// Name of the backup for `path` taken at `now`: `dir/stem-<ts>.ext`.
pub fn backup_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default();
    let mut name = OsString::from(stem);
    name.push("-");
    name.push(now.format(BACKUP_TIME_FORMAT).to_string());
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// Preserve the current version of `path` under its timestamped name.
///
/// Uses a hard link and falls back to a copy on filesystems without them.
/// An existing backup with the same name is never replaced.
pub fn backup(path: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    let target = backup_path(path, now);
    link_or_copy(path, &target, |src, dst| fs::hard_link(src, dst))?;
    crate::observability::metrics::store::backup();
    debug!("Backed up {} to {}", path.display(), target.display());
    Ok(target)
}

fn link_or_copy<F>(path: &Path, target: &Path, link: F) -> Result<()>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    match link(path, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e.into()),
        Err(e) => {
            debug!(
                "hard link {} -> {} failed ({}), copying instead",
                path.display(),
                target.display(),
                e
            );
            if target.exists() {
                return Err(io::Error::from(io::ErrorKind::AlreadyExists).into());
            }
            fs::copy(path, target)?;
            Ok(())
        }
    }
}

/// Replace `path` with `data` through a temporary sibling and a rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = temp_sibling(path);
    let written = (|| -> io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
