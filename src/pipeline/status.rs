//! `run-status.json`: who holds the run lock and what it is doing.
//!
//! Only the lock holder writes it. Each update replaces the whole file through
//! a rename so readers never see a partial document. Readers never touch the
//! run lock: whether a run is in progress is answered from the recorded pid.

use crate::constants::STATUS_FILE_NAME;
use crate::error::Result;
use crate::pipeline::storage::versioned::write_atomic;
use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Starting,
    Fetching,
    Extracting,
    Finished,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Finished | RunPhase::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub phase: RunPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunStatus {
    pub fn read(root: &Path) -> Result<Option<Self>> {
        match fs::read(status_path(root)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the recorded run is still going: its phase is not terminal and
    /// its process is alive. A run killed mid-way leaves a stale phase behind
    /// and reports as not running.
    pub fn is_running(&self) -> bool {
        !self.phase.is_terminal() && process_alive(self.pid)
    }
}

// Signal 0 only checks that the process exists.
fn process_alive(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

pub fn status_path(root: &Path) -> PathBuf {
    root.join(STATUS_FILE_NAME)
}

/// Writes status updates for the current process.
pub struct StatusFile {
    path: PathBuf,
    status: RunStatus,
}

impl StatusFile {
    pub fn start(root: &Path) -> Result<Self> {
        let now = Utc::now();
        let mut file = Self {
            path: status_path(root),
            status: RunStatus {
                pid: std::process::id(),
                started_at: now,
                updated_at: now,
                phase: RunPhase::Starting,
                error: None,
            },
        };
        file.flush()?;
        Ok(file)
    }

    pub fn set_phase(&mut self, phase: RunPhase) -> Result<()> {
        self.status.phase = phase;
        self.status.updated_at = Utc::now();
        self.flush()
    }

    pub fn fail(&mut self, error: &str) -> Result<()> {
        self.status.error = Some(error.to_string());
        self.set_phase(RunPhase::Failed)
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    fn flush(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.status)?;
        write_atomic(&self.path, &json)
    }
}
