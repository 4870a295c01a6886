//! Durable copy of the activation snapshot.
//!
//! The journal is written before the first activation change and removed
//! once the snapshot has been restored. A journal found at startup means a
//! run died mid-trial and left plugins in an isolated state.

use crate::error::JournalError;
use crate::guard::run_is_live;
use chrono::{DateTime, Utc};
use plugin_registry::ActivationSnapshot;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub run_id: Uuid,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub snapshot: ActivationSnapshot,
}

impl JournalEntry {
    pub fn new(run_id: Uuid, snapshot: ActivationSnapshot) -> Self {
        Self {
            run_id,
            pid: std::process::id(),
            started_at: Utc::now(),
            snapshot,
        }
    }

    /// Whether the run that wrote this entry is still going. For entries
    /// written by this process that means the run itself, not the pid.
    pub fn owner_alive(&self) -> bool {
        if self.pid == std::process::id() {
            return run_is_live(&self.run_id);
        }
        process_alive(self.pid)
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotJournal {
    path: PathBuf,
}

impl SnapshotJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Option<JournalEntry>, JournalError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create the journal; fails with [`JournalError::Exists`] if another
    /// run already holds it.
    pub fn begin(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(JournalError::Exists {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&serde_json::to_vec_pretty(entry)?)?;
        file.sync_all()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), JournalError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // signal 0 performs the permission and existence checks only
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    false
}
