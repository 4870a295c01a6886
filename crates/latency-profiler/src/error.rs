use chrono::{DateTime, Utc};
use plugin_registry::{ActivationSnapshot, RegistryError};
use std::path::PathBuf;
use thiserror::Error;

/// A write to the live activation set that did not take effect.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("registry reports {actual} active after writing {expected}")]
    Mismatch {
        expected: ActivationSnapshot,
        actual: ActivationSnapshot,
    },
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("snapshot journal {} already exists", path.display())]
    Exists { path: PathBuf },

    #[error("snapshot journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot journal is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("a profiling run is already in progress (pid {pid})")]
    RunInProgress { pid: u32 },

    #[error("a profiling run started at {started_at} by pid {pid} never finished; recover before profiling again")]
    UncleanShutdown { started_at: DateTime<Utc>, pid: u32 },

    #[error("could not read plugin state: {0}")]
    Registry(#[source] RegistryError),

    #[error("failed to restore plugin activation to {snapshot}, re-check plugin activation manually: {source}")]
    Restore {
        snapshot: ActivationSnapshot,
        #[source]
        source: ActivationError,
    },

    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl ProfileError {
    /// True when the live activation set may no longer match the snapshot.
    #[inline]
    pub fn leaves_state_inconsistent(&self) -> bool {
        matches!(self, ProfileError::Restore { .. })
    }
}
