use crate::error::{ActivationError, ProfileError};
use crate::journal::SnapshotJournal;
use parking_lot::Mutex;
use plugin_registry::{ActivationSnapshot, PluginRegistry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, warn};
use uuid::Uuid;

/// Runs in progress in this process, with the id of the run once its
/// journal entry is written.
static ACTIVE_RUNS: Mutex<BTreeMap<RunKey, Option<Uuid>>> = parking_lot::const_mutex(BTreeMap::new());

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

/// Write `target` and read it back.
pub fn apply_activation<R: PluginRegistry>(
    registry: &R,
    target: &ActivationSnapshot,
) -> Result<(), ActivationError> {
    registry.set_active_plugins(target)?;
    let actual = registry.get_active_plugins()?;
    if actual != *target {
        return Err(ActivationError::Mismatch {
            expected: target.clone(),
            actual,
        });
    }
    Ok(())
}

/// Holds the pre-run activation snapshot and puts it back when released.
///
/// [`ActivationGuard::restore`] is the normal exit and reports failure to
/// the caller. Any other exit (early return, panic inside a trial) restores
/// from `Drop`, where the best that can be done with an error is log it.
pub struct ActivationGuard<'a, R: PluginRegistry> {
    registry: &'a R,
    snapshot: ActivationSnapshot,
    journal: Option<&'a SnapshotJournal>,
    armed: bool,
}

impl<'a, R: PluginRegistry> ActivationGuard<'a, R> {
    pub fn new(
        registry: &'a R,
        snapshot: ActivationSnapshot,
        journal: Option<&'a SnapshotJournal>,
    ) -> Self {
        Self {
            registry,
            snapshot,
            journal,
            armed: true,
        }
    }

    #[inline]
    pub fn snapshot(&self) -> &ActivationSnapshot {
        &self.snapshot
    }

    pub fn restore(mut self) -> Result<ActivationSnapshot, ProfileError> {
        self.armed = false;
        let snapshot = std::mem::take(&mut self.snapshot);

        if let Err(source) = apply_activation(self.registry, &snapshot) {
            error!(
                "Could not restore plugin activation to {}: {}. Re-check plugin activation manually.",
                snapshot, source
            );
            return Err(ProfileError::Restore { snapshot, source });
        }
        if let Some(journal) = self.journal {
            if let Err(e) = journal.clear() {
                warn!("Restored activation but could not clear {}: {}", journal.path().display(), e);
            }
        }
        Ok(snapshot)
    }
}

impl<'a, R: PluginRegistry> Drop for ActivationGuard<'a, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Profiling run aborted, restoring plugin activation to {}", self.snapshot);
        match apply_activation(self.registry, &self.snapshot) {
            Ok(()) => {
                if let Some(journal) = self.journal {
                    if let Err(e) = journal.clear() {
                        warn!("Restored activation but could not clear {}: {}", journal.path().display(), e);
                    }
                }
            }
            Err(e) => error!(
                "Could not restore plugin activation to {}: {}. Re-check plugin activation manually.",
                self.snapshot, e
            ),
        }
    }
}

/// What a run excludes other runs from.
///
/// Profilers sharing a journal share the activation set it protects, so the
/// journal path is the key. A profiler without a journal only excludes
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunKey {
    Journal(PathBuf),
    Instance(u64),
}

impl RunKey {
    pub fn journal(path: &Path) -> Self {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        if let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) {
            if let Ok(parent) = std::fs::canonicalize(parent) {
                return RunKey::Journal(parent.join(name));
            }
        }
        RunKey::Journal(absolute)
    }

    pub fn instance() -> Self {
        RunKey::Instance(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Process-wide single-run lock for one [`RunKey`], released on drop.
pub struct RunLock {
    key: RunKey,
}

impl RunLock {
    pub fn acquire(key: &RunKey) -> Result<Self, ProfileError> {
        let mut runs = ACTIVE_RUNS.lock();
        if runs.contains_key(key) {
            return Err(ProfileError::RunInProgress {
                pid: std::process::id(),
            });
        }
        runs.insert(key.clone(), None);
        Ok(Self { key: key.clone() })
    }

    /// Record the id of the run holding this lock.
    pub fn started(&self, run_id: Uuid) {
        if let Some(slot) = ACTIVE_RUNS.lock().get_mut(&self.key) {
            *slot = Some(run_id);
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        ACTIVE_RUNS.lock().remove(&self.key);
    }
}

/// Whether a run with this id is in progress in this process.
pub fn run_is_live(run_id: &Uuid) -> bool {
    ACTIVE_RUNS.lock().values().any(|id| id.as_ref() == Some(run_id))
}
