use crate::error::{JournalError, ProfileError};
use crate::guard::{apply_activation, ActivationGuard, RunKey, RunLock};
use crate::journal::{JournalEntry, SnapshotJournal};
use crate::metrics::record_trial;
use crate::report::ProfileReport;
use crate::trial::{TrialOutcome, TrialResult};
use chrono::Utc;
use homepage_probe::{FetchError, HomepageFetcher};
use plugin_registry::{ActivationSnapshot, PluginRegistry};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Ceiling on a single homepage fetch.
pub const DEFAULT_TRIAL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ProfilerSettings {
    pub homepage: Url,
    pub timeout: Duration,
    /// Measure once with no plugins active before the per-plugin trials.
    pub baseline: bool,
    /// Restore a leftover journal instead of refusing to start.
    pub auto_recover: bool,
    /// Where the snapshot journal lives; `None` keeps the snapshot in
    /// memory only.
    pub journal_path: Option<PathBuf>,
}

impl ProfilerSettings {
    pub fn new(homepage: Url) -> Self {
        Self {
            homepage,
            timeout: DEFAULT_TRIAL_TIMEOUT,
            baseline: false,
            auto_recover: false,
            journal_path: None,
        }
    }
}

struct Session {
    run_id: Uuid,
    baseline: Option<TrialOutcome>,
    trials: Vec<TrialResult>,
}

/// Measures homepage load time with each installed plugin active on its own.
///
/// Trials run strictly one after another: the activation set and the
/// homepage are single shared resources, so overlapping trials would
/// measure each other.
pub struct Profiler<R, F> {
    registry: R,
    fetcher: F,
    settings: ProfilerSettings,
    journal: Option<SnapshotJournal>,
    run_key: RunKey,
}

impl<R: PluginRegistry, F: HomepageFetcher> Profiler<R, F> {
    pub fn new(registry: R, fetcher: F, settings: ProfilerSettings) -> Self {
        let journal = settings.journal_path.clone().map(SnapshotJournal::new);
        let run_key = match &settings.journal_path {
            Some(path) => RunKey::journal(path),
            None => RunKey::instance(),
        };
        Self {
            registry,
            fetcher,
            settings,
            journal,
            run_key,
        }
    }

    #[inline]
    pub fn settings(&self) -> &ProfilerSettings {
        &self.settings
    }

    /// One trial per installed plugin, in registry order.
    ///
    /// The activation set in effect before the call is in effect after it,
    /// on every path except a failed restore, which is the only error
    /// raised once trials have started.
    pub async fn run_profile(&self) -> Result<Vec<TrialResult>, ProfileError> {
        Ok(self.run_session(false).await?.trials)
    }

    /// [`run_profile`](Self::run_profile) plus the optional baseline trial
    /// and summary statistics.
    pub async fn run_report(&self) -> Result<ProfileReport, ProfileError> {
        let started_at = Utc::now();
        let session = self.run_session(self.settings.baseline).await?;
        Ok(ProfileReport::new(
            session.run_id,
            started_at,
            self.settings.homepage.to_string(),
            session.baseline,
            session.trials,
        ))
    }

    /// Put back the snapshot left behind by a run that never finished.
    ///
    /// Returns the restored snapshot, or `None` when there was nothing to
    /// recover.
    pub fn recover(&self) -> Result<Option<ActivationSnapshot>, ProfileError> {
        let _lock = RunLock::acquire(&self.run_key)?;
        self.recover_locked()
    }

    fn recover_locked(&self) -> Result<Option<ActivationSnapshot>, ProfileError> {
        let Some(journal) = &self.journal else {
            return Ok(None);
        };
        let Some(entry) = journal.read()? else {
            return Ok(None);
        };
        if entry.owner_alive() {
            return Err(ProfileError::RunInProgress { pid: entry.pid });
        }

        warn!(
            "Recovering activation snapshot from unfinished run {} started at {}",
            entry.run_id, entry.started_at
        );
        if let Err(source) = apply_activation(&self.registry, &entry.snapshot) {
            return Err(ProfileError::Restore {
                snapshot: entry.snapshot,
                source,
            });
        }
        journal.clear()?;
        info!("Restored plugin activation to {}", entry.snapshot);
        Ok(Some(entry.snapshot))
    }

    fn check_journal(&self) -> Result<(), ProfileError> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        let Some(entry) = journal.read()? else {
            return Ok(());
        };
        if entry.owner_alive() {
            return Err(ProfileError::RunInProgress { pid: entry.pid });
        }
        if !self.settings.auto_recover {
            return Err(ProfileError::UncleanShutdown {
                started_at: entry.started_at,
                pid: entry.pid,
            });
        }
        self.recover_locked()?;
        Ok(())
    }

    fn begin_journal(&self, entry: &JournalEntry) -> Result<(), ProfileError> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        match journal.begin(entry) {
            Ok(()) => Ok(()),
            Err(JournalError::Exists { .. }) => {
                let pid = journal.read()?.map_or(0, |e| e.pid);
                Err(ProfileError::RunInProgress { pid })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn run_session(&self, with_baseline: bool) -> Result<Session, ProfileError> {
        let lock = RunLock::acquire(&self.run_key)?;
        self.check_journal()?;

        let plugins = self
            .registry
            .list_installed_plugins()
            .map_err(ProfileError::Registry)?;
        let snapshot = self
            .registry
            .get_active_plugins()
            .map_err(ProfileError::Registry)?;

        let run_id = Uuid::new_v4();
        lock.started(run_id);
        self.begin_journal(&JournalEntry::new(run_id, snapshot.clone()))?;
        let guard = ActivationGuard::new(&self.registry, snapshot, self.journal.as_ref());

        info!(
            "Profiling {} plugins against {} (run {}, {} active before run)",
            plugins.len(),
            self.settings.homepage,
            run_id,
            guard.snapshot().len()
        );

        let baseline = if with_baseline {
            let outcome = self.trial(&ActivationSnapshot::empty()).await;
            info!("Baseline with no plugins active: {}", describe(&outcome));
            Some(outcome)
        } else {
            None
        };

        let mut trials = Vec::with_capacity(plugins.len());
        for plugin in plugins {
            let outcome = self.trial(&ActivationSnapshot::only(&plugin.slug)).await;
            match &outcome {
                TrialOutcome::Loaded { .. } => info!("{}: {}", plugin, describe(&outcome)),
                _ => warn!("{}: {}", plugin, describe(&outcome)),
            }
            let result = TrialResult::new(plugin, outcome);
            record_trial(&result);
            trials.push(result);
        }

        let restored = guard.restore()?;
        info!("Restored plugin activation to {}", restored);

        Ok(Session {
            run_id,
            baseline,
            trials,
        })
    }

    async fn trial(&self, isolated: &ActivationSnapshot) -> TrialOutcome {
        if let Err(e) = apply_activation(&self.registry, isolated) {
            return TrialOutcome::Skipped {
                error: e.to_string(),
            };
        }

        let timeout = self.settings.timeout;
        let start = Instant::now();
        let result = tokio::time::timeout(timeout, self.fetcher.fetch(&self.settings.homepage, timeout))
            .await
            .unwrap_or(Err(FetchError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }));
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(response) => {
                debug!(
                    "Fetcher reported {:.2}ms, trial measured {:.2}ms",
                    response.elapsed_ms, elapsed_ms
                );
                TrialOutcome::Loaded {
                    load_time_ms: elapsed_ms,
                    status: response.status,
                }
            }
            Err(error) => TrialOutcome::Failed { elapsed_ms, error },
        }
    }
}

fn describe(outcome: &TrialOutcome) -> String {
    match outcome {
        TrialOutcome::Loaded { load_time_ms, status } => {
            format!("{:.2}ms (HTTP {}, {})", load_time_ms, status, outcome.label())
        }
        TrialOutcome::Failed { error, .. } => format!("failed to load: {}", error),
        TrialOutcome::Skipped { error } => format!("skipped: {}", error),
    }
}
