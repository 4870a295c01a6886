pub mod classification;
pub mod error;
pub mod guard;
pub mod histogram;
pub mod journal;
pub mod metrics;
pub mod profiler;
pub mod report;
pub mod trial;

pub use classification::{classify, Classification, MODERATE_THRESHOLD_MS, SLOW_THRESHOLD_MS};
pub use error::{ActivationError, JournalError, ProfileError};
pub use guard::{ActivationGuard, RunKey, RunLock};
pub use histogram::Histogram;
pub use journal::{JournalEntry, SnapshotJournal};
pub use metrics::LatencyMetrics;
pub use profiler::{Profiler, ProfilerSettings, DEFAULT_TRIAL_TIMEOUT};
pub use report::{LatencySummary, ProfileReport, ProfileSummary};
pub use trial::{TrialOutcome, TrialResult, FAILURE_SENTINEL_MS};

pub use homepage_probe;
pub use plugin_registry;

pub type Result<T> = std::result::Result<T, ProfileError>;
