use crate::classification::{classify, Classification};
use homepage_probe::FetchError;
use plugin_registry::PluginDescriptor;
use serde::{Deserialize, Serialize};

/// Load time reported for a trial that produced no measurement.
pub const FAILURE_SENTINEL_MS: f64 = f64::INFINITY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrialOutcome {
    /// The homepage answered with a 2xx or 3xx status.
    Loaded { load_time_ms: f64, status: u16 },
    /// The request timed out, could not connect, or got an error status.
    Failed { elapsed_ms: f64, error: FetchError },
    /// The registry refused to isolate the plugin; nothing was fetched.
    Skipped { error: String },
}

impl TrialOutcome {
    #[inline]
    pub fn load_time_ms(&self) -> f64 {
        match self {
            TrialOutcome::Loaded { load_time_ms, .. } => *load_time_ms,
            _ => FAILURE_SENTINEL_MS,
        }
    }

    #[inline]
    pub fn measured_ms(&self) -> Option<f64> {
        match self {
            TrialOutcome::Loaded { load_time_ms, .. } => Some(*load_time_ms),
            _ => None,
        }
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(self, TrialOutcome::Loaded { .. })
    }

    /// `None` for failed and skipped trials: they are not "slow", they are broken.
    #[inline]
    pub fn classification(&self) -> Option<Classification> {
        self.measured_ms().map(classify)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrialOutcome::Loaded { load_time_ms, .. } => classify(*load_time_ms).as_str(),
            TrialOutcome::Failed { .. } => "failed",
            TrialOutcome::Skipped { .. } => "skipped",
        }
    }

    pub fn error(&self) -> Option<String> {
        match self {
            TrialOutcome::Loaded { .. } => None,
            TrialOutcome::Failed { error, .. } => Some(error.to_string()),
            TrialOutcome::Skipped { error } => Some(error.clone()),
        }
    }
}

/// One isolated measurement of one plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub plugin: PluginDescriptor,
    pub outcome: TrialOutcome,
}

impl TrialResult {
    #[inline]
    pub fn new(plugin: PluginDescriptor, outcome: TrialOutcome) -> Self {
        Self { plugin, outcome }
    }

    #[inline]
    pub fn load_time_ms(&self) -> f64 {
        self.outcome.load_time_ms()
    }

    #[inline]
    pub fn classification(&self) -> Option<Classification> {
        self.outcome.classification()
    }
}
