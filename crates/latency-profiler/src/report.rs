use crate::classification::Classification;
use crate::histogram::Histogram;
use crate::metrics::LatencyMetrics;
use crate::trial::{TrialOutcome, TrialResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
    pub std_dev_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
}

impl LatencySummary {
    /// `None` when no trial produced a measurement.
    pub fn from_trials(trials: &[TrialResult]) -> Option<Self> {
        let mut metrics = LatencyMetrics::new();
        let mut histogram = Histogram::new().ok()?;
        for ms in trials.iter().filter_map(|t| t.outcome.measured_ms()) {
            metrics.record(ms);
            histogram.record_ms(ms);
        }
        if metrics.count() == 0 {
            return None;
        }
        Some(Self {
            min_ms: metrics.min(),
            mean_ms: metrics.mean(),
            max_ms: metrics.max(),
            std_dev_ms: metrics.std_dev(),
            p50_ms: histogram.percentile_ms(50.0),
            p95_ms: histogram.percentile_ms(95.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub plugins: usize,
    pub fast: usize,
    pub moderate: usize,
    pub slow: usize,
    pub failed: usize,
    pub skipped: usize,
    pub latency: Option<LatencySummary>,
}

impl ProfileSummary {
    pub fn from_trials(trials: &[TrialResult]) -> Self {
        let mut summary = Self {
            plugins: trials.len(),
            latency: LatencySummary::from_trials(trials),
            ..Self::default()
        };
        for trial in trials {
            match (&trial.outcome, trial.classification()) {
                (_, Some(Classification::Fast)) => summary.fast += 1,
                (_, Some(Classification::Moderate)) => summary.moderate += 1,
                (_, Some(Classification::Slow)) => summary.slow += 1,
                (TrialOutcome::Skipped { .. }, None) => summary.skipped += 1,
                (_, None) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Everything one profiling run produced. `trials` keeps test order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub homepage: String,
    pub baseline: Option<TrialOutcome>,
    pub trials: Vec<TrialResult>,
    pub summary: ProfileSummary,
}

impl ProfileReport {
    pub fn new(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        homepage: String,
        baseline: Option<TrialOutcome>,
        trials: Vec<TrialResult>,
    ) -> Self {
        let summary = ProfileSummary::from_trials(&trials);
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            homepage,
            baseline,
            trials,
            summary,
        }
    }

    /// Load time the plugin adds on top of a bare site, when both the
    /// baseline and the trial were measured.
    pub fn overhead_ms(&self, trial: &TrialResult) -> Option<f64> {
        let baseline = self.baseline.as_ref()?.measured_ms()?;
        Some(trial.outcome.measured_ms()? - baseline)
    }

    /// Trials ordered slowest first, failures on top.
    pub fn slowest_first(&self) -> Vec<&TrialResult> {
        let mut trials: Vec<&TrialResult> = self.trials.iter().collect();
        trials.sort_by(|a, b| b.load_time_ms().total_cmp(&a.load_time_ms()));
        trials
    }
}
