use crate::trial::{TrialOutcome, TrialResult};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};

/// Running min/max/mean/variance over measured load times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyMetrics {
    count: u64,
    sum_ms: f64,
    min_ms: f64,
    max_ms: f64,
    sum_squared_ms: f64,
}

impl LatencyMetrics {
    #[inline]
    pub fn new() -> Self {
        Self {
            count: 0,
            sum_ms: 0.0,
            min_ms: f64::MAX,
            max_ms: 0.0,
            sum_squared_ms: 0.0,
        }
    }

    /// Non-finite values (the failure sentinel) are not measurements.
    #[inline]
    pub fn record(&mut self, load_time_ms: f64) {
        if !load_time_ms.is_finite() {
            return;
        }
        self.count += 1;
        self.sum_ms += load_time_ms;
        self.min_ms = self.min_ms.min(load_time_ms);
        self.max_ms = self.max_ms.max(load_time_ms);
        self.sum_squared_ms += load_time_ms * load_time_ms;
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min_ms
        }
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max_ms
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_ms / self.count as f64
        }
    }

    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count <= 1 {
            0.0
        } else {
            let mean = self.mean();
            (self.sum_squared_ms / self.count as f64 - mean * mean).max(0.0)
        }
    }

    #[inline]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl Default for LatencyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit counters and the load-time histogram for one finished trial.
pub fn record_trial(result: &TrialResult) {
    let outcome = match &result.outcome {
        TrialOutcome::Loaded { load_time_ms, .. } => {
            histogram!("profiler_trial_load_time_ms").record(*load_time_ms);
            "loaded"
        }
        TrialOutcome::Failed { .. } => "failed",
        TrialOutcome::Skipped { .. } => "skipped",
    };
    counter!("profiler_trials_total", "outcome" => outcome).increment(1);
    if !result.outcome.is_loaded() {
        counter!("profiler_trial_failures_total").increment(1);
    }
}
