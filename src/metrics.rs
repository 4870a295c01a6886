//! Run-level metrics

use latency_profiler::{ProfileError, ProfileReport};
use metrics::{counter, gauge, histogram};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct RunMetrics;

impl RunMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_report(&self, report: &ProfileReport) {
        counter!("profiler_runs_total").increment(1);

        let summary = &report.summary;
        gauge!("profiler_last_run_plugins").set(summary.plugins as f64);
        gauge!("profiler_last_run_slow_plugins").set(summary.slow as f64);
        gauge!("profiler_last_run_failed_plugins").set((summary.failed + summary.skipped) as f64);
    }

    pub fn record_failure(&self, error: &ProfileError) {
        counter!("profiler_run_failures_total", "kind" => failure_kind(error)).increment(1);
    }
}

fn failure_kind(error: &ProfileError) -> &'static str {
    match error {
        ProfileError::RunInProgress { .. } => "run_in_progress",
        ProfileError::UncleanShutdown { .. } => "unclean_shutdown",
        ProfileError::Registry(_) => "registry",
        ProfileError::Restore { .. } => "restore",
        ProfileError::Journal(_) => "journal",
    }
}

/// Wall-clock timer for a whole profiling run.
pub struct RunTimer {
    start: Instant,
}

impl RunTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Records the run duration and returns it in milliseconds.
    pub fn finish(self) -> f64 {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!("profiler_run_duration_ms").record(elapsed_ms);
        elapsed_ms
    }
}
