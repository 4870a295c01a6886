use hdrhistogram::{CreationError, Histogram as HdrHistogram};

/// Highest trackable load time: one hour, in microseconds.
const MAX_TRACKABLE_US: u64 = 3_600_000_000;

/// Load-time histogram with microsecond resolution, queried in milliseconds.
#[derive(Debug, Clone)]
pub struct Histogram {
    inner: HdrHistogram<u64>,
}

impl Histogram {
    pub fn new() -> Result<Self, CreationError> {
        Ok(Self {
            inner: HdrHistogram::<u64>::new_with_bounds(1, MAX_TRACKABLE_US, 3)?,
        })
    }

    /// Non-finite and negative values are ignored.
    #[inline]
    pub fn record_ms(&mut self, load_time_ms: f64) {
        if load_time_ms.is_finite() && load_time_ms >= 0.0 {
            let us = (load_time_ms * 1000.0).round() as u64;
            self.inner.saturating_record(us.max(1));
        }
    }

    #[inline]
    pub fn percentile_ms(&self, percentile: f64) -> f64 {
        self.inner.value_at_percentile(percentile) as f64 / 1000.0
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
