use serde::{Deserialize, Serialize};
use std::fmt;

/// Load times strictly above this are slow.
pub const SLOW_THRESHOLD_MS: f64 = 100.0;
/// Load times strictly above this (and not slow) are moderate.
pub const MODERATE_THRESHOLD_MS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Fast,
    Moderate,
    Slow,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Fast => "fast",
            Classification::Moderate => "moderate",
            Classification::Slow => "slow",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[inline]
pub fn classify(load_time_ms: f64) -> Classification {
    if load_time_ms > SLOW_THRESHOLD_MS {
        Classification::Slow
    } else if load_time_ms > MODERATE_THRESHOLD_MS {
        Classification::Moderate
    } else {
        Classification::Fast
    }
}
