//! Playback timing configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timer settings for the clock and the stepper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Clock tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Seconds subtracted from elapsed wall time to absorb timer latency.
    pub latency_correction: f64,
    /// Hold-to-repeat period in milliseconds.
    pub hold_repeat_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            latency_correction: 0.06,
            hold_repeat_interval_ms: 100,
        }
    }
}

impl PlaybackConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn hold_repeat_interval(&self) -> Duration {
        Duration::from_millis(self.hold_repeat_interval_ms.max(1))
    }

    /// Correction in seconds, never negative.
    pub fn latency_correction(&self) -> f64 {
        if self.latency_correction.is_finite() {
            self.latency_correction.max(0.0)
        } else {
            0.0
        }
    }
}
