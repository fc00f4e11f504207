//! Reconnect backoff.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff between attach attempts.
///
/// Attempt `n` (zero-based) waits `initial * factor^n` before the next try,
/// capped at `max_delay`. After `max_attempts` tries the caller gives up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub initial_delay_ms: u64,
    pub factor: u32,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            factor: 2,
            max_delay_ms: 30_000,
            max_attempts: 8,
        }
    }
}

impl BackoffPolicy {
    /// Wait after the failed attempt `attempt`, or `None` if it was the last.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }
        let scale = u64::from(self.factor.max(1)).saturating_pow(attempt);
        let millis = self
            .initial_delay_ms
            .saturating_mul(scale)
            .min(self.max_delay_ms);
        Some(Duration::from_millis(millis))
    }

    /// All waits in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..).map_while(move |attempt| self.delay_after(attempt))
    }
}
