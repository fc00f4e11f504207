//! Wall-time anchored playhead driver.
//!
//! While running, every tick computes `base + (now - started_at - correction)`
//! from the anchor taken at start. Ticks never accumulate deltas, so a late
//! or missed tick cannot compound drift. An explicit seek bumps the store's
//! playhead epoch; the next tick sees the mismatch, discards its write and
//! re-anchors at the seek target.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};
use vodon_core::RationalTime;
use vodon_timeline::SharedTimeline;

use crate::config::PlaybackConfig;

#[derive(Debug, Clone, Copy)]
struct ClockAnchor {
    started_at: Instant,
    base: RationalTime,
    epoch: u64,
}

impl ClockAnchor {
    fn capture(store: &SharedTimeline) -> Self {
        let store = store.read();
        Self {
            started_at: Instant::now(),
            base: store.current_time(),
            epoch: store.playhead_epoch(),
        }
    }
}

/// Advance the playhead from the anchor. Returns the written time, or `None`
/// when a seek superseded the anchor (which is then moved to the seek target).
fn advance(
    store: &SharedTimeline,
    anchor: &Mutex<Option<ClockAnchor>>,
    correction: f64,
) -> Option<RationalTime> {
    let mut slot = anchor.lock();
    let current = slot.as_mut()?;
    let now = Instant::now();
    let mut store = store.write();

    if store.playhead_epoch() != current.epoch {
        trace!(time = %store.current_time(), "Seek observed, re-anchoring clock");
        *current = ClockAnchor {
            started_at: now,
            base: store.current_time(),
            epoch: store.playhead_epoch(),
        };
        return None;
    }

    let elapsed = (now - current.started_at).as_secs_f64();
    let time = current.base + RationalTime::from_seconds_f64((elapsed - correction).max(0.0));
    store.advance_playhead(current.epoch, time).then_some(time)
}

/// The single authority for global time while playing.
pub struct PlaybackClock {
    store: SharedTimeline,
    config: PlaybackConfig,
    anchor: Arc<Mutex<Option<ClockAnchor>>>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackClock {
    /// Create a stopped clock over `store`.
    pub fn new(store: SharedTimeline, config: PlaybackConfig) -> Self {
        Self {
            store,
            config,
            anchor: Arc::new(Mutex::new(None)),
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Anchor at the current playhead and start ticking. Calling this while
    /// running keeps the existing anchor. Must be called inside a tokio
    /// runtime.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let anchor = ClockAnchor::capture(&self.store);
        debug!(base = %anchor.base, "Playback clock started");
        *self.anchor.lock() = Some(anchor);

        let period = self.config.tick_interval();
        let correction = self.config.latency_correction();
        let store = self.store.clone();
        let slot = Arc::clone(&self.anchor);

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(anchor.started_at + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                advance(&store, &slot, correction);
            }
        }));
    }

    /// Stop ticking after one final advance up to now. No-op when stopped.
    pub fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let last = advance(&self.store, &self.anchor, self.config.latency_correction());
        task.abort();
        *self.anchor.lock() = None;
        debug!(time = ?last, "Playback clock stopped");
    }

    /// Follow the store's play flag.
    pub fn sync(&mut self) {
        let playing = self.store.read().playing();
        if playing {
            self.start();
        } else {
            self.stop();
        }
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
