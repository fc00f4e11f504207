//! Frame stepping and jump hotkeys.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};
use vodon_core::RationalTime;
use vodon_timeline::{Settings, SharedTimeline};

/// Direction of a step or jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Forward,
    Backward,
}

impl StepDirection {
    fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Move the playhead by one frame of the active video. The playhead is read
/// at the moment of the step. Returns the new time, or `None` without an
/// active video with a known frame rate.
pub fn step_frame(store: &SharedTimeline, direction: StepDirection) -> Option<RationalTime> {
    let mut store = store.write();
    let frame = store.active_video()?.frame_duration()?;
    let time = store.current_time() + frame * direction.sign();
    store.set_current_time(time);
    trace!(%time, ?direction, "Frame step");
    Some(time)
}

/// Move the playhead by the configured jump distance, clamped at zero.
pub fn jump(store: &SharedTimeline, settings: &Settings, direction: StepDirection) -> RationalTime {
    let mut store = store.write();
    let time = (store.current_time() + settings.jump_distance() * direction.sign())
        .max(RationalTime::ZERO);
    store.set_current_time(time);
    time
}

/// Press-and-hold stepping. A press steps once immediately, then repeats on
/// a fixed interval until released. The repeat stops by itself when the
/// active video changes.
pub struct FrameStepper {
    store: SharedTimeline,
    repeat_interval: Duration,
    hold: Option<JoinHandle<()>>,
}

impl FrameStepper {
    pub fn new(store: SharedTimeline, repeat_interval: Duration) -> Self {
        Self {
            store,
            repeat_interval,
            hold: None,
        }
    }

    /// Whether a hold-repeat is in flight.
    pub fn is_holding(&self) -> bool {
        self.hold.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Single click: one step, no repeat.
    pub fn click(&mut self, direction: StepDirection) -> Option<RationalTime> {
        self.release();
        step_frame(&self.store, direction)
    }

    /// Start a hold. Must be called inside a tokio runtime.
    pub fn press(&mut self, direction: StepDirection) -> Option<RationalTime> {
        self.release();
        let first = step_frame(&self.store, direction)?;
        let video_id = self.store.read().active_video_id();
        let store = self.store.clone();
        let period = self.repeat_interval;
        debug!(?direction, "Hold-to-step started");

        self.hold = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if store.read().active_video_id() != video_id {
                    debug!("Active video changed, hold-to-step cancelled");
                    break;
                }
                if step_frame(&store, direction).is_none() {
                    break;
                }
            }
        }));
        Some(first)
    }

    /// End a hold. No-op when nothing is held.
    pub fn release(&mut self) {
        if let Some(task) = self.hold.take() {
            task.abort();
        }
    }
}

impl Drop for FrameStepper {
    fn drop(&mut self) {
        self.release();
    }
}
