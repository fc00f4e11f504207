//! Player boundary and drift correction.
//!
//! Each player runs its own clock. The review engine never trusts those
//! clocks; it derives every player's local position from the global playhead
//! and nudges players back when they wander too far.

use tracing::trace;
use vodon_core::{RationalTime, Result};

/// A decode/playback backend for one video file.
pub trait MediaPlayer {
    /// Load the media at `path`.
    fn load(&mut self, path: &str) -> Result<()>;
    /// Current local position reported by the player.
    fn position(&self) -> RationalTime;
    /// Seek to a local position.
    fn seek(&mut self, position: RationalTime);
    /// Start playback.
    fn play(&mut self);
    /// Pause playback.
    fn pause(&mut self);
    /// Whether the player is currently running.
    fn is_playing(&self) -> bool;
    /// Set output volume in `[0, 1]`.
    fn set_volume(&mut self, volume: f32);
}

/// What `PlayerSync::reconcile` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncAction {
    pub seeked: bool,
    pub started: bool,
    pub paused: bool,
}

impl SyncAction {
    /// True when the player was left untouched.
    pub fn is_noop(self) -> bool {
        !(self.seeked || self.started || self.paused)
    }
}

/// Soft real-time drift correction for players slaved to the playhead.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSync {
    /// Drift allowed while playing before a corrective seek.
    pub tolerance: RationalTime,
}

impl Default for PlayerSync {
    fn default() -> Self {
        Self {
            tolerance: RationalTime::new(3, 10),
        }
    }
}

impl PlayerSync {
    /// Create with a custom drift tolerance.
    pub fn new(tolerance: RationalTime) -> Self {
        Self { tolerance }
    }

    /// Bring `player` in line with the derived local `target` and the global
    /// play state. While paused the position must match exactly; while playing
    /// drift up to `tolerance` is accepted.
    pub fn reconcile(
        &self,
        player: &mut dyn MediaPlayer,
        target: RationalTime,
        playing: bool,
    ) -> SyncAction {
        let mut action = SyncAction::default();
        let drift = (player.position() - target).abs();
        let allowed = if playing {
            self.tolerance
        } else {
            RationalTime::ZERO
        };

        if drift > allowed {
            trace!(%drift, %target, "Correcting player drift");
            player.seek(target);
            action.seeked = true;
        }

        if playing && !player.is_playing() {
            player.play();
            action.started = true;
        } else if !playing && player.is_playing() {
            player.pause();
            action.paused = true;
        }

        action
    }
}
