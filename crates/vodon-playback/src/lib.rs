//! Vodon Playback - Driving the shared playhead
//!
//! Architecture:
//! - `PlaybackClock`: wall-time anchored ticker that advances the playhead
//! - `FrameStepper`: single-frame steps and hold-to-repeat
//! - `PlayerBank`: slaves per-video players to the derived local positions
//! - `PlaybackConfig`: timer intervals and latency correction

pub mod clock;
pub mod config;
pub mod players;
pub mod stepper;

pub use clock::PlaybackClock;
pub use config::PlaybackConfig;
pub use players::PlayerBank;
pub use stepper::{jump, step_frame, FrameStepper, StepDirection};
