//! Vodon Media - boundary to the media decode/playback backend
//!
//! This crate handles:
//! - Media file probing (ffprobe JSON) into `VideoMetadata`
//! - The `MediaBackend` / `MediaPlayer` traits the review engine consumes
//! - Slaving individual players to the shared playhead (`PlayerSync`)

pub mod player;
pub mod probe;

pub use player::{MediaPlayer, PlayerSync, SyncAction};
pub use probe::{
    probe_all, AudioStreamInfo, FfprobeBackend, MediaBackend, MediaProbe, VideoMetadata,
    VideoStreamInfo,
};

/// Initialize the media subsystem (call once at startup).
pub fn init() {
    if ffmpeg_sidecar::ffprobe::ffprobe_is_installed() {
        tracing::info!("Vodon media initialized");
    } else {
        tracing::warn!("ffprobe not found; video metadata will stay unresolved");
    }
}
