//! Video records on the shared timeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vodon_core::{FrameRate, RationalTime};
use vodon_media::VideoMetadata;

use crate::bookmark::VideoBookmark;

/// One recorded video positioned on the global timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Unique video ID, immutable
    pub id: Uuid,
    /// Opaque handle passed to the media backend
    pub file_path: String,
    /// Display label (also the annotation room key)
    pub name: String,
    /// Probed frame rate (None until probed)
    pub frame_rate: Option<FrameRate>,
    /// Probed coded width in pixels
    pub coded_width: Option<u32>,
    /// Probed display aspect ratio (width / height)
    pub display_aspect_ratio: Option<f64>,
    /// Native duration (None until the probe resolves)
    pub duration: Option<RationalTime>,
    /// Operator-supplied start correction
    pub offset: RationalTime,
    /// `offset - min(offset)` over the set
    #[serde(default)]
    pub offset_normalised: RationalTime,
    /// `duration + offset_normalised`: end point on the shared timeline
    #[serde(default)]
    pub duration_normalised: Option<RationalTime>,
    /// Playback volume in `[0, 1]`
    pub volume: f32,
    /// Last observed local player position
    pub sync_time: RationalTime,
    /// Bookmarks, ordered by time
    #[serde(default)]
    pub bookmarks: Vec<VideoBookmark>,
}

impl Video {
    /// Create an unprobed video.
    pub fn new(file_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_path: file_path.into(),
            name: name.into(),
            frame_rate: None,
            coded_width: None,
            display_aspect_ratio: None,
            duration: None,
            offset: RationalTime::ZERO,
            offset_normalised: RationalTime::ZERO,
            duration_normalised: None,
            volume: 1.0,
            sync_time: RationalTime::ZERO,
            bookmarks: Vec::new(),
        }
    }

    /// Create a video from already probed metadata.
    pub fn with_metadata(
        file_path: impl Into<String>,
        name: impl Into<String>,
        metadata: &VideoMetadata,
    ) -> Self {
        let mut video = Self::new(file_path, name);
        video.apply_metadata(metadata);
        video
    }

    /// Fill probe results. Stream properties are written once; the duration
    /// is always taken from the latest probe.
    pub fn apply_metadata(&mut self, metadata: &VideoMetadata) {
        self.frame_rate.get_or_insert(metadata.frame_rate);
        self.coded_width.get_or_insert(metadata.coded_width);
        self.display_aspect_ratio
            .get_or_insert(metadata.display_aspect_ratio);
        self.duration = Some(metadata.duration);
    }

    /// True once the duration is known. A missing duration means "not ready",
    /// never zero.
    pub fn is_ready(&self) -> bool {
        self.duration.is_some()
    }

    /// Length of one frame, if the frame rate is known.
    pub fn frame_duration(&self) -> Option<RationalTime> {
        self.frame_rate
            .filter(|rate| rate.is_valid())
            .map(FrameRate::frame_duration)
    }

    /// Local seek position for a global playhead value, clamped to
    /// `[0, duration]`.
    pub fn local_time(&self, current_time: RationalTime) -> RationalTime {
        let local = (current_time - self.offset_normalised).max(RationalTime::ZERO);
        match self.duration {
            Some(duration) => local.min(duration),
            None => local,
        }
    }

    /// Whether the global instant falls inside this video's span.
    pub fn covers(&self, current_time: RationalTime) -> bool {
        current_time >= self.offset_normalised
            && self
                .duration_normalised
                .map_or(true, |end| current_time <= end)
    }
}
