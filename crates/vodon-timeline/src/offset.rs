//! Offset normalisation across a video set.
//!
//! Normalised fields depend on the whole set, so `normalise` always rewrites
//! every video. Recomputing only the edited video leaves stale values behind.

use vodon_core::RationalTime;

use crate::video::Video;

/// Smallest raw offset in the set, zero when empty.
pub fn min_offset(videos: &[Video]) -> RationalTime {
    videos
        .iter()
        .map(|v| v.offset)
        .min()
        .unwrap_or(RationalTime::ZERO)
}

/// Largest normalised end point, `None` when empty or no duration is known.
pub fn max_normalised_duration(videos: &[Video]) -> Option<RationalTime> {
    videos.iter().filter_map(|v| v.duration_normalised).max()
}

/// Recompute `offset_normalised` and `duration_normalised` for every video.
/// Returns the new maximum normalised duration.
pub fn normalise(videos: &mut [Video]) -> Option<RationalTime> {
    let min = min_offset(videos);
    for video in videos.iter_mut() {
        video.offset_normalised = video.offset - min;
        video.duration_normalised = video.duration.map(|d| d + video.offset_normalised);
    }
    max_normalised_duration(videos)
}
