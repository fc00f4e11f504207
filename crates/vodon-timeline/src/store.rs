//! Authoritative timeline state.
//!
//! `TimelineStore` is the single writer for videos, selection, playhead and
//! play state. Readers either borrow it through a `SharedTimeline` lock or
//! subscribe to `TimelineEvent`s. Operations addressing an unknown video or
//! bookmark are no-ops; probe results can race with removal.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use vodon_core::{DrawingSnapshot, RationalTime};
use vodon_media::VideoMetadata;

use crate::bookmark::VideoBookmark;
use crate::offset;
use crate::video::Video;

/// Store shared between the dispatch path and timer tasks.
pub type SharedTimeline = Arc<RwLock<TimelineStore>>;

/// Change notifications, sent after each applied mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEvent {
    /// Set membership or offsets changed; normalised fields were recomputed.
    VideosChanged,
    /// A single video's fields changed.
    VideoUpdated(Uuid),
    ActiveVideoChanged(Option<Uuid>),
    CurrentTimeChanged(RationalTime),
    PlayingChanged(bool),
    BookmarksChanged(Uuid),
}

/// Serializable view of the store for persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    pub videos: Vec<Video>,
}

/// The shared timeline state.
#[derive(Debug, Default)]
pub struct TimelineStore {
    videos: Vec<Video>,
    active_video_id: Option<Uuid>,
    current_time: RationalTime,
    playing: bool,
    max_duration: Option<RationalTime>,
    /// Bumped on every explicit seek; clock writes carry the epoch they
    /// were anchored at.
    playhead_epoch: u64,
    subscribers: Vec<Sender<TimelineEvent>>,
}

impl TimelineStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap into a lock for sharing with the clock and stepper tasks.
    pub fn into_shared(self) -> SharedTimeline {
        Arc::new(RwLock::new(self))
    }

    /// Register a reader. Dropped receivers are pruned on the next send.
    pub fn subscribe(&mut self) -> Receiver<TimelineEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: TimelineEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    fn renormalise(&mut self) {
        self.max_duration = offset::normalise(&mut self.videos);
        self.notify(TimelineEvent::VideosChanged);
    }

    fn video_mut(&mut self, id: Uuid) -> Option<&mut Video> {
        self.videos.iter_mut().find(|v| v.id == id)
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// All videos in insertion order.
    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    /// Find a video by ID.
    pub fn video(&self, id: Uuid) -> Option<&Video> {
        self.videos.iter().find(|v| v.id == id)
    }

    pub fn active_video_id(&self) -> Option<Uuid> {
        self.active_video_id
    }

    /// The selected video, if any.
    pub fn active_video(&self) -> Option<&Video> {
        self.active_video_id.and_then(|id| self.video(id))
    }

    /// The global playhead.
    pub fn current_time(&self) -> RationalTime {
        self.current_time
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    /// End of the shared timeline, `None` for an empty set.
    pub fn max_duration(&self) -> Option<RationalTime> {
        self.max_duration
    }

    pub fn playhead_epoch(&self) -> u64 {
        self.playhead_epoch
    }

    /// Local seek position of a video for the current playhead.
    pub fn local_time(&self, id: Uuid) -> Option<RationalTime> {
        self.video(id).map(|v| v.local_time(self.current_time))
    }

    // ── Video set ─────────────────────────────────────────────────

    /// Append a video. The first video added to an unselected store becomes
    /// active.
    pub fn add_video(&mut self, video: Video) {
        if self.video(video.id).is_some() {
            warn!(video = %video.id, "Video already in timeline, ignoring add");
            return;
        }
        let id = video.id;
        debug!(video = %id, name = %video.name, "Adding video");
        self.videos.push(video);
        self.renormalise();

        if self.active_video_id.is_none() {
            self.active_video_id = Some(id);
            self.notify(TimelineEvent::ActiveVideoChanged(Some(id)));
        }
    }

    /// Remove a video. The selection is cleared if it pointed at the removed
    /// video; it is never moved to another one.
    pub fn remove_video(&mut self, id: Uuid) {
        let before = self.videos.len();
        self.videos.retain(|v| v.id != id);
        if self.videos.len() == before {
            return;
        }
        debug!(video = %id, "Removed video");
        self.renormalise();

        if self.active_video_id == Some(id) {
            self.active_video_id = None;
            self.notify(TimelineEvent::ActiveVideoChanged(None));
        }
    }

    /// Set a raw offset and renormalise the whole set.
    pub fn set_video_offset(&mut self, id: Uuid, offset: RationalTime) {
        let Some(video) = self.video_mut(id) else {
            return;
        };
        video.offset = offset;
        debug!(video = %id, %offset, "Offset set");
        self.renormalise();
    }

    /// Set a probed duration and renormalise.
    pub fn set_video_duration(&mut self, id: Uuid, duration: RationalTime) {
        let Some(video) = self.video_mut(id) else {
            return;
        };
        video.duration = Some(duration);
        self.renormalise();
    }

    /// Apply probe results to a video.
    pub fn apply_metadata(&mut self, id: Uuid, metadata: &VideoMetadata) {
        let Some(video) = self.video_mut(id) else {
            return;
        };
        video.apply_metadata(metadata);
        self.renormalise();
    }

    /// Rename a video.
    pub fn set_video_name(&mut self, id: Uuid, name: impl Into<String>) {
        let Some(video) = self.video_mut(id) else {
            return;
        };
        video.name = name.into();
        self.notify(TimelineEvent::VideoUpdated(id));
    }

    /// Record the last observed local player position.
    pub fn set_video_sync_time(&mut self, id: Uuid, sync_time: RationalTime) {
        let Some(video) = self.video_mut(id) else {
            return;
        };
        video.sync_time = sync_time;
        self.notify(TimelineEvent::VideoUpdated(id));
    }

    /// Set playback volume, clamped to `[0, 1]`.
    pub fn set_video_volume(&mut self, id: Uuid, volume: f32) {
        let Some(video) = self.video_mut(id) else {
            return;
        };
        video.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.notify(TimelineEvent::VideoUpdated(id));
    }

    /// Reseed every offset from its video's sync time, then renormalise.
    /// Used after the operator has parked each player on a common event:
    /// a video whose event sits later in its own file starts earlier on the
    /// shared timeline, so the event lands on one global instant for all.
    pub fn recalculate_offsets(&mut self) {
        for video in &mut self.videos {
            video.offset = -video.sync_time;
        }
        self.renormalise();
    }

    // ── Selection & transport ─────────────────────────────────────

    /// Select a video, or clear the selection. Unknown IDs are ignored.
    pub fn set_active_video_id(&mut self, id: Option<Uuid>) {
        if let Some(id) = id {
            if self.video(id).is_none() {
                return;
            }
        }
        if self.active_video_id != id {
            self.active_video_id = id;
            self.notify(TimelineEvent::ActiveVideoChanged(id));
        }
    }

    /// Explicit seek. Not clamped here; per-video reads clamp.
    pub fn set_current_time(&mut self, time: RationalTime) {
        self.current_time = time;
        self.playhead_epoch += 1;
        self.notify(TimelineEvent::CurrentTimeChanged(time));
    }

    /// Clock write. Applied only when no seek happened since the clock
    /// anchored at `epoch`; returns whether the write landed.
    pub fn advance_playhead(&mut self, epoch: u64, time: RationalTime) -> bool {
        if epoch != self.playhead_epoch {
            return false;
        }
        self.current_time = time;
        self.notify(TimelineEvent::CurrentTimeChanged(time));
        true
    }

    pub fn start_playing(&mut self) {
        self.set_playing(true);
    }

    pub fn stop_playing(&mut self) {
        self.set_playing(false);
    }

    pub fn toggle_playing(&mut self) {
        self.set_playing(!self.playing);
    }

    fn set_playing(&mut self, playing: bool) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        debug!(playing, time = %self.current_time, "Play state changed");
        self.notify(TimelineEvent::PlayingChanged(playing));
    }

    // ── Bookmarks ─────────────────────────────────────────────────

    /// The active video's bookmark at exactly the current instant.
    pub fn active_bookmark(&self) -> Option<&VideoBookmark> {
        self.active_video()?.bookmark_at(self.current_time)
    }

    /// Bookmark the current instant on the active video with `drawing`.
    /// Returns `None` without an active video or when the instant is already
    /// bookmarked.
    pub fn add_bookmark(&mut self, drawing: Option<DrawingSnapshot>) -> Option<Uuid> {
        let time = self.current_time;
        let video_id = self.active_video_id?;
        let video = self.video_mut(video_id)?;
        let bookmark = VideoBookmark::new(time, drawing);
        let bookmark_id = bookmark.id;
        if !video.insert_bookmark(bookmark) {
            return None;
        }
        debug!(video = %video_id, bookmark = %bookmark_id, %time, "Bookmark added");
        self.notify(TimelineEvent::BookmarksChanged(video_id));
        Some(bookmark_id)
    }

    /// Overwrite a bookmark's snapshot, keeping its id and time. Refused
    /// while playing: edits made during playback are never committed.
    pub fn set_bookmark_drawing(
        &mut self,
        video_id: Uuid,
        bookmark_id: Uuid,
        drawing: DrawingSnapshot,
    ) -> bool {
        if self.playing {
            debug!(bookmark = %bookmark_id, "Bookmark drawing not saved while playing");
            return false;
        }
        let Some(bookmark) = self
            .video_mut(video_id)
            .and_then(|v| v.bookmark_mut(bookmark_id))
        else {
            return false;
        };
        bookmark.drawing = Some(drawing);
        self.notify(TimelineEvent::BookmarksChanged(video_id));
        true
    }

    /// Delete a bookmark.
    pub fn remove_bookmark(&mut self, video_id: Uuid, bookmark_id: Uuid) -> bool {
        let removed = self
            .video_mut(video_id)
            .and_then(|v| v.remove_bookmark(bookmark_id))
            .is_some();
        if removed {
            self.notify(TimelineEvent::BookmarksChanged(video_id));
        }
        removed
    }

    // ── Persistence ───────────────────────────────────────────────

    /// Copy out the persisted part of the state.
    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            videos: self.videos.clone(),
        }
    }

    /// Replace the video set from a snapshot. Selection falls back to the
    /// first video, the playhead rewinds and playback stops.
    pub fn load_snapshot(&mut self, snapshot: TimelineSnapshot) {
        self.videos = snapshot.videos;
        self.current_time = RationalTime::ZERO;
        self.playhead_epoch += 1;
        self.set_playing(false);
        self.renormalise();

        let active = self.videos.first().map(|v| v.id);
        self.active_video_id = active;
        self.notify(TimelineEvent::ActiveVideoChanged(active));
        self.notify(TimelineEvent::CurrentTimeChanged(RationalTime::ZERO));
    }
}
