//! Bookmarks pinning annotation snapshots to timeline instants.
//!
//! A bookmark is "active" only when the playhead equals its `time` exactly.
//! Bookmarks are created by capturing the current instant, so exact rational
//! equality is the intended match.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vodon_core::{DrawingSnapshot, RationalTime};

use crate::video::Video;

/// A global instant with a frozen copy of the annotation surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoBookmark {
    /// Unique per video
    pub id: Uuid,
    /// Global timeline instant
    pub time: RationalTime,
    /// Owned snapshot; never aliases the live document
    #[serde(default)]
    pub drawing: Option<DrawingSnapshot>,
}

impl VideoBookmark {
    /// Create a bookmark at `time` holding `drawing`.
    pub fn new(time: RationalTime, drawing: Option<DrawingSnapshot>) -> Self {
        Self {
            id: Uuid::new_v4(),
            time,
            drawing,
        }
    }
}

impl Video {
    /// The bookmark whose time equals `time` exactly.
    pub fn bookmark_at(&self, time: RationalTime) -> Option<&VideoBookmark> {
        self.bookmarks.iter().find(|b| b.time == time)
    }

    /// Find a bookmark by ID.
    pub fn bookmark(&self, id: Uuid) -> Option<&VideoBookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    /// Find a bookmark mutably by ID.
    pub fn bookmark_mut(&mut self, id: Uuid) -> Option<&mut VideoBookmark> {
        self.bookmarks.iter_mut().find(|b| b.id == id)
    }

    /// Insert keeping time order. Refused when the id or the exact time is
    /// already taken.
    pub fn insert_bookmark(&mut self, bookmark: VideoBookmark) -> bool {
        if self
            .bookmarks
            .iter()
            .any(|b| b.id == bookmark.id || b.time == bookmark.time)
        {
            return false;
        }
        let index = self.bookmarks.partition_point(|b| b.time < bookmark.time);
        self.bookmarks.insert(index, bookmark);
        true
    }

    /// Remove a bookmark by ID. Returns the removed bookmark.
    pub fn remove_bookmark(&mut self, id: Uuid) -> Option<VideoBookmark> {
        let index = self.bookmarks.iter().position(|b| b.id == id)?;
        Some(self.bookmarks.remove(index))
    }
}
