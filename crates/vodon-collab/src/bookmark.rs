//! Moving drawings between an annotation session and timeline bookmarks.
//!
//! Bookmarks own deep copies. Loading hands the session a clone of the stored
//! snapshot and saving stores a clone of the surface, so neither side can
//! mutate the other afterwards.

use std::time::Instant;
use tracing::debug;
use uuid::Uuid;
use vodon_timeline::{Settings, TimelineStore};

use crate::service::ReplicationService;
use crate::session::AnnotationSession;

/// Show the drawing of the bookmark at the current instant, or a blank
/// surface when the instant is not bookmarked. Returns whether a bookmark
/// drawing was loaded.
pub fn load_active_bookmark<S: ReplicationService>(
    store: &TimelineStore,
    session: &mut AnnotationSession<S>,
    now: Instant,
) -> bool {
    match store.active_bookmark().and_then(|b| b.drawing.clone()) {
        Some(drawing) => {
            session.replace_local(drawing, now);
            true
        }
        None => {
            session.clear_local(now);
            false
        }
    }
}

/// Store the surface into the bookmark at the current instant. Refused while
/// playing or when the instant is not bookmarked.
pub fn persist_active_bookmark<S: ReplicationService>(
    store: &mut TimelineStore,
    session: &AnnotationSession<S>,
) -> bool {
    if store.playing() {
        debug!("Not persisting bookmark drawing during playback");
        return false;
    }
    let Some(video_id) = store.active_video_id() else {
        return false;
    };
    let Some(bookmark_id) = store.active_bookmark().map(|b| b.id) else {
        return false;
    };
    store.set_bookmark_drawing(video_id, bookmark_id, session.surface().clone())
}

/// Bookmark the current instant with a copy of the surface.
pub fn create_bookmark<S: ReplicationService>(
    store: &mut TimelineStore,
    session: &AnnotationSession<S>,
) -> Option<Uuid> {
    store.add_bookmark(Some(session.surface().clone()))
}

/// Playback start hook: wipe the surface if the user asked for it.
pub fn clear_on_play<S: ReplicationService>(
    settings: &Settings,
    session: &mut AnnotationSession<S>,
    now: Instant,
) -> bool {
    settings.clear_drawings_on_play && session.clear_local(now)
}
