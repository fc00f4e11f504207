//! Vodon Timeline - Synchronized multi-video timeline model
//!
//! Implements the shared review timeline:
//! - Videos positioned on one time axis by operator offsets
//! - Offset normalisation (earliest video anchors zero)
//! - The authoritative store: selection, playhead, play state
//! - Bookmarks pinning annotation snapshots to exact instants
//! - Project files and user settings

pub mod bookmark;
pub mod offset;
pub mod serialization;
pub mod settings;
pub mod store;
pub mod video;

pub use bookmark::VideoBookmark;
pub use offset::{max_normalised_duration, min_offset, normalise};
pub use serialization::ProjectFile;
pub use settings::Settings;
pub use store::{SharedTimeline, TimelineEvent, TimelineSnapshot, TimelineStore};
pub use video::Video;
