//! Review project persistence.
//!
//! JSON with a schema version field. Files written by a newer build are
//! refused rather than partially read.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use vodon_core::{Result, VodonError};

use crate::offset;
use crate::store::TimelineSnapshot;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Versioned project file wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Schema version.
    pub version: u32,
    /// The persisted video set.
    pub project: TimelineSnapshot,
    /// Application version that wrote this file.
    pub app_version: String,
}

impl ProjectFile {
    /// Wrap a snapshot for writing.
    pub fn new(project: TimelineSnapshot) -> Self {
        Self {
            version: CURRENT_VERSION,
            project,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| VodonError::Serialization(format!("Failed to serialize project: {}", e)))
    }

    /// Deserialize from JSON bytes. Normalised fields are recomputed rather
    /// than trusted.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| VodonError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| VodonError::Serialization("Missing project file version".into()))?;

        if version > u64::from(CURRENT_VERSION) {
            return Err(VodonError::UnsupportedVersion {
                found: version,
                supported: CURRENT_VERSION,
            });
        }

        let mut file: ProjectFile = serde_json::from_value(raw)
            .map_err(|e| VodonError::Serialization(format!("Failed to parse project: {}", e)))?;
        offset::normalise(&mut file.project.videos);
        Ok(file)
    }

    /// Save to a file path.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        info!(path = %path.display(), videos = self.project.videos.len(), "Project saved");
        Ok(())
    }

    /// Load from a file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let file = Self::from_json(&data)?;
        info!(path = %path.display(), videos = file.project.videos.len(), "Project loaded");
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::VideoBookmark;
    use crate::video::Video;
    use vodon_core::{DrawingSnapshot, RationalTime, Shape};

    fn snapshot() -> TimelineSnapshot {
        let mut a = Video::new("/media/cam-a.mp4", "cam-a");
        a.offset = RationalTime::from_secs(5);
        a.duration = Some(RationalTime::from_secs(100));
        let mut drawing = DrawingSnapshot::new();
        drawing.insert_shape(Shape::freehand("s1", [3.0, 4.0]));
        a.insert_bookmark(VideoBookmark::new(RationalTime::new(301, 10), Some(drawing)));

        let mut b = Video::new("/media/cam-b.mp4", "cam-b");
        b.offset = RationalTime::from_secs(2);
        b.duration = Some(RationalTime::from_secs(80));
        TimelineSnapshot { videos: vec![a, b] }
    }

    #[test]
    fn test_project_roundtrip() {
        let file = ProjectFile::new(snapshot());
        let json = file.to_json().unwrap();
        let loaded = ProjectFile::from_json(&json).unwrap();

        assert_eq!(loaded.version, CURRENT_VERSION);
        assert_eq!(loaded.project.videos.len(), 2);
        let a = &loaded.project.videos[0];
        assert_eq!(a.name, "cam-a");
        assert_eq!(a.bookmarks.len(), 1);
        assert_eq!(a.bookmarks[0].time, RationalTime::new(301, 10));
    }

    #[test]
    fn test_load_recomputes_normalised_fields() {
        // Normalised fields in the file are stale on purpose.
        let file = ProjectFile::new(snapshot());
        let mut raw: serde_json::Value = serde_json::from_slice(&file.to_json().unwrap()).unwrap();
        raw["project"]["videos"][0]["offset_normalised"] = serde_json::json!([999, 1]);

        let loaded = ProjectFile::from_json(&serde_json::to_vec(&raw).unwrap()).unwrap();
        let a = &loaded.project.videos[0];
        assert_eq!(a.offset_normalised, RationalTime::from_secs(3));
        assert_eq!(a.duration_normalised, Some(RationalTime::from_secs(103)));
    }

    #[test]
    fn test_future_version_rejected() {
        let json = serde_json::json!({
            "version": 999,
            "project": { "videos": [] },
            "app_version": "99.0.0",
        });
        let data = serde_json::to_vec(&json).unwrap();
        assert!(matches!(
            ProjectFile::from_json(&data),
            Err(VodonError::UnsupportedVersion { found: 999, .. })
        ));
    }

    #[test]
    fn test_missing_version_rejected() {
        let data = br#"{ "project": { "videos": [] }, "app_version": "0.1.0" }"#;
        assert!(ProjectFile::from_json(data).is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.vodon.json");
        ProjectFile::new(snapshot()).save_to_file(&path).unwrap();

        let loaded = ProjectFile::load_from_file(&path).unwrap();
        assert_eq!(loaded.project.videos[1].name, "cam-b");
    }
}
