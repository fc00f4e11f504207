//! Application configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vodon_collab::CollabConfig;
use vodon_playback::PlaybackConfig;

/// Everything tunable that is not a user preference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub playback: PlaybackConfig,
    pub collab: CollabConfig,
}

impl AppConfig {
    /// `<config_dir>/vodon/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vodon")
            .join("config.json")
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
    }
}
