//! Review preferences persisted between sessions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vodon_core::{RationalTime, Result, VodonError};

/// Current settings schema version.
pub const SETTINGS_VERSION: u32 = 1;

/// User preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: u32,
    /// Seconds moved by the jump hotkeys.
    pub arrow_key_jump_distance: f64,
    /// Wipe the drawing surface when playback starts.
    pub clear_drawings_on_play: bool,
    pub show_setup_instructions: bool,
    /// Tolerate more player drift before corrective seeks on weak machines.
    pub slow_cpu_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            arrow_key_jump_distance: 10.0,
            clear_drawings_on_play: true,
            show_setup_instructions: true,
            slow_cpu_mode: false,
        }
    }
}

impl Settings {
    /// Jump distance as exact time. Negative or non-finite values count as 0.
    pub fn jump_distance(&self) -> RationalTime {
        if self.arrow_key_jump_distance.is_finite() && self.arrow_key_jump_distance > 0.0 {
            RationalTime::from_seconds_f64(self.arrow_key_jump_distance)
        } else {
            RationalTime::ZERO
        }
    }

    pub fn set_arrow_key_jump_distance(&mut self, seconds: f64) {
        self.arrow_key_jump_distance = seconds.max(0.0);
    }

    pub fn toggle_clear_drawings_on_play(&mut self) {
        self.clear_drawings_on_play = !self.clear_drawings_on_play;
    }

    pub fn toggle_show_setup_instructions(&mut self) {
        self.show_setup_instructions = !self.show_setup_instructions;
    }

    pub fn toggle_slow_cpu_mode(&mut self) {
        self.slow_cpu_mode = !self.slow_cpu_mode;
    }

    /// Save settings to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| VodonError::Serialization(format!("Failed to serialize settings: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| VodonError::Serialization(format!("Failed to deserialize settings: {e}")))
    }

    /// Load from `path`, or defaults when the file does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Default settings path under the platform config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vodon")
            .join("settings.json")
    }
}
