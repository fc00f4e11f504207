//! Per-video players slaved to the shared playhead.

use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;
use vodon_core::{RationalTime, Result};
use vodon_media::{MediaPlayer, PlayerSync};
use vodon_timeline::{Settings, TimelineStore};

/// Drift tolerance used when `slow_cpu_mode` is on.
const SLOW_CPU_TOLERANCE: RationalTime = RationalTime::ONE;

/// The set of loaded players, one per video.
pub struct PlayerBank {
    players: HashMap<Uuid, Box<dyn MediaPlayer + Send>>,
    sync: PlayerSync,
}

impl PlayerBank {
    pub fn new(sync: PlayerSync) -> Self {
        Self {
            players: HashMap::new(),
            sync,
        }
    }

    /// Pick the drift tolerance from user settings.
    pub fn for_settings(settings: &Settings) -> Self {
        let sync = if settings.slow_cpu_mode {
            PlayerSync::new(SLOW_CPU_TOLERANCE)
        } else {
            PlayerSync::default()
        };
        Self::new(sync)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Load `path` into `player` and register it for `video_id`.
    pub fn attach(
        &mut self,
        video_id: Uuid,
        path: &str,
        mut player: Box<dyn MediaPlayer + Send>,
    ) -> Result<()> {
        player.load(path)?;
        debug!(video = %video_id, path, "Player attached");
        self.players.insert(video_id, player);
        Ok(())
    }

    pub fn detach(&mut self, video_id: Uuid) -> bool {
        self.players.remove(&video_id).is_some()
    }

    /// Bring every player in line with the store. Players for videos no longer
    /// in the store are dropped. Returns the number of corrective seeks.
    pub fn reconcile(&mut self, store: &TimelineStore) -> usize {
        self.players.retain(|id, _| store.video(*id).is_some());

        let playing = store.playing();
        let mut seeks = 0;
        for (id, player) in self.players.iter_mut() {
            let Some(video) = store.video(*id) else {
                continue;
            };
            if !video.is_ready() {
                warn!(video = %id, "Skipping player for video without duration");
                continue;
            }
            player.set_volume(video.volume);
            let target = video.local_time(store.current_time());
            if self.sync.reconcile(player.as_mut(), target, playing).seeked {
                seeks += 1;
            }
        }
        seeks
    }
}
