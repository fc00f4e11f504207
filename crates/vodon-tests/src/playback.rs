//! Integration tests for the playback subsystem.
//!
//! Drives the shared timeline with the playback clock and the frame stepper
//! and checks that slaved players land where the timeline says.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use vodon_core::{FrameRate, RationalTime, Result};
use vodon_media::MediaPlayer;
use vodon_playback::{
    step_frame, FrameStepper, PlaybackClock, PlaybackConfig, PlayerBank, StepDirection,
};
use vodon_timeline::{SharedTimeline, Settings, TimelineStore, Video};

// ── Helpers ────────────────────────────────────────────────────

#[derive(Default)]
struct PlayerState {
    position: RationalTime,
    playing: bool,
}

struct RecordingPlayer(Arc<Mutex<PlayerState>>);

impl MediaPlayer for RecordingPlayer {
    fn load(&mut self, _path: &str) -> Result<()> {
        Ok(())
    }
    fn position(&self) -> RationalTime {
        self.0.lock().position
    }
    fn seek(&mut self, position: RationalTime) {
        self.0.lock().position = position;
    }
    fn play(&mut self) {
        self.0.lock().playing = true;
    }
    fn pause(&mut self) {
        self.0.lock().playing = false;
    }
    fn is_playing(&self) -> bool {
        self.0.lock().playing
    }
    fn set_volume(&mut self, _volume: f32) {}
}

fn shared_store(rate: FrameRate, offsets: &[i64]) -> SharedTimeline {
    let mut store = TimelineStore::new();
    for (i, offset) in offsets.iter().enumerate() {
        let mut video = Video::new(format!("cam-{i}.mp4"), format!("cam-{i}"));
        video.frame_rate = Some(rate);
        video.duration = Some(RationalTime::from_secs(600));
        video.offset = RationalTime::from_secs(*offset);
        store.add_video(video);
    }
    store.into_shared()
}

// ── Clock ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn clock_playhead_never_moves_backwards() {
    let store = shared_store(FrameRate::FPS_25, &[0]);
    let mut clock = PlaybackClock::new(store.clone(), PlaybackConfig::default());
    store.write().start_playing();
    clock.sync();

    let mut last = store.read().current_time();
    for _ in 0..20 {
        sleep(Duration::from_millis(170)).await;
        let now = store.read().current_time();
        assert!(now >= last, "{now} < {last}");
        last = now;
    }

    store.write().stop_playing();
    clock.sync();
    assert!(last > RationalTime::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn seek_during_playback_resumes_from_seek_target() {
    let store = shared_store(FrameRate::FPS_25, &[0]);
    let mut clock = PlaybackClock::new(store.clone(), PlaybackConfig::default());
    store.write().start_playing();
    clock.sync();
    sleep(Duration::from_millis(1010)).await;

    store.write().set_current_time(RationalTime::from_secs(100));
    sleep(Duration::from_millis(1000)).await;

    let now = store.read().current_time();
    assert!(now >= RationalTime::from_secs(100));
    assert!(now < RationalTime::from_secs(101));
}

// ── Frame stepping ─────────────────────────────────────────────

#[test]
fn frame_steps_at_ntsc_rate_are_exact() {
    let store = shared_store(FrameRate::FPS_29_97, &[0]);
    for _ in 0..30 {
        step_frame(&store, StepDirection::Forward).unwrap();
    }
    assert_eq!(store.read().current_time(), RationalTime::new(1001, 1000));

    for _ in 0..30 {
        step_frame(&store, StepDirection::Backward).unwrap();
    }
    assert_eq!(store.read().current_time(), RationalTime::ZERO);
}

#[test]
fn frame_step_uses_active_video_rate() {
    let mut store = TimelineStore::new();
    let mut slow = Video::new("slow.mp4", "slow");
    slow.frame_rate = Some(FrameRate::FPS_24);
    let mut fast = Video::new("fast.mp4", "fast");
    fast.frame_rate = Some(FrameRate::FPS_60);
    let fast_id = fast.id;
    store.add_video(slow);
    store.add_video(fast);
    let store = store.into_shared();

    step_frame(&store, StepDirection::Forward).unwrap();
    assert_eq!(store.read().current_time(), RationalTime::new(1, 24));

    store.write().set_active_video_id(Some(fast_id));
    step_frame(&store, StepDirection::Forward).unwrap();
    assert_eq!(
        store.read().current_time(),
        RationalTime::new(1, 24) + RationalTime::new(1, 60)
    );
}

#[tokio::test(start_paused = true)]
async fn held_step_stops_on_release() {
    let store = shared_store(FrameRate::FPS_30, &[0]);
    let mut stepper = FrameStepper::new(store.clone(), Duration::from_millis(100));
    stepper.press(StepDirection::Forward);
    sleep(Duration::from_millis(210)).await;
    stepper.release();
    let held = store.read().current_time();
    assert_eq!(held, RationalTime::new(3, 30));

    sleep(Duration::from_millis(500)).await;
    assert_eq!(store.read().current_time(), held);
}

// ── Players ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn paused_players_land_on_local_time() {
    let store = shared_store(FrameRate::FPS_30, &[2, 5]);
    let ids: Vec<_> = store.read().videos().iter().map(|v| v.id).collect();
    let states: Vec<_> = ids
        .iter()
        .map(|_| Arc::new(Mutex::new(PlayerState::default())))
        .collect();

    let mut bank = PlayerBank::for_settings(&Settings::default());
    for (id, state) in ids.iter().zip(&states) {
        bank.attach(*id, "cam.mp4", Box::new(RecordingPlayer(state.clone())))
            .unwrap();
    }

    let mut clock = PlaybackClock::new(store.clone(), PlaybackConfig::default());
    store.write().start_playing();
    clock.sync();
    bank.reconcile(&store.read());
    assert!(states.iter().all(|s| s.lock().playing));

    sleep(Duration::from_millis(4010)).await;
    store.write().stop_playing();
    clock.sync();
    bank.reconcile(&store.read());

    let store = store.read();
    for (id, state) in ids.iter().zip(&states) {
        let state = state.lock();
        assert!(!state.playing);
        assert_eq!(Some(state.position), store.local_time(*id));
    }
    assert_eq!(
        states[0].lock().position - states[1].lock().position,
        RationalTime::from_secs(3)
    );
}
