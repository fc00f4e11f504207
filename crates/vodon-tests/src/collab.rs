//! Integration tests for shared annotations.
//!
//! Two reviewers attach sessions to the same in-process replication server
//! and exchange drawings through rooms keyed by video name, while bookmarks
//! move snapshots in and out of their own timelines.

use std::time::{Duration, Instant};
use vodon_collab::{
    create_bookmark, load_active_bookmark, persist_active_bookmark, AnnotationSession,
    CollabConfig, MemoryReplicationServer, ReplicationStatus,
};
use vodon_core::{DocumentDelta, FrameRate, RationalTime, Shape};
use vodon_timeline::{ProjectFile, TimelineStore, Video};

const WINDOW: Duration = Duration::from_millis(60);

// ── Helpers ────────────────────────────────────────────────────

type Session = AnnotationSession<MemoryReplicationServer>;

fn reviewer(server: &MemoryReplicationServer, room: &str) -> Session {
    AnnotationSession::new(server.clone(), CollabConfig::default(), room)
}

fn review_store() -> TimelineStore {
    let mut store = TimelineStore::new();
    for (name, offset) in [("cam-a", 0), ("cam-b", 2)] {
        let mut video = Video::new(format!("{name}.mp4"), name);
        video.frame_rate = Some(FrameRate::FPS_25);
        video.duration = Some(RationalTime::from_secs(120));
        video.offset = RationalTime::from_secs(offset);
        store.add_video(video);
    }
    store
}

fn stroke(id: &str, x: f64) -> DocumentDelta {
    let mut delta = DocumentDelta::new();
    delta.upsert_shape(Shape::freehand(id, [x, x]));
    delta
}

// ── Replication ────────────────────────────────────────────────

#[tokio::test]
async fn drag_burst_reaches_peer_as_single_update() {
    let server = MemoryReplicationServer::new();
    let mut alice = reviewer(&server, "cam-a");
    let mut bob = reviewer(&server, "cam-a");
    alice.attach().await.unwrap();
    bob.attach().await.unwrap();
    let before = server.update_count("cam-a");

    let start = Instant::now();
    for step in 0..50u64 {
        let at = start + Duration::from_millis(step);
        alice.apply_local(stroke("drag", step as f64), at);
        alice.poll(at).await;
    }
    alice.poll(start + WINDOW).await;
    assert_eq!(server.update_count("cam-a"), before + 1);

    let outcome = bob.poll(start + WINDOW).await;
    assert!(outcome.pulled);
    assert_eq!(bob.surface(), alice.surface());
    assert_eq!(bob.surface().shapes["drag"].point, [49.0, 49.0]);
}

#[tokio::test]
async fn rooms_are_isolated_per_video() {
    let server = MemoryReplicationServer::new();
    let mut alice = reviewer(&server, "cam-a");
    let mut bob = reviewer(&server, "cam-b");
    alice.attach().await.unwrap();
    bob.attach().await.unwrap();

    let start = Instant::now();
    alice.apply_local(stroke("only-a", 1.0), start);
    alice.poll(start + WINDOW).await;

    let outcome = bob.poll(start + WINDOW).await;
    assert!(!outcome.pulled);
    assert!(bob.surface().is_empty());

    bob.switch_room("cam-a").await.unwrap();
    assert!(bob.surface().shapes.contains_key("only-a"));
}

#[tokio::test]
async fn offline_reviewer_catches_up_after_reconnect() {
    let server = MemoryReplicationServer::new();
    server.set_available(false);
    let mut alice = reviewer(&server, "cam-a");
    assert!(alice.attach().await.is_err());
    assert_eq!(alice.status(), ReplicationStatus::Unreplicated);

    alice.apply_local(stroke("offline", 2.0), Instant::now());
    assert!(alice.has_pending_edits());

    server.set_available(true);
    alice.attach().await.unwrap();
    assert!(!alice.has_pending_edits());

    let mut bob = reviewer(&server, "cam-a");
    bob.attach().await.unwrap();
    assert!(bob.surface().shapes.contains_key("offline"));
}

// ── Bookmarks ──────────────────────────────────────────────────

#[tokio::test]
async fn bookmark_drawing_travels_through_project_file() {
    let server = MemoryReplicationServer::new();
    let mut store = review_store();
    let mut alice = reviewer(&server, "cam-a");
    alice.attach().await.unwrap();

    let start = Instant::now();
    let at = RationalTime::from_frames(250, FrameRate::FPS_25);
    store.set_current_time(at);
    alice.apply_local(stroke("offside", 3.0), start);
    create_bookmark(&mut store, &alice).unwrap();

    let bytes = ProjectFile::new(store.snapshot()).to_json().unwrap();
    let mut bob_store = TimelineStore::new();
    bob_store.load_snapshot(ProjectFile::from_json(&bytes).unwrap().project);
    let mut bob = reviewer(&server, "cam-a");
    bob.attach().await.unwrap();

    bob_store.set_current_time(at);
    assert!(load_active_bookmark(&bob_store, &mut bob, start));
    assert!(bob.surface().shapes.contains_key("offside"));

    bob_store.set_current_time(at + FrameRate::FPS_25.frame_duration());
    assert!(!load_active_bookmark(&bob_store, &mut bob, start));
    assert!(bob.surface().is_empty());
}

#[tokio::test]
async fn edits_after_bookmarking_do_not_leak_into_bookmark() {
    let server = MemoryReplicationServer::new();
    let mut store = review_store();
    let mut alice = reviewer(&server, "cam-a");
    alice.attach().await.unwrap();

    let start = Instant::now();
    store.set_current_time(RationalTime::from_secs(7));
    alice.apply_local(stroke("first", 1.0), start);
    create_bookmark(&mut store, &alice).unwrap();

    alice.apply_local(stroke("second", 2.0), start);
    let stored = store.active_bookmark().unwrap().drawing.clone().unwrap();
    assert!(!stored.shapes.contains_key("second"));

    assert!(persist_active_bookmark(&mut store, &alice));
    let stored = store.active_bookmark().unwrap().drawing.clone().unwrap();
    assert!(stored.shapes.contains_key("second"));

    alice.apply_local(stroke("third", 3.0), start);
    let stored = store.active_bookmark().unwrap().drawing.clone().unwrap();
    assert!(!stored.shapes.contains_key("third"));
}
