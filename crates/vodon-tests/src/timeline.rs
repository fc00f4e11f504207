//! Integration tests for the timeline subsystem.
//!
//! Exercises cross-crate interactions between vodon-core, vodon-media and
//! vodon-timeline.

use proptest::prelude::*;
use vodon_core::{DrawingSnapshot, FrameRate, RationalTime, Shape};
use vodon_media::MediaProbe;
use vodon_timeline::{normalise, ProjectFile, TimelineEvent, TimelineStore, Video};

// ── Helpers ────────────────────────────────────────────────────

const PROBE_JSON: &str = r#"{
    "streams": [{
        "index": 0,
        "codec_type": "video",
        "codec_name": "h264",
        "width": 1280,
        "height": 720,
        "r_frame_rate": "30000/1001"
    }],
    "format": { "format_name": "mp4", "duration": "90.000000" }
}"#;

fn video(name: &str, offset: i64, duration: i64) -> Video {
    let mut v = Video::new(format!("media/{name}.mp4"), name);
    v.offset = RationalTime::from_secs(offset);
    v.duration = Some(RationalTime::from_secs(duration));
    v.frame_rate = Some(FrameRate::FPS_30);
    v
}

fn three_cameras() -> TimelineStore {
    let mut store = TimelineStore::new();
    store.add_video(video("wide", 4, 100));
    store.add_video(video("close", 1, 60));
    store.add_video(video("crowd", 7, 30));
    store
}

// ── Offsets ────────────────────────────────────────────────────

#[test]
fn normalised_offsets_translate_to_zero() {
    let store = three_cameras();
    let offsets: Vec<_> = store.videos().iter().map(|v| v.offset_normalised).collect();
    assert_eq!(
        offsets,
        vec![
            RationalTime::from_secs(3),
            RationalTime::ZERO,
            RationalTime::from_secs(6),
        ]
    );
    assert_eq!(store.max_duration(), Some(RationalTime::from_secs(103)));
}

#[test]
fn offset_edit_renormalises_every_video() {
    let mut store = three_cameras();
    let close = store.videos()[1].id;
    store.set_video_offset(close, RationalTime::from_secs(10));

    let wide = &store.videos()[0];
    assert_eq!(wide.offset_normalised, RationalTime::ZERO);
    assert_eq!(
        store.video(close).unwrap().offset_normalised,
        RationalTime::from_secs(6)
    );
    assert_eq!(store.max_duration(), Some(RationalTime::from_secs(100)));
}

#[test]
fn local_time_follows_normalised_offset() {
    let mut store = three_cameras();
    store.set_current_time(RationalTime::from_secs(10));
    let ids: Vec<_> = store.videos().iter().map(|v| v.id).collect();

    assert_eq!(store.local_time(ids[0]), Some(RationalTime::from_secs(7)));
    assert_eq!(store.local_time(ids[1]), Some(RationalTime::from_secs(10)));
    assert_eq!(store.local_time(ids[2]), Some(RationalTime::from_secs(4)));

    store.set_current_time(RationalTime::from_secs(2));
    assert_eq!(store.local_time(ids[2]), Some(RationalTime::ZERO));
    assert!(!store.videos()[2].covers(store.current_time()));
}

proptest! {
    #[test]
    fn normalise_keeps_relative_offsets(
        offsets in prop::collection::vec(-10_000i64..10_000, 1..16),
        durations in prop::collection::vec(1i64..10_000, 16),
    ) {
        let mut videos: Vec<Video> = offsets
            .iter()
            .zip(&durations)
            .map(|(&o, &d)| video("p", o, d))
            .collect();
        let max = normalise(&mut videos);

        let min = videos.iter().map(|v| v.offset_normalised).min().unwrap();
        prop_assert_eq!(min, RationalTime::ZERO);
        for (a, b) in videos.iter().zip(videos.iter().skip(1)) {
            prop_assert_eq!(
                a.offset_normalised - b.offset_normalised,
                a.offset - b.offset
            );
        }
        let expected = videos
            .iter()
            .map(|v| v.duration.unwrap() + v.offset_normalised)
            .max();
        prop_assert_eq!(max, expected);
    }
}

#[derive(Debug, Clone)]
enum StoreOp {
    Add { offset: i64, duration: i64 },
    Remove(usize),
    SetOffset(usize, i64),
}

fn store_op() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (-600i64..600, 1i64..3_600)
            .prop_map(|(offset, duration)| StoreOp::Add { offset, duration }),
        any::<usize>().prop_map(StoreOp::Remove),
        (any::<usize>(), -600i64..600).prop_map(|(i, offset)| StoreOp::SetOffset(i, offset)),
    ]
}

proptest! {
    #[test]
    fn store_stays_normalised_under_edits(ops in prop::collection::vec(store_op(), 1..40)) {
        let mut store = TimelineStore::new();
        for op in ops {
            let ids: Vec<_> = store.videos().iter().map(|v| v.id).collect();
            match op {
                StoreOp::Add { offset, duration } => store.add_video(video("p", offset, duration)),
                StoreOp::Remove(i) if !ids.is_empty() => store.remove_video(ids[i % ids.len()]),
                StoreOp::SetOffset(i, offset) if !ids.is_empty() => {
                    store.set_video_offset(ids[i % ids.len()], RationalTime::from_secs(offset));
                }
                _ => {}
            }

            let videos = store.videos();
            if videos.is_empty() {
                prop_assert_eq!(store.max_duration(), None);
                continue;
            }
            let min = videos.iter().map(|v| v.offset_normalised).min().unwrap();
            prop_assert_eq!(min, RationalTime::ZERO);
            prop_assert_eq!(
                store.max_duration(),
                videos.iter().filter_map(|v| v.duration_normalised).max()
            );
            for v in videos {
                prop_assert_eq!(v.duration_normalised, v.duration.map(|d| d + v.offset_normalised));
            }
        }
    }
}

// ── Selection ──────────────────────────────────────────────────

#[test]
fn first_added_video_becomes_active() {
    let mut store = TimelineStore::new();
    let events = store.subscribe();
    let first = video("a", 0, 10);
    let first_id = first.id;
    store.add_video(first);
    store.add_video(video("b", 0, 10));

    assert_eq!(store.active_video_id(), Some(first_id));
    let selected: Vec<_> = events
        .try_iter()
        .filter(|e| matches!(e, TimelineEvent::ActiveVideoChanged(_)))
        .collect();
    assert_eq!(selected.len(), 1);
}

#[test]
fn removing_active_video_clears_selection() {
    let mut store = three_cameras();
    let active = store.active_video_id().unwrap();
    store.remove_video(active);

    assert_eq!(store.active_video_id(), None);
    assert_eq!(store.videos().len(), 2);
    assert_eq!(store.videos()[0].offset_normalised, RationalTime::ZERO);
}

// ── Bookmarks ──────────────────────────────────────────────────

#[test]
fn bookmark_matches_exact_instant_only() {
    let mut store = three_cameras();
    let frame = FrameRate::FPS_30.frame_duration();
    let at = RationalTime::from_frames(300, FrameRate::FPS_30);
    store.set_current_time(at);
    store.add_bookmark(None).unwrap();

    store.set_current_time(at + frame);
    assert!(store.active_bookmark().is_none());
    store.set_current_time(at - frame + frame);
    assert!(store.active_bookmark().is_some());
    assert_eq!(store.add_bookmark(None), None);
}

#[test]
fn bookmark_lives_on_active_video() {
    let mut store = three_cameras();
    store.set_current_time(RationalTime::from_secs(5));
    store.add_bookmark(None).unwrap();

    let other = store.videos()[2].id;
    store.set_active_video_id(Some(other));
    assert!(store.active_bookmark().is_none());
}

// ── Persistence ────────────────────────────────────────────────

#[test]
fn probed_project_survives_save_and_load() {
    let probe = MediaProbe::from_ffprobe_json("media/wide.mp4", PROBE_JSON.as_bytes()).unwrap();
    let metadata = probe.metadata().unwrap();

    let mut store = TimelineStore::new();
    let mut wide = Video::new("media/wide.mp4", "wide");
    wide.offset = RationalTime::new(3, 2);
    let wide_id = wide.id;
    store.add_video(wide);
    store.apply_metadata(wide_id, &metadata);

    let mut drawing = DrawingSnapshot::new();
    drawing.insert_shape(Shape::freehand("arrow", [0.25, 0.75]));
    store.set_current_time(RationalTime::from_frames(45, FrameRate::FPS_29_97));
    store.add_bookmark(Some(drawing.clone())).unwrap();

    let bytes = ProjectFile::new(store.snapshot()).to_json().unwrap();
    let mut restored = TimelineStore::new();
    restored.load_snapshot(ProjectFile::from_json(&bytes).unwrap().project);

    let video = restored.video(wide_id).unwrap();
    assert_eq!(video.frame_rate, Some(FrameRate::FPS_29_97));
    assert_eq!(video.duration, Some(RationalTime::from_secs(90)));
    assert_eq!(video.offset, RationalTime::new(3, 2));
    assert_eq!(video.bookmarks.len(), 1);
    assert_eq!(video.bookmarks[0].drawing, Some(drawing));
    assert_eq!(restored.current_time(), RationalTime::ZERO);
    assert_eq!(restored.active_video_id(), Some(wide_id));
}
