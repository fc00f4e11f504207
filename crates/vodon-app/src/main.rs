//! Vodon - synchronized multi-video review
//!
//! Headless entry point: loads a review project, resolves missing metadata,
//! aligns the videos on the shared timeline and prints it. With `--play`
//! the playback clock runs for the given number of seconds.

mod config;

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vodon_collab::{
    clear_on_play, load_active_bookmark, AnnotationSession, MemoryReplicationServer,
};
use vodon_media::{probe_all, FfprobeBackend, MediaBackend};
use vodon_playback::PlaybackClock;
use vodon_timeline::{ProjectFile, Settings, TimelineStore};

use crate::config::AppConfig;

struct Args {
    project: Option<PathBuf>,
    play_for: Option<f64>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        project: None,
        play_for: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--play" => {
                let secs = iter.next().context("--play needs a number of seconds")?;
                args.play_for = Some(secs.parse().context("--play expects seconds")?);
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            _ => args.project = Some(PathBuf::from(arg)),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Vodon starting...");
    vodon_media::init();

    let config = AppConfig::load_or_default(&AppConfig::default_path())?;
    let settings = Settings::load_or_default(&Settings::default_path())?;
    let args = parse_args()?;

    let Some(project_path) = args.project else {
        println!("usage: vodon <project.json> [--play SECONDS]");
        return Ok(());
    };

    let mut store = load_project(&project_path)?;
    resolve_metadata(&mut store).await?;
    print_summary(&store);

    let mut session = AnnotationSession::new(
        MemoryReplicationServer::new(),
        config.collab.clone(),
        store.active_video().map(|v| v.name.clone()).unwrap_or_default(),
    );
    if store.active_video().is_some() {
        if let Err(err) = session.attach_with_retry().await {
            warn!(error = %err, "Reviewing without shared annotations");
        }
        load_active_bookmark(&store, &mut session, Instant::now());
        println!(
            "annotations: {:?}, {} shapes",
            session.status(),
            session.surface().shapes.len()
        );
    }

    if let Some(secs) = args.play_for {
        let shared = store.into_shared();
        let mut clock = PlaybackClock::new(shared.clone(), config.playback.clone());
        shared.write().start_playing();
        clear_on_play(&settings, &mut session, Instant::now());
        clock.sync();
        tokio::time::sleep(Duration::from_secs_f64(secs.clamp(0.0, 86_400.0))).await;
        shared.write().stop_playing();
        clock.sync();
        println!("playhead: {}", shared.read().current_time().to_hms());
    }

    session.detach().await.ok();
    if settings.show_setup_instructions {
        info!("Set offsets so that a shared event lines up, then recalculate");
    }
    Ok(())
}

fn load_project(path: &Path) -> Result<TimelineStore> {
    let file = ProjectFile::load_from_file(path)
        .with_context(|| format!("loading project {}", path.display()))?;
    let mut store = TimelineStore::new();
    store.load_snapshot(file.project);
    Ok(store)
}

/// Probe every reachable video whose duration is still unknown.
async fn resolve_metadata(store: &mut TimelineStore) -> Result<()> {
    let backend = FfprobeBackend;
    let pending: Vec<_> = store
        .videos()
        .iter()
        .filter(|v| !v.is_ready())
        .filter(|v| {
            let reachable = backend.exists(Path::new(&v.file_path));
            if !reachable {
                warn!(video = %v.id, path = %v.file_path, "Video file missing");
            }
            reachable
        })
        .map(|v| (v.id, PathBuf::from(&v.file_path)))
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let paths: Vec<PathBuf> = pending.iter().map(|(_, path)| path.clone()).collect();
    let results = tokio::task::spawn_blocking(move || probe_all(&FfprobeBackend, &paths)).await?;
    for ((id, _), (_, result)) in pending.into_iter().zip(results) {
        if let Ok(metadata) = result {
            store.apply_metadata(id, &metadata);
        }
    }
    Ok(())
}

fn print_summary(store: &TimelineStore) {
    let now = store.current_time();
    println!(
        "timeline: {} videos, length {}",
        store.videos().len(),
        store
            .max_duration()
            .map_or_else(|| "unknown".to_string(), |d| d.to_hms())
    );
    for video in store.videos() {
        let active = if store.active_video_id() == Some(video.id) {
            "*"
        } else {
            " "
        };
        let end = video
            .duration_normalised
            .map_or_else(|| "?".to_string(), |d| d.to_hms());
        let rate = video
            .frame_rate
            .map_or_else(|| "?".to_string(), |r| format!("{:.3}", r.to_fps_f64()));
        let frame = video
            .frame_rate
            .map(|r| video.local_time(now).to_frames(r))
            .unwrap_or(0);
        println!(
            "{active} {:<24} {} -> {}  {} fps  frame {:>6}  {} bookmarks{}",
            video.name,
            video.offset_normalised.to_hms(),
            end,
            rate,
            frame,
            video.bookmarks.len(),
            if video.covers(now) { "" } else { "  (off-span)" },
        );
    }
}
