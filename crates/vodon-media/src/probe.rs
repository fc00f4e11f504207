//! Media file probing to get metadata without full decode.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};
use vodon_core::{FrameRate, RationalTime, Result, VodonError};

/// The subset of probe output the review engine needs for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Container duration
    pub duration: RationalTime,
    /// Nominal frame rate of the primary video stream
    pub frame_rate: FrameRate,
    /// Coded width in pixels
    pub coded_width: u32,
    /// Display aspect ratio as width / height
    pub display_aspect_ratio: f64,
}

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File path
    pub path: String,
    /// Duration
    pub duration: Option<RationalTime>,
    /// Video streams
    pub video_streams: Vec<VideoStreamInfo>,
    /// Audio streams
    pub audio_streams: Vec<AudioStreamInfo>,
    /// Container format
    pub format: String,
}

/// Information about a video stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub index: usize,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub coded_width: u32,
    pub frame_rate: Option<FrameRate>,
    pub display_aspect_ratio: Option<f64>,
    pub duration: Option<RationalTime>,
}

/// Information about an audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
}

// ffprobe `-of json` output, every field optional.
#[derive(Debug, Deserialize)]
struct RawProbe {
    #[serde(default)]
    streams: Vec<RawStream>,
    format: Option<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    #[serde(default)]
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    coded_width: Option<u32>,
    display_aspect_ratio: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

impl MediaProbe {
    /// Probe a media file with ffprobe.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        if !path.exists() {
            return Err(VodonError::NotFound(format!(
                "File not found: {}",
                path_str
            )));
        }

        let output = Command::new(ffmpeg_sidecar::ffprobe::ffprobe_path())
            .args(["-v", "error", "-show_streams", "-show_format", "-of", "json"])
            .arg(path)
            .output()?;

        if !output.status.success() {
            return Err(VodonError::Probe(format!(
                "ffprobe failed for {}: {}",
                path_str,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        debug!(path = %path_str, bytes = output.stdout.len(), "ffprobe finished");
        Self::from_ffprobe_json(&path_str, &output.stdout)
    }

    /// Parse ffprobe JSON output.
    pub fn from_ffprobe_json(path: &str, data: &[u8]) -> Result<Self> {
        let raw: RawProbe = serde_json::from_slice(data)
            .map_err(|e| VodonError::Probe(format!("Invalid ffprobe output: {}", e)))?;

        let mut video_streams = Vec::new();
        let mut audio_streams = Vec::new();

        for stream in raw.streams {
            match stream.codec_type.as_deref() {
                Some("video") => {
                    let width = stream.width.unwrap_or(0);
                    let height = stream.height.unwrap_or(0);
                    let frame_rate = stream
                        .r_frame_rate
                        .as_deref()
                        .and_then(FrameRate::parse)
                        .or_else(|| stream.avg_frame_rate.as_deref().and_then(FrameRate::parse));
                    let display_aspect_ratio = stream
                        .display_aspect_ratio
                        .as_deref()
                        .and_then(parse_ratio)
                        .or_else(|| (height > 0).then(|| width as f64 / height as f64));

                    video_streams.push(VideoStreamInfo {
                        index: stream.index,
                        codec: stream.codec_name.unwrap_or_default(),
                        width,
                        height,
                        coded_width: stream.coded_width.unwrap_or(width),
                        frame_rate,
                        display_aspect_ratio,
                        duration: stream.duration.as_deref().and_then(parse_seconds),
                    });
                }
                Some("audio") => audio_streams.push(AudioStreamInfo {
                    index: stream.index,
                    codec: stream.codec_name.unwrap_or_default(),
                    sample_rate: stream
                        .sample_rate
                        .as_deref()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0),
                    channels: stream.channels.unwrap_or(0),
                }),
                _ => {}
            }
        }

        let format = raw.format;
        let duration = format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(parse_seconds)
            .or_else(|| video_streams.first().and_then(|v| v.duration));

        Ok(Self {
            path: path.to_string(),
            duration,
            video_streams,
            audio_streams,
            format: format.and_then(|f| f.format_name).unwrap_or_default(),
        })
    }

    /// Check if the file has video.
    pub fn has_video(&self) -> bool {
        !self.video_streams.is_empty()
    }

    /// Check if the file has audio.
    pub fn has_audio(&self) -> bool {
        !self.audio_streams.is_empty()
    }

    /// Get the primary video stream info.
    pub fn primary_video(&self) -> Option<&VideoStreamInfo> {
        self.video_streams.first()
    }

    /// Get the primary audio stream info.
    pub fn primary_audio(&self) -> Option<&AudioStreamInfo> {
        self.audio_streams.first()
    }

    /// Reduce to the metadata the timeline needs. Fails when the file has no
    /// video stream, no usable frame rate, or no duration.
    pub fn metadata(&self) -> Result<VideoMetadata> {
        let video = self
            .primary_video()
            .ok_or_else(|| VodonError::Media(format!("No video stream in {}", self.path)))?;
        let frame_rate = video
            .frame_rate
            .ok_or_else(|| VodonError::Media(format!("No frame rate for {}", self.path)))?;
        let duration = self
            .duration
            .ok_or_else(|| VodonError::Media(format!("No duration for {}", self.path)))?;

        Ok(VideoMetadata {
            duration,
            frame_rate,
            coded_width: video.coded_width,
            display_aspect_ratio: video.display_aspect_ratio.unwrap_or(16.0 / 9.0),
        })
    }
}

fn parse_seconds(text: &str) -> Option<RationalTime> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(RationalTime::from_seconds_f64)
}

fn parse_ratio(text: &str) -> Option<f64> {
    let (w, h) = text.split_once(':')?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    (w > 0.0 && h > 0.0).then(|| w / h)
}

/// Metadata source for video files.
pub trait MediaBackend: Sync {
    /// Whether the file is still reachable.
    fn exists(&self, path: &Path) -> bool;

    /// Single-shot metadata query.
    fn probe(&self, path: &Path) -> Result<VideoMetadata>;
}

/// `MediaBackend` backed by the ffprobe executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfprobeBackend;

impl MediaBackend for FfprobeBackend {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        MediaProbe::probe(path)?.metadata()
    }
}

/// Probe several files in parallel. Results keep the input order; failures
/// are logged and returned per file.
pub fn probe_all<B: MediaBackend>(
    backend: &B,
    paths: &[PathBuf],
) -> Vec<(PathBuf, Result<VideoMetadata>)> {
    paths
        .par_iter()
        .map(|path| {
            let result = backend.probe(path);
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "Probe failed");
            }
            (path.clone(), result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "coded_width": 1920,
                "display_aspect_ratio": "16:9",
                "r_frame_rate": "30000/1001",
                "duration": "120.100000"
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "sample_rate": "48000",
                "channels": 2
            }
        ],
        "format": { "format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "120.500000" }
    }"#;

    #[test]
    fn test_parse_ffprobe_output() {
        let probe = MediaProbe::from_ffprobe_json("a.mp4", SAMPLE.as_bytes()).unwrap();
        assert!(probe.has_video());
        assert!(probe.has_audio());
        assert_eq!(probe.primary_audio().unwrap().sample_rate, 48000);

        let meta = probe.metadata().unwrap();
        assert_eq!(meta.frame_rate, FrameRate::FPS_29_97);
        assert_eq!(meta.duration, RationalTime::new(241, 2));
        assert_eq!(meta.coded_width, 1920);
        assert!((meta.display_aspect_ratio - 16.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = r#"{"streams":[{"codec_type":"video","width":640,"height":480,"r_frame_rate":"25/1","duration":"10.0"}]}"#;
        let meta = MediaProbe::from_ffprobe_json("b.mp4", json.as_bytes())
            .unwrap()
            .metadata()
            .unwrap();
        assert_eq!(meta.duration, RationalTime::from_secs(10));
        assert_eq!(meta.coded_width, 640);
        assert!((meta.display_aspect_ratio - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_audio_only_has_no_metadata() {
        let json = r#"{"streams":[{"codec_type":"audio"}],"format":{"duration":"3.0"}}"#;
        let probe = MediaProbe::from_ffprobe_json("c.m4a", json.as_bytes()).unwrap();
        assert!(probe.metadata().is_err());
    }

    #[test]
    fn test_garbage_is_probe_error() {
        let result = MediaProbe::from_ffprobe_json("d.mp4", b"not json");
        assert!(matches!(result, Err(VodonError::Probe(_))));
    }

    #[test]
    fn test_missing_file_not_found() {
        let result = MediaProbe::probe("/definitely/not/here.mp4");
        assert!(matches!(result, Err(VodonError::NotFound(_))));
    }

    struct FixedBackend;

    impl MediaBackend for FixedBackend {
        fn exists(&self, _path: &Path) -> bool {
            true
        }

        fn probe(&self, path: &Path) -> Result<VideoMetadata> {
            if path.ends_with("bad.mp4") {
                return Err(VodonError::Probe("unreadable".into()));
            }
            Ok(VideoMetadata {
                duration: RationalTime::from_secs(5),
                frame_rate: FrameRate::FPS_25,
                coded_width: 1280,
                display_aspect_ratio: 16.0 / 9.0,
            })
        }
    }

    #[test]
    fn test_probe_all_keeps_order() {
        let paths = vec![
            PathBuf::from("one.mp4"),
            PathBuf::from("bad.mp4"),
            PathBuf::from("three.mp4"),
        ];
        let results = probe_all(&FixedBackend, &paths);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, paths[0]);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
    }
}
