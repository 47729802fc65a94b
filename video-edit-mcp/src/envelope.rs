//! The uniform result every tool returns.

use crate::clip::Clip;
use crate::params::ValidationError;
use crate::probe::SourceInfo;
use crate::store::ObjectRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use video_edit_mcp_common::error::Error;

/// Tool result envelope.
///
/// On success exactly one output field is set (or `video_info` for
/// inspection); on failure only `error`, `error_type` and `message` are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_objects: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_info: Option<VideoInfo>,
}

impl ToolResponse {
    fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Result written to a file.
    pub fn path(path: &Path, message: &str) -> Self {
        Self {
            output_path: Some(path.display().to_string()),
            ..Self::ok(message)
        }
    }

    /// Result kept in the object store.
    pub fn object(reference: ObjectRef, message: &str) -> Self {
        Self {
            output_object: Some(reference.to_string()),
            ..Self::ok(message)
        }
    }

    pub fn paths(paths: &[PathBuf], message: &str) -> Self {
        Self {
            output_paths: Some(paths.iter().map(|p| p.display().to_string()).collect()),
            ..Self::ok(message)
        }
    }

    pub fn objects(references: &[ObjectRef], message: &str) -> Self {
        Self {
            output_objects: Some(references.iter().map(ToString::to_string).collect()),
            ..Self::ok(message)
        }
    }

    /// Metadata report.
    pub fn info(info: VideoInfo) -> Self {
        Self {
            success: true,
            video_info: Some(info),
            ..Self::default()
        }
    }

    /// Success that produces no output (e.g. releasing an object).
    pub fn done(message: &str) -> Self {
        Self::ok(message)
    }

    /// Failure raised while resolving, operating or emitting.
    pub fn failure(message: &str, error: &Error) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
            error: Some(error.to_string()),
            error_type: Some(error.kind().to_string()),
            ..Self::default()
        }
    }

    /// Failure raised by argument validation.
    pub fn invalid(errors: &[ValidationError]) -> Self {
        let message = errors
            .first()
            .map(|e| format!("Invalid {} parameter", e.field.replace('_', " ")))
            .unwrap_or_else(|| "Invalid parameters".to_string());
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        Self {
            success: false,
            message: Some(message),
            error: Some(details.join("; ")),
            error_type: Some("ValidationError".to_string()),
            ..Self::default()
        }
    }

    /// Serialize for an MCP text content block.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| serialization_failure(&e.to_string()))
    }
}

fn serialization_failure(error: &str) -> String {
    serde_json::json!({ "success": false, "error": error }).to_string()
}

/// Metadata report for `get_video_info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub file_path: Option<String>,
    pub filename: Option<String>,
    pub duration: f64,
    pub fps: Option<f64>,
    /// `[width, height]`.
    pub size: Option<[u32; 2]>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Width over height, two decimals.
    pub aspect_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nframes: Option<u64>,
    /// Overall bitrate in kb/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pix_fmt: Option<String>,
    pub has_audio: bool,
    pub audio_duration: Option<f64>,
    /// Audio sample rate in Hz.
    pub audio_fps: Option<u32>,
    pub audio_channels: Option<u32>,
    /// Audio bitrate in kb/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub file_size_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_bitrate_kbps: Option<f64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl VideoInfo {
    /// Report on `clip`. Codec and file details are only known for clips
    /// opened straight from a file.
    pub fn from_clip(clip: &Clip) -> Self {
        let meta = clip.meta();
        let mut info = VideoInfo {
            duration: meta.duration,
            fps: meta.fps,
            size: meta.size().map(|(w, h)| [w, h]),
            width: meta.width,
            height: meta.height,
            aspect_ratio: meta
                .size()
                .filter(|(_, h)| *h > 0)
                .map(|(w, h)| round2(w as f64 / h as f64)),
            has_audio: meta.has_audio,
            ..Self::default()
        };

        if let Some((path, source)) = clip.source_info() {
            info.apply_source(path, source);
        }

        if meta.duration > 0.0 {
            info.total_frames = meta.fps.map(|fps| (fps * meta.duration) as u64);
            info.average_bitrate_kbps = info
                .file_size_bytes
                .map(|bytes| round2(bytes as f64 * 8.0 / (meta.duration * 1000.0)));
        }
        info
    }

    fn apply_source(&mut self, path: &Path, source: &SourceInfo) {
        self.file_path = Some(path.display().to_string());
        self.filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
        self.bitrate = source.bit_rate.map(|b| b / 1000);
        self.file_size_bytes = source.size_bytes;
        self.file_size_mb = source
            .size_bytes
            .map(|b| round2(b as f64 / (1024.0 * 1024.0)));

        if let Some(video) = &source.video {
            self.nframes = video.nb_frames;
            self.codec = Some(video.codec.clone());
            self.pix_fmt = video.pix_fmt.clone();
        }
        if let Some(audio) = &source.audio {
            self.audio_duration = Some(audio.duration.unwrap_or(source.duration));
            self.audio_fps = audio.sample_rate;
            self.audio_channels = audio.channels;
            self.audio_bitrate = audio.bit_rate.map(|b| b / 1000);
            self.audio_codec = Some(audio.codec.clone());
        }
    }
}
