//! Media probing results.
//!
//! [`SourceInfo`] is what the engine learns about a file when it is opened;
//! it is parsed from `ffprobe -print_format json -show_format -show_streams`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use video_edit_mcp_common::error::{Error, Result};

/// Container-level facts plus the first video and audio streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Container format, as ffprobe names it.
    pub format_name: String,
    /// Duration in seconds.
    pub duration: f64,
    /// Overall bitrate in bits per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,
    /// File size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoStream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioStream>,
}

/// First video stream of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStream {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nb_frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_fmt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,
}

/// First audio stream of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStream {
    pub codec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,
}

impl SourceInfo {
    /// Parse ffprobe's JSON output.
    pub fn from_ffprobe(json: &Value) -> Result<Self> {
        let format = json
            .get("format")
            .ok_or_else(|| Error::engine("ffprobe output missing 'format' field"))?;

        let format_name = format
            .get("format_name")
            .and_then(|f| f.as_str())
            .unwrap_or("unknown")
            .to_string();

        let streams = json
            .get("streams")
            .and_then(|s| s.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        let video = streams
            .iter()
            .filter(|s| codec_type(s) == Some("video"))
            .find_map(parse_video);
        let audio = streams
            .iter()
            .find(|s| codec_type(s) == Some("audio"))
            .map(parse_audio);

        // Stills report no container duration.
        let duration = number(format, "duration")
            .or_else(|| audio.as_ref().and_then(|a| a.duration))
            .unwrap_or(0.0);

        Ok(Self {
            format_name,
            duration,
            bit_rate: number(format, "bit_rate").map(|b| b as u64),
            size_bytes: number(format, "size").map(|s| s as u64),
            video,
            audio,
        })
    }
}

fn codec_type(stream: &Value) -> Option<&str> {
    stream.get("codec_type").and_then(|c| c.as_str())
}

fn codec_name(stream: &Value) -> String {
    stream
        .get("codec_name")
        .and_then(|c| c.as_str())
        .unwrap_or("unknown")
        .to_string()
}

fn parse_video(stream: &Value) -> Option<VideoStream> {
    let width = stream.get("width").and_then(|w| w.as_u64())? as u32;
    let height = stream.get("height").and_then(|h| h.as_u64())? as u32;
    let fps = ["avg_frame_rate", "r_frame_rate"]
        .iter()
        .filter_map(|key| stream.get(*key).and_then(|r| r.as_str()))
        .find_map(parse_rational);

    Some(VideoStream {
        codec: codec_name(stream),
        width,
        height,
        fps,
        nb_frames: number(stream, "nb_frames").map(|n| n as u64),
        pix_fmt: stream
            .get("pix_fmt")
            .and_then(|p| p.as_str())
            .map(str::to_string),
        bit_rate: number(stream, "bit_rate").map(|b| b as u64),
    })
}

fn parse_audio(stream: &Value) -> AudioStream {
    AudioStream {
        codec: codec_name(stream),
        sample_rate: number(stream, "sample_rate").map(|r| r as u32),
        channels: stream
            .get("channels")
            .and_then(|c| c.as_u64())
            .map(|c| c as u32),
        duration: number(stream, "duration"),
        bit_rate: number(stream, "bit_rate").map(|b| b as u64),
    }
}

/// ffprobe prints most numbers as strings.
fn number(object: &Value, key: &str) -> Option<f64> {
    let value: Option<f64> = match object.get(key)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

/// Parse `"30000/1001"` style frame rates. `"0/0"` means unknown.
pub fn parse_rational(value: &str) -> Option<f64> {
    let (num, den) = match value.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (value.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}
