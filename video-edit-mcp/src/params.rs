//! Tool parameter types and argument validation.
//!
//! Every parameter struct derives `JsonSchema` so the MCP tool list carries
//! its schema; doc comments on fields become the parameter descriptions.
//! `validate` runs before any clip is resolved, so a rejected call never
//! reaches the media engine.

use crate::store::Identifier;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Default font size for text overlays.
pub const DEFAULT_FONT_SIZE: i64 = 50;

/// Default text colour.
pub const DEFAULT_TEXT_COLOR: &str = "white";

/// Default ImageMagick executable.
pub const DEFAULT_IMAGEMAGICK: &str = "magick";

/// Default overlay opacity.
pub const DEFAULT_OPACITY: f64 = 1.0;

fn default_return_path() -> bool {
    true
}

fn default_font_size() -> i64 {
    DEFAULT_FONT_SIZE
}

fn default_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}

fn default_imagemagick() -> String {
    DEFAULT_IMAGEMAGICK.to_string()
}

fn default_opacity() -> f64 {
    DEFAULT_OPACITY
}

// =============================================================================
// Validation
// =============================================================================

/// Validation error details.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Accumulates validation failures for one call.
#[derive(Debug, Default)]
struct Checks(Vec<ValidationError>);

impl Checks {
    fn require(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.0.push(ValidationError::new(field, message));
        }
        self
    }

    fn identifier(&mut self, field: &str, value: &str) -> &mut Self {
        if let Err(e) = Identifier::parse(value) {
            let message = match e {
                video_edit_mcp_common::Error::Validation(m) => m,
                other => other.to_string(),
            };
            self.0.push(ValidationError::new(field, message));
        }
        self
    }

    fn non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        self.require(!value.trim().is_empty(), field, format!("{} cannot be empty", field))
    }

    fn positive(&mut self, field: &str, value: f64) -> &mut Self {
        self.require(
            value.is_finite() && value > 0.0,
            field,
            format!("{} must be greater than 0", field),
        )
    }

    fn time_range(&mut self, start: f64, end: f64) -> &mut Self {
        self.require(
            start.is_finite() && start >= 0.0,
            "start_time",
            "Start time must be non-negative",
        );
        self.require(
            end.is_finite() && end >= 0.0,
            "end_time",
            "End time must be non-negative",
        );
        self.require(start < end, "end_time", "Start time must be less than end time")
    }

    fn output(&mut self, output: &OutputParams) -> &mut Self {
        if output.return_path {
            self.non_empty("output_name", &output.output_name);
        }
        self
    }

    fn finish(&mut self) -> Result<(), Vec<ValidationError>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.0))
        }
    }
}

// =============================================================================
// Parameter Types
// =============================================================================

/// How a tool emits its result.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct OutputParams {
    /// Output file name, e.g. "trimmed_video.mp4". Only the file name is used;
    /// the file is written to the server's output directory. Required when
    /// return_path is true.
    #[serde(default)]
    pub output_name: String,
    /// true writes the result to output_name and returns its path. false keeps
    /// the result in memory and returns an obj:// reference that other tools
    /// accept in place of a path; use it when more edits follow. Default: true.
    #[serde(default = "default_return_path")]
    pub return_path: bool,
}

impl OutputParams {
    /// Write to `name` and return the path.
    pub fn to_path(name: impl Into<String>) -> Self {
        Self {
            output_name: name.into(),
            return_path: true,
        }
    }

    /// Keep the result in the object store.
    pub fn to_object() -> Self {
        Self {
            output_name: String::new(),
            return_path: false,
        }
    }
}

/// Parameters for inspecting a video.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct GetVideoInfoParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
}

impl GetVideoInfoParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("video_path", &self.video_path)
            .finish()
    }
}

/// Parameters for trimming a video.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct TrimVideoParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Start of the kept range, in seconds.
    pub start_time: f64,
    /// End of the kept range, in seconds.
    pub end_time: f64,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl TrimVideoParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("video_path", &self.video_path)
            .time_range(self.start_time, self.end_time)
            .output(&self.output)
            .finish()
    }
}

/// Parameters for joining two videos.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct MergeVideoParams {
    /// First video (file path or obj:// reference).
    pub video_path: String,
    /// Second video, played after the first.
    pub video_path2: String,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl MergeVideoParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("video_path", &self.video_path)
            .identifier("video_path2", &self.video_path2)
            .output(&self.output)
            .finish()
    }
}

/// Parameters for resizing a video.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ResizeVideoParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// New frame size as [width, height] in pixels.
    pub size: [i64; 2],
    #[serde(flatten)]
    pub output: OutputParams,
}

impl ResizeVideoParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let [width, height] = self.size;
        Checks::default()
            .identifier("video_path", &self.video_path)
            .require(
                width > 0 && height > 0 && width <= u32::MAX as i64 && height <= u32::MAX as i64,
                "size",
                "Width and height must be greater than 0",
            )
            .output(&self.output)
            .finish()
    }
}

/// Parameters for cropping a video.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CropVideoParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Left edge of the kept region, in pixels.
    pub x1: i64,
    /// Top edge of the kept region, in pixels.
    pub y1: i64,
    /// Right edge of the kept region (exclusive).
    pub x2: i64,
    /// Bottom edge of the kept region (exclusive).
    pub y2: i64,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl CropVideoParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let fits = |v: i64| v <= u32::MAX as i64;
        Checks::default()
            .identifier("video_path", &self.video_path)
            .require(
                self.x1 >= 0 && self.y1 >= 0,
                "x1",
                "Crop coordinates must be non-negative",
            )
            .require(
                self.x2 > self.x1 && fits(self.x2),
                "x2",
                "x2 must be greater than x1",
            )
            .require(
                self.y2 > self.y1 && fits(self.y2),
                "y2",
                "y2 must be greater than y1",
            )
            .output(&self.output)
            .finish()
    }
}

/// Parameters for rotating a video.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RotateVideoParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Counter-clockwise rotation in degrees; negative values turn clockwise.
    pub angle: f64,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl RotateVideoParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("video_path", &self.video_path)
            .require(self.angle.is_finite(), "angle", "Angle must be a finite number")
            .output(&self.output)
            .finish()
    }
}

/// Parameters for changing playback speed.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SpeedVideoParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Speed factor: 2.0 plays twice as fast, 0.5 at half speed.
    pub speed: f64,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl SpeedVideoParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("video_path", &self.video_path)
            .positive("speed", self.speed)
            .output(&self.output)
            .finish()
    }
}

/// Parameters for replacing a video's soundtrack.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct AddAudioParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Audio (or video with audio) file path or obj:// reference.
    pub audio_path: String,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl AddAudioParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("video_path", &self.video_path)
            .identifier("audio_path", &self.audio_path)
            .output(&self.output)
            .finish()
    }
}

/// Parameters for fading in or out.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct FadeVideoParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Length of the fade in seconds.
    pub fade_duration: f64,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl FadeVideoParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("video_path", &self.video_path)
            .positive("fade_duration", self.fade_duration)
            .output(&self.output)
            .finish()
    }
}

/// Parameters for drawing text over a video.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct TextOverlayParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Text to draw.
    pub text: String,
    /// Left edge of the text, in pixels.
    #[serde(default)]
    pub x: i64,
    /// Top edge of the text, in pixels.
    #[serde(default)]
    pub y: i64,
    /// Font size in points. Default: 50.
    #[serde(default = "default_font_size")]
    pub font_size: i64,
    /// Text colour name or #RRGGBB. Default: white.
    #[serde(default = "default_color")]
    pub color: String,
    /// Seconds the text stays visible, from the start of the video.
    pub duration: f64,
    /// ImageMagick executable used to render the text. Default: magick.
    #[serde(default = "default_imagemagick")]
    pub path_of_imagemagick: String,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl TextOverlayParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("video_path", &self.video_path)
            .non_empty("text", &self.text)
            .require(
                self.font_size > 0 && self.font_size <= u32::MAX as i64,
                "font_size",
                "font_size must be greater than 0",
            )
            .non_empty("color", &self.color)
            .positive("duration", self.duration)
            .non_empty("path_of_imagemagick", &self.path_of_imagemagick)
            .output(&self.output)
            .finish()
    }
}

/// Parameters for drawing an image over a video.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ImageOverlayParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Image file to draw (PNG transparency is kept).
    pub image_path: String,
    /// Left edge of the image, in pixels.
    #[serde(default)]
    pub x: i64,
    /// Top edge of the image, in pixels.
    #[serde(default)]
    pub y: i64,
    /// Seconds the image stays visible, from the start of the video.
    pub duration: f64,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl ImageOverlayParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("video_path", &self.video_path)
            .non_empty("image_path", &self.image_path)
            .positive("duration", self.duration)
            .output(&self.output)
            .finish()
    }
}

/// Parameters for whole-frame filters (grayscale, mirror).
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct VideoFilterParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl VideoFilterParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("video_path", &self.video_path)
            .output(&self.output)
            .finish()
    }
}

/// Parameters for building a video from still images.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ImagesToVideoParams {
    /// Folder containing the images; they are played in file name order.
    pub images_folder_path: String,
    /// Frames (images) per second.
    pub fps: f64,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl ImagesToVideoParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .non_empty("images_folder_path", &self.images_folder_path)
            .positive("fps", self.fps)
            .output(&self.output)
            .finish()
    }
}

/// Parameters for extracting frames.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ExtractFramesParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Start of the sampled range, in seconds.
    pub start_time: f64,
    /// End of the sampled range, in seconds.
    pub end_time: f64,
    /// Frames sampled per second.
    pub fps: f64,
    /// Folder name for the PNG files (frame_0000.png, ...). Only the last
    /// path component is used. Required when return_path is true.
    #[serde(default)]
    pub output_folder_name: String,
    /// true writes PNG files and returns the folder; false keeps the decoded
    /// frames in memory and returns an obj:// reference. Default: true.
    #[serde(default = "default_return_path")]
    pub return_path: bool,
}

impl ExtractFramesParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut checks = Checks::default();
        checks
            .identifier("video_path", &self.video_path)
            .time_range(self.start_time, self.end_time)
            .positive("fps", self.fps);
        if self.return_path {
            checks.non_empty("output_folder_name", &self.output_folder_name);
        }
        checks.finish()
    }
}

/// Parameters for splitting a video.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SplitVideoParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Cut points in seconds, strictly increasing and inside the video.
    /// N cut points produce N+1 parts; an empty list yields one part
    /// covering the whole clip.
    pub split_times: Vec<f64>,
    /// Base output name; parts are written as <stem>_part_<n>.<ext>.
    #[serde(flatten)]
    pub output: OutputParams,
}

impl SplitVideoParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let increasing = self.split_times.windows(2).all(|w| w[0] < w[1]);
        let finite = self.split_times.iter().all(|t| t.is_finite() && *t > 0.0);
        Checks::default()
            .identifier("video_path", &self.video_path)
            .require(
                finite && increasing,
                "split_times",
                "Split times must be positive and strictly increasing",
            )
            .output(&self.output)
            .finish()
    }

    /// Check the cut points against the clip they will split.
    pub fn validate_against(&self, duration: f64) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .require(
                self.split_times.iter().all(|t| *t < duration),
                "split_times",
                format!("Split times must be less than the video duration ({:.3}s)", duration),
            )
            .finish()
    }
}

/// Parameters for re-encoding a video.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ConvertFormatParams {
    /// Video file path or obj:// reference.
    pub video_path: String,
    /// Video codec, e.g. "libx264", "libx265", "libvpx-vp9", "mpeg4".
    pub codec: String,
    /// Output frame rate. Default: keep the source rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    /// Video bitrate, e.g. "2M" or "800k".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl ConvertFormatParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut checks = Checks::default();
        checks
            .identifier("video_path", &self.video_path)
            .non_empty("codec", &self.codec);
        if let Some(fps) = self.fps {
            checks.positive("fps", fps);
        }
        if let Some(bitrate) = &self.bitrate {
            checks.non_empty("bitrate", bitrate);
        }
        checks.output(&self.output).finish()
    }
}

/// Parameters for picture-in-picture.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct VideoOverlayParams {
    /// Background video (file path or obj:// reference).
    pub base_video_path: String,
    /// Video drawn on top.
    pub overlay_video_path: String,
    /// Left edge of the overlay, in pixels.
    #[serde(default)]
    pub x: i64,
    /// Top edge of the overlay, in pixels.
    #[serde(default)]
    pub y: i64,
    /// Overlay opacity from 0 (invisible) to 1 (opaque). Default: 1.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Seconds the overlay stays visible, from the start of the base video.
    pub duration: f64,
    #[serde(flatten)]
    pub output: OutputParams,
}

impl VideoOverlayParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Checks::default()
            .identifier("base_video_path", &self.base_video_path)
            .identifier("overlay_video_path", &self.overlay_video_path)
            .require(
                (0.0..=1.0).contains(&self.opacity),
                "opacity",
                "Opacity must be between 0 and 1",
            )
            .positive("duration", self.duration)
            .output(&self.output)
            .finish()
    }
}

/// Parameters for dropping a stored object.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ReleaseObjectParams {
    /// obj:// reference returned by an earlier call.
    pub reference: String,
}

impl ReleaseObjectParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut checks = Checks::default();
        match Identifier::parse(&self.reference) {
            Ok(Identifier::Reference(_)) => {}
            Ok(Identifier::Path(_)) => {
                checks.require(false, "reference", "Expected an obj:// reference");
            }
            Err(_) => {
                checks.identifier("reference", &self.reference);
            }
        }
        checks.finish()
    }
}

#[cfg(test)]
#[path = "params_test.rs"]
mod params_test;
