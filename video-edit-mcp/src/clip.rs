//! Clip model shared by every media engine.
//!
//! A [`Clip`] is an immutable edit graph: leaves are sources (media files,
//! still images, rendered text, image sequences) and inner nodes are
//! transformations. Nothing is decoded while a clip is being built; each
//! builder only checks that the operation makes sense and derives the new
//! [`ClipMeta`]. Cloning a clip shares the graph.

use crate::probe::SourceInfo;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use video_edit_mcp_common::error::{Error, Result};

/// Tolerance used when comparing timestamps against a clip's duration.
pub const TIME_EPSILON: f64 = 1e-3;

/// Metadata every clip carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipMeta {
    /// Duration in seconds (0 for untimed stills).
    pub duration: f64,
    /// Frames per second, when known.
    pub fps: Option<f64>,
    /// Frame width in pixels (video only).
    pub width: Option<u32>,
    /// Frame height in pixels (video only).
    pub height: Option<u32>,
    /// Whether the clip has a picture.
    pub has_video: bool,
    /// Whether the clip has sound.
    pub has_audio: bool,
}

impl ClipMeta {
    /// Width and height, when the clip has a picture of known size.
    pub fn size(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

/// A positioned, time-limited layer composited over a base clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub clip: Clip,
    pub x: i64,
    pub y: i64,
    /// Time on the base clip when the layer appears.
    pub start: f64,
    /// How long the layer stays visible.
    pub duration: f64,
    /// Alpha multiplier in `[0, 1]`.
    pub opacity: f64,
}

impl Layer {
    /// A fully opaque layer shown from the start of the base clip.
    pub fn new(clip: Clip, x: i64, y: i64, duration: f64) -> Self {
        Self {
            clip,
            x,
            y,
            start: 0.0,
            duration,
            opacity: 1.0,
        }
    }

    /// Set the layer opacity.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

/// Crop rectangle, corners inclusive-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRegion {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }
}

/// Node of the edit graph.
#[derive(Debug, PartialEq)]
pub enum ClipNode {
    /// A probed media file.
    Source { path: PathBuf, info: SourceInfo },
    /// A still image, looped for as long as it is shown.
    Image { path: PathBuf },
    /// Text rendered to a transparent image owned by the clip.
    Text { image: PathBuf, text: String },
    /// Ordered image files played back at a fixed rate.
    ImageSequence {
        list_file: PathBuf,
        frames: Vec<PathBuf>,
        fps: f64,
    },
    Subclip { input: Clip, start: f64, end: f64 },
    Resize { input: Clip, width: u32, height: u32 },
    Crop { input: Clip, region: CropRegion },
    Rotate { input: Clip, degrees: f64 },
    Speed { input: Clip, factor: f64 },
    SetAudio { video: Clip, audio: Clip },
    FadeIn { input: Clip, seconds: f64 },
    FadeOut { input: Clip, seconds: f64 },
    Desaturate { input: Clip },
    FlipHorizontal { input: Clip },
    Concatenate { clips: Vec<Clip> },
    Composite { base: Clip, layers: Vec<Layer> },
}

/// Handle to audio/video content.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    node: Arc<ClipNode>,
    meta: ClipMeta,
}

impl Clip {
    fn derive(node: ClipNode, meta: ClipMeta) -> Self {
        Self {
            node: Arc::new(node),
            meta,
        }
    }

    /// The graph node this clip was built from.
    pub fn node(&self) -> &ClipNode {
        &self.node
    }

    /// Clip metadata.
    pub fn meta(&self) -> &ClipMeta {
        &self.meta
    }

    pub fn duration(&self) -> f64 {
        self.meta.duration
    }

    /// Whether two handles share the same graph node.
    pub fn same_graph(&self, other: &Clip) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Probe information when this clip is an unmodified media file.
    pub fn source_info(&self) -> Option<(&Path, &SourceInfo)> {
        match self.node() {
            ClipNode::Source { path, info } => Some((path, info)),
            _ => None,
        }
    }

    /// Temporary files owned by this node (rendered text, sequence lists).
    pub fn artifacts(&self) -> Vec<&Path> {
        match self.node() {
            ClipNode::Text { image, .. } => vec![image.as_path()],
            ClipNode::ImageSequence { list_file, .. } => vec![list_file.as_path()],
            _ => Vec::new(),
        }
    }

    // =========================================================================
    // Leaves
    // =========================================================================

    /// A media file described by its probe.
    pub fn source(path: impl Into<PathBuf>, info: SourceInfo) -> Result<Self> {
        let path = path.into();
        if info.video.is_none() && info.audio.is_none() {
            return Err(Error::engine(format!(
                "'{}' has no audio or video streams",
                path.display()
            )));
        }
        let meta = ClipMeta {
            duration: info.duration,
            fps: info.video.as_ref().and_then(|v| v.fps),
            width: info.video.as_ref().map(|v| v.width),
            height: info.video.as_ref().map(|v| v.height),
            has_video: info.video.is_some(),
            has_audio: info.audio.is_some(),
        };
        Ok(Self::derive(ClipNode::Source { path, info }, meta))
    }

    /// An untimed still image.
    pub fn image(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self::derive(ClipNode::Image { path: path.into() }, still_meta(width, height))
    }

    /// Text already rendered to `image`.
    pub fn text(image: impl Into<PathBuf>, text: impl Into<String>, width: u32, height: u32) -> Self {
        Self::derive(
            ClipNode::Text {
                image: image.into(),
                text: text.into(),
            },
            still_meta(width, height),
        )
    }

    /// Image files played back at `fps`.
    pub fn image_sequence(
        list_file: impl Into<PathBuf>,
        frames: Vec<PathBuf>,
        fps: f64,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::engine("image sequence contains no images"));
        }
        if fps <= 0.0 || !fps.is_finite() {
            return Err(Error::engine(format!("invalid frame rate {}", fps)));
        }
        let meta = ClipMeta {
            duration: frames.len() as f64 / fps,
            fps: Some(fps),
            width: Some(width),
            height: Some(height),
            has_video: true,
            has_audio: false,
        };
        Ok(Self::derive(
            ClipNode::ImageSequence {
                list_file: list_file.into(),
                frames,
                fps,
            },
            meta,
        ))
    }

    // =========================================================================
    // Transformations
    // =========================================================================

    /// The part of the clip between `start` and `end` seconds.
    pub fn subclip(&self, start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start >= end {
            return Err(Error::engine(format!(
                "invalid subclip range {}..{}",
                start, end
            )));
        }
        if end > self.meta.duration + TIME_EPSILON {
            return Err(Error::engine(format!(
                "subclip end {} exceeds clip duration {}",
                end, self.meta.duration
            )));
        }
        let end = end.min(self.meta.duration);
        let meta = ClipMeta {
            duration: end - start,
            ..self.meta
        };
        Ok(Self::derive(
            ClipNode::Subclip {
                input: self.clone(),
                start,
                end,
            },
            meta,
        ))
    }

    /// Scale every frame to `width`x`height`.
    pub fn resize(&self, width: u32, height: u32) -> Result<Self> {
        self.require_video("resize")?;
        if width == 0 || height == 0 {
            return Err(Error::engine(format!("invalid size {}x{}", width, height)));
        }
        let meta = ClipMeta {
            width: Some(width),
            height: Some(height),
            ..self.meta
        };
        Ok(Self::derive(
            ClipNode::Resize {
                input: self.clone(),
                width,
                height,
            },
            meta,
        ))
    }

    /// Keep only `region` of every frame.
    pub fn crop(&self, region: CropRegion) -> Result<Self> {
        self.require_video("crop")?;
        if region.x2 <= region.x1 || region.y2 <= region.y1 {
            return Err(Error::engine(format!("empty crop region {:?}", region)));
        }
        if let Some((width, height)) = self.meta.size() {
            if region.x2 > width || region.y2 > height {
                return Err(Error::engine(format!(
                    "crop region ({},{})-({},{}) exceeds frame size {}x{}",
                    region.x1, region.y1, region.x2, region.y2, width, height
                )));
            }
        }
        let meta = ClipMeta {
            width: Some(region.width()),
            height: Some(region.height()),
            ..self.meta
        };
        Ok(Self::derive(
            ClipNode::Crop {
                input: self.clone(),
                region,
            },
            meta,
        ))
    }

    /// Rotate counter-clockwise by `degrees`, growing the frame to fit.
    pub fn rotate(&self, degrees: f64) -> Result<Self> {
        self.require_video("rotate")?;
        if !degrees.is_finite() {
            return Err(Error::engine("rotation angle must be finite"));
        }
        let (width, height) = match self.meta.size() {
            Some((w, h)) => {
                let (w2, h2) = rotated_size(w, h, degrees);
                (Some(w2), Some(h2))
            }
            None => (None, None),
        };
        let meta = ClipMeta {
            width,
            height,
            ..self.meta
        };
        Ok(Self::derive(
            ClipNode::Rotate {
                input: self.clone(),
                degrees,
            },
            meta,
        ))
    }

    /// Play back `factor` times faster.
    pub fn speed(&self, factor: f64) -> Result<Self> {
        if factor <= 0.0 || !factor.is_finite() {
            return Err(Error::engine(format!("invalid speed factor {}", factor)));
        }
        let meta = ClipMeta {
            duration: self.meta.duration / factor,
            ..self.meta
        };
        Ok(Self::derive(
            ClipNode::Speed {
                input: self.clone(),
                factor,
            },
            meta,
        ))
    }

    /// Replace the soundtrack with `audio`'s, cut to this clip's length.
    pub fn set_audio(&self, audio: &Clip) -> Result<Self> {
        self.require_video("set audio on")?;
        if !audio.meta.has_audio {
            return Err(Error::engine("audio source has no audio stream"));
        }
        let meta = ClipMeta {
            has_audio: true,
            ..self.meta
        };
        Ok(Self::derive(
            ClipNode::SetAudio {
                video: self.clone(),
                audio: audio.clone(),
            },
            meta,
        ))
    }

    /// Fade the picture in from black over `seconds`.
    pub fn fade_in(&self, seconds: f64) -> Result<Self> {
        self.require_video("fade")?;
        check_positive("fade duration", seconds)?;
        Ok(Self::derive(
            ClipNode::FadeIn {
                input: self.clone(),
                seconds,
            },
            self.meta,
        ))
    }

    /// Fade the picture out to black over the last `seconds`.
    pub fn fade_out(&self, seconds: f64) -> Result<Self> {
        self.require_video("fade")?;
        check_positive("fade duration", seconds)?;
        Ok(Self::derive(
            ClipNode::FadeOut {
                input: self.clone(),
                seconds,
            },
            self.meta,
        ))
    }

    /// Drop colour saturation. Applying it twice is the same as once.
    pub fn desaturate(&self) -> Result<Self> {
        self.require_video("desaturate")?;
        if matches!(self.node(), ClipNode::Desaturate { .. }) {
            return Ok(self.clone());
        }
        Ok(Self::derive(
            ClipNode::Desaturate { input: self.clone() },
            self.meta,
        ))
    }

    /// Mirror every frame left to right.
    pub fn flip_horizontal(&self) -> Result<Self> {
        self.require_video("mirror")?;
        Ok(Self::derive(
            ClipNode::FlipHorizontal { input: self.clone() },
            self.meta,
        ))
    }

    /// Play `clips` back to back. Later clips are scaled to the first
    /// clip's frame size.
    pub fn concatenate(clips: &[Clip]) -> Result<Self> {
        let first = clips
            .first()
            .ok_or_else(|| Error::engine("nothing to concatenate"))?;
        if let Some(bad) = clips.iter().position(|c| !c.meta.has_video) {
            return Err(Error::engine(format!(
                "clip {} has no video stream and cannot be concatenated",
                bad + 1
            )));
        }
        let fps = clips
            .iter()
            .filter_map(|c| c.meta.fps)
            .fold(None, |acc: Option<f64>, f| Some(acc.map_or(f, |a| a.max(f))));
        let meta = ClipMeta {
            duration: clips.iter().map(|c| c.meta.duration).sum(),
            fps,
            width: first.meta.width,
            height: first.meta.height,
            has_video: true,
            has_audio: clips.iter().any(|c| c.meta.has_audio),
        };
        Ok(Self::derive(
            ClipNode::Concatenate {
                clips: clips.to_vec(),
            },
            meta,
        ))
    }

    /// Draw `layers` over `base`, in order. The result keeps the base
    /// clip's duration and frame size.
    pub fn composite(base: &Clip, layers: Vec<Layer>) -> Result<Self> {
        base.require_video("composite over")?;
        for layer in &layers {
            if !layer.clip.meta.has_video {
                return Err(Error::engine("overlay layer has no picture"));
            }
            check_positive("overlay duration", layer.duration)?;
            if !(0.0..=1.0).contains(&layer.opacity) {
                return Err(Error::engine(format!(
                    "overlay opacity {} outside [0, 1]",
                    layer.opacity
                )));
            }
        }
        let meta = ClipMeta {
            has_audio: base.meta.has_audio || layers.iter().any(|l| l.clip.meta.has_audio),
            ..base.meta
        };
        Ok(Self::derive(
            ClipNode::Composite {
                base: base.clone(),
                layers,
            },
            meta,
        ))
    }

    fn require_video(&self, action: &str) -> Result<()> {
        if self.meta.has_video {
            Ok(())
        } else {
            Err(Error::engine(format!(
                "cannot {} a clip without a video stream",
                action
            )))
        }
    }
}

fn still_meta(width: u32, height: u32) -> ClipMeta {
    ClipMeta {
        duration: 0.0,
        fps: None,
        width: Some(width),
        height: Some(height),
        has_video: true,
        has_audio: false,
    }
}

fn check_positive(what: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::engine(format!("{} must be positive, got {}", what, value)))
    }
}

/// Frame size after rotating a `width`x`height` frame by `degrees`,
/// rounded up to even numbers so common encoders accept it.
pub fn rotated_size(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let w = width as f64 * cos + height as f64 * sin;
    let h = width as f64 * sin + height as f64 * cos;
    (even(w), even(h))
}

fn even(value: f64) -> u32 {
    // Trig noise (e.g. cos(90°) ≈ 6e-17) must not bump a dimension up.
    let n = (value - 1e-6).ceil().max(2.0) as u32;
    n + n % 2
}

/// One decoded RGB24 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position in the sampled sequence, from 0.
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes, row-major RGB.
    pub data: Vec<u8>,
}

/// Encoder settings for [`crate::engine::MediaEngine::write`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    /// Video codec, e.g. `libx264`, `libvpx-vp9`, `mpeg4`.
    pub codec: Option<String>,
    /// Output frame rate.
    pub fps: Option<f64>,
    /// Video bitrate, e.g. `2M`, `800k`.
    pub bitrate: Option<String>,
}

/// Text rendering request for [`crate::engine::MediaEngine::render_text`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub text: String,
    pub font_size: u32,
    pub color: String,
    /// ImageMagick executable used to rasterize the text.
    pub renderer: PathBuf,
}
