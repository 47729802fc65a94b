//! The media engine seam.
//!
//! Tools never touch codecs directly; they go through [`MediaEngine`].
//! Transformations are synchronous and lazy (they only extend the clip
//! graph), while opening, rendering and writing are asynchronous because
//! they run external processes.

use crate::clip::{Clip, CropRegion, Frame, Layer, TextStyle, WriteOptions};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use video_edit_mcp_common::error::Result;

/// Decoding, transformation and encoding backend.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Open a media file (video or audio).
    async fn open(&self, path: &Path) -> Result<Clip>;

    /// Open a still image.
    async fn open_image(&self, path: &Path) -> Result<Clip>;

    /// Release any temporary artifacts held by `clip`. Safe to call on
    /// clips that own nothing.
    fn close(&self, clip: &Clip);

    fn subclip(&self, clip: &Clip, start: f64, end: f64) -> Result<Clip>;

    fn resize(&self, clip: &Clip, width: u32, height: u32) -> Result<Clip>;

    fn crop(&self, clip: &Clip, region: CropRegion) -> Result<Clip>;

    /// Rotate counter-clockwise by `degrees`.
    fn rotate(&self, clip: &Clip, degrees: f64) -> Result<Clip>;

    fn speed(&self, clip: &Clip, factor: f64) -> Result<Clip>;

    fn set_audio(&self, video: &Clip, audio: &Clip) -> Result<Clip>;

    fn fade_in(&self, clip: &Clip, seconds: f64) -> Result<Clip>;

    fn fade_out(&self, clip: &Clip, seconds: f64) -> Result<Clip>;

    fn composite(&self, base: &Clip, layers: Vec<Layer>) -> Result<Clip>;

    fn concatenate(&self, clips: &[Clip]) -> Result<Clip>;

    fn desaturate(&self, clip: &Clip) -> Result<Clip>;

    fn flip_horizontal(&self, clip: &Clip) -> Result<Clip>;

    /// Rasterize text into an untimed clip with a transparent background.
    async fn render_text(&self, style: &TextStyle) -> Result<Clip>;

    /// Encode `clip` to `path`. The container follows the file extension.
    async fn write(&self, clip: &Clip, path: &Path, options: &WriteOptions) -> Result<()>;

    /// Decode `clip` at `fps` frames per second into memory.
    async fn sample_frames(&self, clip: &Clip, fps: f64) -> Result<Vec<Frame>>;

    /// Decode `clip` at `fps` into `frame_NNNN.png` files under `folder`.
    async fn write_frames(&self, clip: &Clip, fps: f64, folder: &Path) -> Result<Vec<PathBuf>>;

    /// Build a clip from the images in `folder`, in file name order.
    async fn build_from_image_sequence(&self, folder: &Path, fps: f64) -> Result<Clip>;
}
