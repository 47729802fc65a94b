//! Test doubles shared by unit tests.

use crate::clip::{Clip, ClipMeta, CropRegion, Frame, Layer, TextStyle, WriteOptions};
use crate::engine::MediaEngine;
use crate::probe::{AudioStream, SourceInfo, VideoStream};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use video_edit_mcp_common::error::{Error, ResolutionError, Result};

pub fn video_info(duration: f64, width: u32, height: u32, with_audio: bool) -> SourceInfo {
    SourceInfo {
        format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        duration,
        bit_rate: Some(1_000_000),
        size_bytes: Some(2_097_152),
        video: Some(VideoStream {
            codec: "h264".to_string(),
            width,
            height,
            fps: Some(24.0),
            nb_frames: Some((duration * 24.0) as u64),
            pix_fmt: Some("yuv420p".to_string()),
            bit_rate: Some(900_000),
        }),
        audio: with_audio.then(|| AudioStream {
            codec: "aac".to_string(),
            sample_rate: Some(44100),
            channels: Some(2),
            duration: Some(duration),
            bit_rate: Some(128_000),
        }),
    }
}

pub fn audio_info(duration: f64) -> SourceInfo {
    SourceInfo {
        video: None,
        format_name: "mp3".to_string(),
        ..video_info(duration, 0, 0, true)
    }
}

/// Engine that never decodes anything. Every call is counted so tests can
/// assert that rejected inputs never reach the engine.
#[derive(Default)]
pub struct MockEngine {
    sources: Mutex<HashMap<PathBuf, SourceInfo>>,
    calls: AtomicUsize,
    closed: AtomicUsize,
    writes: Mutex<Vec<(PathBuf, ClipMeta, WriteOptions)>>,
    write_gate: Option<Arc<Notify>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` openable with the given probe.
    pub fn with_source(self, path: impl Into<PathBuf>, info: SourceInfo) -> Self {
        self.sources
            .lock()
            .unwrap()
            .insert(path.into(), info);
        self
    }

    /// Make every `write` wait for a permit from `gate` before finishing.
    pub fn with_write_gate(mut self, gate: Arc<Notify>) -> Self {
        self.write_gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<(PathBuf, ClipMeta, WriteOptions)> {
        self.writes.lock().unwrap().clone()
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn open(&self, path: &Path) -> Result<Clip> {
        self.hit();
        let info = self
            .sources
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ResolutionError::unopenable(path, "No such file or directory"))?;
        Clip::source(path, info)
    }

    async fn open_image(&self, path: &Path) -> Result<Clip> {
        self.hit();
        if self.sources.lock().unwrap().contains_key(path) {
            Ok(Clip::image(path, 64, 64))
        } else {
            Err(ResolutionError::unopenable(path, "No such file or directory").into())
        }
    }

    fn close(&self, _clip: &Clip) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn subclip(&self, clip: &Clip, start: f64, end: f64) -> Result<Clip> {
        self.hit();
        clip.subclip(start, end)
    }

    fn resize(&self, clip: &Clip, width: u32, height: u32) -> Result<Clip> {
        self.hit();
        clip.resize(width, height)
    }

    fn crop(&self, clip: &Clip, region: CropRegion) -> Result<Clip> {
        self.hit();
        clip.crop(region)
    }

    fn rotate(&self, clip: &Clip, degrees: f64) -> Result<Clip> {
        self.hit();
        clip.rotate(degrees)
    }

    fn speed(&self, clip: &Clip, factor: f64) -> Result<Clip> {
        self.hit();
        clip.speed(factor)
    }

    fn set_audio(&self, video: &Clip, audio: &Clip) -> Result<Clip> {
        self.hit();
        video.set_audio(audio)
    }

    fn fade_in(&self, clip: &Clip, seconds: f64) -> Result<Clip> {
        self.hit();
        clip.fade_in(seconds)
    }

    fn fade_out(&self, clip: &Clip, seconds: f64) -> Result<Clip> {
        self.hit();
        clip.fade_out(seconds)
    }

    fn composite(&self, base: &Clip, layers: Vec<Layer>) -> Result<Clip> {
        self.hit();
        Clip::composite(base, layers)
    }

    fn concatenate(&self, clips: &[Clip]) -> Result<Clip> {
        self.hit();
        Clip::concatenate(clips)
    }

    fn desaturate(&self, clip: &Clip) -> Result<Clip> {
        self.hit();
        clip.desaturate()
    }

    fn flip_horizontal(&self, clip: &Clip) -> Result<Clip> {
        self.hit();
        clip.flip_horizontal()
    }

    async fn render_text(&self, style: &TextStyle) -> Result<Clip> {
        self.hit();
        let width = (style.text.chars().count() as u32 * style.font_size / 2).max(1);
        Ok(Clip::text("mock-text.png", style.text.clone(), width, style.font_size))
    }

    async fn write(&self, clip: &Clip, path: &Path, options: &WriteOptions) -> Result<()> {
        self.hit();
        if let Some(gate) = &self.write_gate {
            gate.notified().await;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"mock")?;
        self.writes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), *clip.meta(), options.clone()));
        Ok(())
    }

    async fn sample_frames(&self, clip: &Clip, fps: f64) -> Result<Vec<Frame>> {
        self.hit();
        let count = (clip.duration() * fps).floor() as usize;
        Ok((0..count)
            .map(|index| Frame {
                index,
                width: 2,
                height: 2,
                data: vec![0; 12],
            })
            .collect())
    }

    async fn write_frames(&self, clip: &Clip, fps: f64, folder: &Path) -> Result<Vec<PathBuf>> {
        self.hit();
        std::fs::create_dir_all(folder)?;
        let count = (clip.duration() * fps).floor() as usize;
        let mut paths = Vec::with_capacity(count);
        for i in 0..count {
            let path = folder.join(format!("frame_{:04}.png", i));
            std::fs::write(&path, b"png")?;
            paths.push(path);
        }
        Ok(paths)
    }

    async fn build_from_image_sequence(&self, folder: &Path, fps: f64) -> Result<Clip> {
        self.hit();
        let mut frames: Vec<PathBuf> = std::fs::read_dir(folder)
            .map_err(|e| ResolutionError::unopenable(folder, e.to_string()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();
        frames.sort();
        if frames.is_empty() {
            return Err(Error::engine("no image files found"));
        }
        Clip::image_sequence("mock-list.txt", frames, fps, 64, 48)
    }
}
