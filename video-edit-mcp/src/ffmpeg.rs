//! [`MediaEngine`] backed by the `ffmpeg`/`ffprobe` command line tools.
//!
//! Clips are probed when opened and compiled to a single ffmpeg command when
//! written (see [`crate::render`]). Rendered text and image sequence lists
//! live in the configured work directory until their clip is closed.

use crate::clip::{Clip, CropRegion, Frame, Layer, TextStyle, WriteOptions};
use crate::engine::MediaEngine;
use crate::probe::SourceInfo;
use crate::render;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use video_edit_mcp_common::config::Config;
use video_edit_mcp_common::error::{Error, ResolutionError, Result};

/// Extensions accepted by [`MediaEngine::build_from_image_sequence`].
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// FFmpeg-based media engine.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    work_dir: PathBuf,
}

impl FfmpegEngine {
    /// Create an engine from configuration, creating the work directory.
    pub async fn new(config: &Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.work_dir).await?;
        Ok(Self::with_paths(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
            config.work_dir.clone(),
        ))
    }

    /// Create an engine with explicit binaries and work directory.
    pub fn with_paths(ffmpeg: PathBuf, ffprobe: PathBuf, work_dir: PathBuf) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            work_dir,
        }
    }

    /// Directory holding temporary artifacts.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn artifact_path(&self, prefix: &str, extension: &str) -> PathBuf {
        self.work_dir
            .join(format!("{}_{}.{}", prefix, Uuid::new_v4(), extension))
    }

    // =========================================================================
    // FFmpeg/FFprobe Execution
    // =========================================================================

    /// Execute ffprobe and return parsed JSON output.
    async fn run_ffprobe(&self, input: &Path) -> Result<serde_json::Value> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(input)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| tool_missing("ffprobe", &self.ffprobe, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::engine(format!(
                "ffprobe failed for '{}': {}",
                input.display(),
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::engine(format!("Failed to parse ffprobe output: {}", e)))
    }

    /// Execute ffmpeg and return its stdout.
    async fn run_ffmpeg(&self, args: &[OsString]) -> Result<Vec<u8>> {
        debug!(args = ?args, "Running ffmpeg");

        let output = Command::new(&self.ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| tool_missing("ffmpeg", &self.ffmpeg, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::engine(format!("ffmpeg failed: {}", stderr.trim())));
        }

        Ok(output.stdout)
    }

    async fn probe(&self, path: &Path) -> Result<SourceInfo> {
        let json = self.run_ffprobe(path).await?;
        SourceInfo::from_ffprobe(&json)
    }

    /// Probe `path`, mapping every failure to an unopenable input.
    async fn probe_input(&self, path: &Path) -> Result<SourceInfo> {
        if let Err(e) = tokio::fs::metadata(path).await {
            return Err(ResolutionError::unopenable(path, e.to_string()).into());
        }
        self.probe(path)
            .await
            .map_err(|e| ResolutionError::unopenable(path, e.to_string()).into())
    }

    async fn image_size(&self, path: &Path) -> Result<(u32, u32)> {
        let info = self.probe_input(path).await?;
        info.video
            .map(|v| (v.width, v.height))
            .ok_or_else(|| ResolutionError::unopenable(path, "not an image").into())
    }
}

fn tool_missing(name: &str, binary: &Path, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::engine(format!("{} not found at '{}'", name, binary.display()))
    } else {
        Error::Io(err)
    }
}

/// ImageMagick reads `label:@file` from disk; a leading `@` must be literal.
fn label_text(text: &str) -> String {
    match text.strip_prefix('@') {
        Some(rest) => format!("\\@{}", rest),
        None => text.to_string(),
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn is_frame_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("frame_") && n.ends_with(".png"))
}

/// Frame images in `folder`, sorted by name.
async fn frame_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    let mut entries = tokio::fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_frame_file(&path) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

/// Split raw RGB24 output into frames.
fn split_frames(data: &[u8], width: u32, height: u32) -> Vec<Frame> {
    let frame_len = width as usize * height as usize * 3;
    if frame_len == 0 {
        return Vec::new();
    }
    let chunks = data.chunks_exact(frame_len);
    if !chunks.remainder().is_empty() {
        warn!(
            trailing = chunks.remainder().len(),
            "Discarding partial frame from decoder output"
        );
    }
    chunks
        .enumerate()
        .map(|(index, bytes)| Frame {
            index,
            width,
            height,
            data: bytes.to_vec(),
        })
        .collect()
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    #[instrument(level = "debug", skip(self))]
    async fn open(&self, path: &Path) -> Result<Clip> {
        let info = self.probe_input(path).await?;
        Clip::source(path, info)
            .map_err(|e| ResolutionError::unopenable(path, e.to_string()).into())
    }

    #[instrument(level = "debug", skip(self))]
    async fn open_image(&self, path: &Path) -> Result<Clip> {
        let (width, height) = self.image_size(path).await?;
        Ok(Clip::image(path, width, height))
    }

    fn close(&self, clip: &Clip) {
        for artifact in clip.artifacts() {
            if !artifact.starts_with(&self.work_dir) {
                continue;
            }
            match std::fs::remove_file(artifact) {
                Ok(()) => debug!(path = %artifact.display(), "Removed clip artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %artifact.display(), error = %e, "Failed to remove clip artifact"),
            }
        }
    }

    fn subclip(&self, clip: &Clip, start: f64, end: f64) -> Result<Clip> {
        clip.subclip(start, end)
    }

    fn resize(&self, clip: &Clip, width: u32, height: u32) -> Result<Clip> {
        clip.resize(width, height)
    }

    fn crop(&self, clip: &Clip, region: CropRegion) -> Result<Clip> {
        clip.crop(region)
    }

    fn rotate(&self, clip: &Clip, degrees: f64) -> Result<Clip> {
        clip.rotate(degrees)
    }

    fn speed(&self, clip: &Clip, factor: f64) -> Result<Clip> {
        clip.speed(factor)
    }

    fn set_audio(&self, video: &Clip, audio: &Clip) -> Result<Clip> {
        video.set_audio(audio)
    }

    fn fade_in(&self, clip: &Clip, seconds: f64) -> Result<Clip> {
        clip.fade_in(seconds)
    }

    fn fade_out(&self, clip: &Clip, seconds: f64) -> Result<Clip> {
        clip.fade_out(seconds)
    }

    fn composite(&self, base: &Clip, layers: Vec<Layer>) -> Result<Clip> {
        Clip::composite(base, layers)
    }

    fn concatenate(&self, clips: &[Clip]) -> Result<Clip> {
        Clip::concatenate(clips)
    }

    fn desaturate(&self, clip: &Clip) -> Result<Clip> {
        clip.desaturate()
    }

    fn flip_horizontal(&self, clip: &Clip) -> Result<Clip> {
        clip.flip_horizontal()
    }

    #[instrument(level = "debug", skip(self), fields(text = %style.text))]
    async fn render_text(&self, style: &TextStyle) -> Result<Clip> {
        let image = self.artifact_path("text", "png");
        let output = Command::new(&style.renderer)
            .arg("-background")
            .arg("none")
            .arg("-fill")
            .arg(&style.color)
            .arg("-pointsize")
            .arg(style.font_size.to_string())
            .arg(format!("label:{}", label_text(&style.text)))
            .arg(&image)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| tool_missing("ImageMagick", &style.renderer, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::engine(format!(
                "text rendering failed: {}",
                stderr.trim()
            )));
        }

        let (width, height) = match self.image_size(&image).await {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(&image).await;
                return Err(Error::engine(format!("rendered text is unreadable: {}", e)));
            }
        };
        Ok(Clip::text(image, style.text.clone(), width, height))
    }

    #[instrument(level = "info", skip(self, clip), fields(duration = clip.duration()))]
    async fn write(&self, clip: &Clip, path: &Path, options: &WriteOptions) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let args = render::encode_args(clip, path, options)?;
        self.run_ffmpeg(&args).await?;
        info!(output = %path.display(), "Wrote clip");
        Ok(())
    }

    #[instrument(level = "debug", skip(self, clip))]
    async fn sample_frames(&self, clip: &Clip, fps: f64) -> Result<Vec<Frame>> {
        let (width, height) = clip
            .meta()
            .size()
            .ok_or_else(|| Error::engine("clip has no video stream to sample"))?;
        let args = render::raw_frames_args(clip, fps)?;
        let data = self.run_ffmpeg(&args).await?;
        let frames = split_frames(&data, width, height);
        debug!(count = frames.len(), "Sampled frames");
        Ok(frames)
    }

    #[instrument(level = "debug", skip(self, clip))]
    async fn write_frames(&self, clip: &Clip, fps: f64, folder: &Path) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(folder).await?;
        for stale in frame_files(folder).await? {
            tokio::fs::remove_file(&stale).await?;
        }
        let args = render::image_files_args(clip, fps, folder)?;
        self.run_ffmpeg(&args).await?;

        let written = frame_files(folder).await?;
        info!(folder = %folder.display(), count = written.len(), "Wrote frames");
        Ok(written)
    }

    #[instrument(level = "debug", skip(self))]
    async fn build_from_image_sequence(&self, folder: &Path, fps: f64) -> Result<Clip> {
        let mut entries = tokio::fs::read_dir(folder)
            .await
            .map_err(|e| ResolutionError::unopenable(folder, e.to_string()))?;

        let mut frames = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_image(&path) {
                frames.push(path);
            }
        }
        frames.sort();

        let first = frames.first().ok_or_else(|| {
            Error::engine(format!("no image files found in '{}'", folder.display()))
        })?;
        let (width, height) = self.image_size(first).await?;

        let list_file = self.artifact_path("sequence", "txt");
        tokio::fs::write(&list_file, render::image_sequence_list(&frames, fps)).await?;
        debug!(count = frames.len(), list = %list_file.display(), "Built image sequence");

        Clip::image_sequence(list_file, frames, fps, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> FfmpegEngine {
        FfmpegEngine::with_paths(
            PathBuf::from("ffmpeg"),
            PathBuf::from("ffprobe"),
            dir.path().to_path_buf(),
        )
    }

    #[test]
    fn test_label_text_escapes_file_reads() {
        assert_eq!(label_text("@/etc/passwd"), "\\@/etc/passwd");
        assert_eq!(label_text("Hello @world"), "Hello @world");
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("a/b/001.PNG")));
        assert!(is_image(Path::new("shot.jpeg")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("no_extension")));
    }

    #[test]
    fn test_split_frames() {
        let data = vec![7u8; 2 * 2 * 3 * 3 + 5];
        let frames = split_frames(&data, 2, 2);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].index, 2);
        assert_eq!(frames[0].data.len(), 12);
    }

    #[test]
    fn test_tool_missing_maps_not_found() {
        let err = tool_missing(
            "ffmpeg",
            Path::new("/nope/ffmpeg"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), "EngineError");
        assert!(err.to_string().contains("/nope/ffmpeg"));
    }

    #[tokio::test]
    async fn test_open_missing_file_is_resolution_error() {
        let dir = TempDir::new().unwrap();
        let err = engine(&dir)
            .open(&dir.path().join("missing.mp4"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ResolutionError");
    }

    #[tokio::test]
    async fn test_image_sequence_from_empty_folder() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir(&images).unwrap();
        std::fs::write(images.join("readme.txt"), "not an image").unwrap();
        let err = engine(&dir)
            .build_from_image_sequence(&images, 24.0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no image files"));
    }

    #[tokio::test]
    async fn test_image_sequence_from_missing_folder() {
        let dir = TempDir::new().unwrap();
        let err = engine(&dir)
            .build_from_image_sequence(&dir.path().join("absent"), 24.0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ResolutionError");
    }

    #[test]
    fn test_close_removes_only_work_dir_artifacts() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let inside = dir.path().join("text_1.png");
        std::fs::write(&inside, b"png").unwrap();
        let outside_dir = TempDir::new().unwrap();
        let outside = outside_dir.path().join("text_2.png");
        std::fs::write(&outside, b"png").unwrap();

        engine.close(&Clip::text(&inside, "hi", 10, 10));
        engine.close(&Clip::text(&outside, "hi", 10, 10));
        assert!(!inside.exists());
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn test_frame_files_lists_only_frames() {
        let dir = TempDir::new().unwrap();
        for name in ["frame_0002.png", "frame_0001.png", "cover.png", "frame_notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let frames = frame_files(dir.path()).await.unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["frame_0001.png", "frame_0002.png"]);
    }

    #[tokio::test]
    async fn test_write_frames_clears_previous_run() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("frames");
        std::fs::create_dir_all(&folder).unwrap();
        for i in 1..=5 {
            std::fs::write(folder.join(format!("frame_{:04}.png", i)), b"old").unwrap();
        }
        std::fs::write(folder.join("keep.txt"), b"notes").unwrap();

        let engine = FfmpegEngine::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
            dir.path().to_path_buf(),
        );
        let clip = Clip::source("in.mp4", crate::testing::video_info(2.0, 4, 4, false)).unwrap();
        assert!(engine.write_frames(&clip, 1.0, &folder).await.is_err());

        assert!(frame_files(&folder).await.unwrap().is_empty());
        assert!(folder.join("keep.txt").exists());
    }
}
