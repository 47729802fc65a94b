//! Video editing tool implementations.
//!
//! Every tool runs the same template: validate the arguments, resolve input
//! identifiers through the object store, apply one engine operation, then
//! emit the result as a file or a stored object. Failures at any step come
//! back as a `success: false` [`ToolResponse`], never as a protocol error.

use crate::clip::{Clip, CropRegion, Layer, TextStyle, WriteOptions};
use crate::engine::MediaEngine;
use crate::envelope::{ToolResponse, VideoInfo};
use crate::ffmpeg::FfmpegEngine;
use crate::output::OutputResolver;
use crate::params::*;
use crate::store::{Identifier, ObjectStore};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use video_edit_mcp_common::config::Config;
use video_edit_mcp_common::error::{Error, ResolutionError, Result};

/// Video editing handler.
pub struct VideoEditHandler {
    engine: Arc<dyn MediaEngine>,
    store: Arc<ObjectStore>,
    resolver: OutputResolver,
}

impl VideoEditHandler {
    /// Create a handler backed by FFmpeg.
    ///
    /// # Errors
    /// Returns an error if the engine work directory cannot be created.
    pub async fn new(config: &Config) -> Result<Self> {
        let engine = FfmpegEngine::new(config).await?;
        info!(
            output_dir = %config.output_dir.display(),
            work_dir = %engine.work_dir().display(),
            "Video edit handler ready"
        );
        Ok(Self::with_parts(
            Arc::new(engine),
            Arc::new(ObjectStore::with_capacity(config.max_stored_objects)),
            OutputResolver::new(&config.output_dir),
        ))
    }

    /// Create a handler from explicit parts (for testing).
    pub fn with_parts(
        engine: Arc<dyn MediaEngine>,
        store: Arc<ObjectStore>,
        resolver: OutputResolver,
    ) -> Self {
        Self {
            engine,
            store,
            resolver,
        }
    }

    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    pub fn resolver(&self) -> &OutputResolver {
        &self.resolver
    }

    fn session(&self) -> Session<'_> {
        Session {
            engine: self.engine.as_ref(),
            store: &self.store,
            resolver: &self.resolver,
            owned: Vec::new(),
        }
    }

    /// The shared template. `operation` is not polled unless `validation`
    /// passed.
    async fn execute<F>(
        &self,
        tool: &'static str,
        failure: &'static str,
        subject: &str,
        validation: std::result::Result<(), Vec<ValidationError>>,
        operation: F,
    ) -> ToolResponse
    where
        F: Future<Output = Result<ToolResponse>>,
    {
        if let Err(errors) = validation {
            debug!(tool, input = subject, ?errors, "Rejected invalid arguments");
            return ToolResponse::invalid(&errors);
        }

        match operation.await {
            Ok(response) => response,
            Err(err) => {
                if err.is_validation() {
                    debug!(tool, input = subject, error = %err, "Rejected invalid arguments");
                } else {
                    error!(tool, input = subject, error = %err, "Tool failed");
                }
                ToolResponse::failure(failure, &err)
            }
        }
    }

    // =========================================================================
    // Tool Implementations
    // =========================================================================

    /// Report duration, size, codecs and file details.
    #[instrument(level = "info", skip(self))]
    pub async fn get_video_info(&self, params: GetVideoInfoParams) -> ToolResponse {
        self.execute(
            "get_video_info",
            "Error getting video info",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                Ok(ToolResponse::info(VideoInfo::from_clip(&clip)))
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn trim_video(&self, params: TrimVideoParams) -> ToolResponse {
        self.execute(
            "trim_video",
            "Error trimming video",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let trimmed = self
                    .engine
                    .subclip(&clip, params.start_time, params.end_time)?;
                session
                    .emit(trimmed, &params.output, "Video trimmed successfully")
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn merge_video(&self, params: MergeVideoParams) -> ToolResponse {
        self.execute(
            "merge_video",
            "Error merging videos",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let first = session.load(&params.video_path).await?;
                let second = session.load(&params.video_path2).await?;
                let merged = self.engine.concatenate(&[first, second])?;
                session
                    .emit(merged, &params.output, "Videos merged successfully")
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn resize_video(&self, params: ResizeVideoParams) -> ToolResponse {
        self.execute(
            "resize_video",
            "Error resizing video",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let [width, height] = params.size;
                let resized = self.engine.resize(&clip, width as u32, height as u32)?;
                session
                    .emit(resized, &params.output, "Video resized successfully")
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn crop_video(&self, params: CropVideoParams) -> ToolResponse {
        self.execute(
            "crop_video",
            "Error cropping video",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let region = CropRegion {
                    x1: params.x1 as u32,
                    y1: params.y1 as u32,
                    x2: params.x2 as u32,
                    y2: params.y2 as u32,
                };
                let cropped = self.engine.crop(&clip, region)?;
                session
                    .emit(cropped, &params.output, "Video cropped successfully")
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn rotate_video(&self, params: RotateVideoParams) -> ToolResponse {
        self.execute(
            "rotate_video",
            "Error rotating video",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let rotated = self.engine.rotate(&clip, params.angle)?;
                session
                    .emit(rotated, &params.output, "Video rotated successfully")
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn speed_up_video(&self, params: SpeedVideoParams) -> ToolResponse {
        self.execute(
            "speed_up_video",
            "Error changing video speed",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let changed = self.engine.speed(&clip, params.speed)?;
                session
                    .emit(changed, &params.output, "Video speed changed successfully")
                    .await
            },
        )
        .await
    }

    /// Replace the soundtrack.
    #[instrument(level = "info", skip(self))]
    pub async fn add_audio(&self, params: AddAudioParams) -> ToolResponse {
        self.execute(
            "add_audio",
            "Error adding audio to video",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let video = session.load(&params.video_path).await?;
                let audio = session.load(&params.audio_path).await?;
                let combined = self.engine.set_audio(&video, &audio)?;
                session
                    .emit(combined, &params.output, "Audio added successfully")
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn fadein_video(&self, params: FadeVideoParams) -> ToolResponse {
        self.execute(
            "fadein_video",
            "Error adding fade in effect",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let faded = self.engine.fade_in(&clip, params.fade_duration)?;
                session
                    .emit(faded, &params.output, "Fade in effect added successfully")
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn fadeout_video(&self, params: FadeVideoParams) -> ToolResponse {
        self.execute(
            "fadeout_video",
            "Error adding fade out effect",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let faded = self.engine.fade_out(&clip, params.fade_duration)?;
                session
                    .emit(faded, &params.output, "Fade out effect added successfully")
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn add_text_overlay(&self, params: TextOverlayParams) -> ToolResponse {
        self.execute(
            "add_text_overlay",
            "Error adding text overlay. Make sure ImageMagick is installed and path is correct.",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let style = TextStyle {
                    text: params.text.clone(),
                    font_size: params.font_size as u32,
                    color: params.color.clone(),
                    renderer: PathBuf::from(&params.path_of_imagemagick),
                };
                let text = session.adopt(self.engine.render_text(&style).await?);
                let layer = Layer::new(text, params.x, params.y, params.duration);
                let composed = self.engine.composite(&clip, vec![layer])?;
                session
                    .emit(composed, &params.output, "Text overlay added successfully")
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn add_image_overlay(&self, params: ImageOverlayParams) -> ToolResponse {
        self.execute(
            "add_image_overlay",
            "Error adding image overlay",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let image = self.engine.open_image(Path::new(&params.image_path)).await?;
                let image = session.adopt(image);
                let layer = Layer::new(image, params.x, params.y, params.duration);
                let composed = self.engine.composite(&clip, vec![layer])?;
                session
                    .emit(composed, &params.output, "Image overlay added successfully")
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn grayscale_video(&self, params: VideoFilterParams) -> ToolResponse {
        self.execute(
            "grayscale_video",
            "Error converting video to grayscale",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let gray = self.engine.desaturate(&clip)?;
                session
                    .emit(
                        gray,
                        &params.output,
                        "Video converted to grayscale successfully",
                    )
                    .await
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn images_to_video(&self, params: ImagesToVideoParams) -> ToolResponse {
        self.execute(
            "images_to_video",
            "Error creating video from images",
            &params.images_folder_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = self
                    .engine
                    .build_from_image_sequence(Path::new(&params.images_folder_path), params.fps)
                    .await?;
                let clip = session.adopt(clip);
                session
                    .emit(clip, &params.output, "Video created from images successfully")
                    .await
            },
        )
        .await
    }

    /// Sample frames either to PNG files or into the object store.
    #[instrument(level = "info", skip(self))]
    pub async fn extract_frames(&self, params: ExtractFramesParams) -> ToolResponse {
        self.execute(
            "extract_frames",
            "Error extracting frames from video",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let range = self
                    .engine
                    .subclip(&clip, params.start_time, params.end_time)?;

                if params.return_path {
                    let folder = self.resolver.resolve(&params.output_folder_name)?;
                    let frames = self
                        .engine
                        .write_frames(&range, params.fps, &folder)
                        .await?;
                    info!(folder = %folder.display(), count = frames.len(), "Extracted frames");
                    Ok(ToolResponse::path(&folder, "Frames extracted successfully"))
                } else {
                    let frames = self.engine.sample_frames(&range, params.fps).await?;
                    let count = frames.len();
                    let reference = self.store.store(frames).await;
                    info!(%reference, count, "Extracted frames to memory");
                    Ok(ToolResponse::object(reference, "Frames extracted to memory"))
                }
            },
        )
        .await
    }

    #[instrument(level = "info", skip(self))]
    pub async fn mirror_video(&self, params: VideoFilterParams) -> ToolResponse {
        self.execute(
            "mirror_video",
            "Error mirroring video",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let mirrored = self.engine.flip_horizontal(&clip)?;
                session
                    .emit(mirrored, &params.output, "Video mirrored successfully")
                    .await
            },
        )
        .await
    }

    /// Cut at each split time: N times give N+1 parts.
    #[instrument(level = "info", skip(self))]
    pub async fn split_video_at_times(&self, params: SplitVideoParams) -> ToolResponse {
        self.execute(
            "split_video_at_times",
            "Error splitting video at times",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let duration = clip.duration();
                params
                    .validate_against(duration)
                    .map_err(|errors| Error::validation(join_errors(&errors)))?;

                let mut bounds = Vec::with_capacity(params.split_times.len() + 2);
                bounds.push(0.0);
                bounds.extend_from_slice(&params.split_times);
                bounds.push(duration);

                let segments = bounds
                    .windows(2)
                    .map(|w| self.engine.subclip(&clip, w[0], w[1]))
                    .collect::<Result<Vec<_>>>()?;
                session
                    .emit_all(segments, &params.output, "Video split successfully")
                    .await
            },
        )
        .await
    }

    /// Re-encode with another codec, frame rate or bitrate.
    #[instrument(level = "info", skip(self))]
    pub async fn convert_video_format(&self, params: ConvertFormatParams) -> ToolResponse {
        self.execute(
            "convert_video_format",
            "Error converting video format",
            &params.video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let clip = session.load(&params.video_path).await?;
                let options = WriteOptions {
                    codec: Some(params.codec.trim().to_string()),
                    fps: params.fps,
                    bitrate: params.bitrate.as_ref().map(|b| b.trim().to_string()),
                };
                session
                    .emit_with(
                        clip,
                        &params.output,
                        &options,
                        "Video format converted successfully",
                    )
                    .await
            },
        )
        .await
    }

    /// Picture-in-picture.
    #[instrument(level = "info", skip(self))]
    pub async fn add_video_overlay(&self, params: VideoOverlayParams) -> ToolResponse {
        self.execute(
            "add_video_overlay",
            "Error adding video overlay",
            &params.base_video_path,
            params.validate(),
            async {
                let mut session = self.session();
                let base = session.load(&params.base_video_path).await?;
                let overlay = session.load(&params.overlay_video_path).await?;
                let layer = Layer::new(overlay, params.x, params.y, params.duration)
                    .with_opacity(params.opacity);
                let composed = self.engine.composite(&base, vec![layer])?;
                session
                    .emit(composed, &params.output, "Video overlay added successfully")
                    .await
            },
        )
        .await
    }

    /// Drop an object from the store.
    #[instrument(level = "info", skip(self))]
    pub async fn release_object(&self, params: ReleaseObjectParams) -> ToolResponse {
        self.execute(
            "release_object",
            "Error releasing object",
            &params.reference,
            params.validate(),
            async {
                let Identifier::Reference(reference) = Identifier::parse(&params.reference)? else {
                    return Err(Error::validation("expected an obj:// reference"));
                };
                if self.store.release(&reference).await {
                    Ok(ToolResponse::done(&format!("Released {}", reference)))
                } else {
                    Err(ResolutionError::UnknownReference(reference.to_string()).into())
                }
            },
        )
        .await
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Clips acquired during one tool call.
///
/// Clips opened from paths and auxiliary clips (rendered text, images,
/// sequences) are closed when the session ends, unless the result was put
/// in the store; stored graphs still need them.
struct Session<'a> {
    engine: &'a dyn MediaEngine,
    store: &'a ObjectStore,
    resolver: &'a OutputResolver,
    owned: Vec<Clip>,
}

impl Session<'_> {
    /// Resolve an identifier string to a clip.
    async fn load(&mut self, value: &str) -> Result<Clip> {
        let identifier = Identifier::parse(value)?;
        let clip = self.store.load(&identifier, self.engine).await?;
        if identifier.is_path() {
            self.owned.push(clip.clone());
        }
        Ok(clip)
    }

    /// Take ownership of an auxiliary clip.
    fn adopt(&mut self, clip: Clip) -> Clip {
        self.owned.push(clip.clone());
        clip
    }

    async fn emit(self, clip: Clip, output: &OutputParams, message: &str) -> Result<ToolResponse> {
        self.emit_with(clip, output, &WriteOptions::default(), message)
            .await
    }

    async fn emit_with(
        mut self,
        clip: Clip,
        output: &OutputParams,
        options: &WriteOptions,
        message: &str,
    ) -> Result<ToolResponse> {
        if output.return_path {
            let path = self.resolver.prepare(&output.output_name).await?;
            self.engine.write(&clip, &path, options).await?;
            Ok(ToolResponse::path(&path, message))
        } else {
            self.owned.clear();
            let reference = self.store.store(clip).await;
            Ok(ToolResponse::object(reference, message))
        }
    }

    async fn emit_all(
        mut self,
        clips: Vec<Clip>,
        output: &OutputParams,
        message: &str,
    ) -> Result<ToolResponse> {
        if output.return_path {
            let mut paths = Vec::with_capacity(clips.len());
            for (i, clip) in clips.iter().enumerate() {
                let path = self.resolver.segment(&output.output_name, i + 1)?;
                self.engine
                    .write(clip, &path, &WriteOptions::default())
                    .await?;
                paths.push(path);
            }
            Ok(ToolResponse::paths(&paths, message))
        } else {
            self.owned.clear();
            let mut references = Vec::with_capacity(clips.len());
            for clip in clips {
                references.push(self.store.store(clip).await);
            }
            Ok(ToolResponse::objects(&references, message))
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        for clip in self.owned.drain(..) {
            self.engine.close(&clip);
        }
    }
}

#[cfg(test)]
#[path = "handler_test.rs"]
mod handler_test;
