//! Compiles a clip graph into a single ffmpeg invocation.
//!
//! Every leaf becomes an ffmpeg input and every transformation becomes one
//! `-filter_complex` chain. A leaf reachable twice in the graph is opened
//! twice, so each stream label is consumed exactly once. Streams nobody
//! asked for are never produced, which keeps unconnected pads out of the
//! graph (ffmpeg rejects those).

use crate::clip::{Clip, ClipNode, Layer, WriteOptions};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use video_edit_mcp_common::error::{Error, Result};

/// Default video codec when none is requested.
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";

/// Default audio codec for containers without a more specific choice.
pub const DEFAULT_AUDIO_CODEC: &str = "aac";

/// Sample layout used wherever silence has to be synthesized.
const SILENCE: &str = "anullsrc=r=44100:cl=stereo";

/// File name pattern for extracted frames.
pub const FRAME_PATTERN: &str = "frame_%04d.png";

/// One ffmpeg input: demuxer options followed by `-i path`.
#[derive(Debug, Clone, PartialEq)]
struct Input {
    options: Vec<&'static str>,
    path: PathBuf,
}

/// A stream endpoint inside the filter graph.
#[derive(Debug, Clone, PartialEq)]
enum Pad {
    /// An input stream specifier such as `0:v:0`.
    Stream(String),
    /// The output of a filter chain.
    Link(String),
}

impl Pad {
    fn name(&self) -> &str {
        match self {
            Pad::Stream(s) | Pad::Link(s) => s,
        }
    }

    /// Argument for `-map`.
    fn map_arg(&self) -> String {
        match self {
            Pad::Stream(s) => s.clone(),
            Pad::Link(s) => format!("[{}]", s),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Want {
    video: bool,
    audio: bool,
}

impl Want {
    const ALL: Want = Want {
        video: true,
        audio: true,
    };
    const VIDEO: Want = Want {
        video: true,
        audio: false,
    };
    const AUDIO: Want = Want {
        video: false,
        audio: true,
    };
}

#[derive(Debug, Default)]
struct Outputs {
    video: Option<Pad>,
    audio: Option<Pad>,
}

#[derive(Debug, Default)]
struct FilterGraph {
    inputs: Vec<Input>,
    chains: Vec<String>,
    links: usize,
}

impl FilterGraph {
    fn input(&mut self, options: Vec<&'static str>, path: &Path) -> usize {
        self.inputs.push(Input {
            options,
            path: path.to_path_buf(),
        });
        self.inputs.len() - 1
    }

    fn link(&mut self) -> Pad {
        let pad = Pad::Link(format!("s{}", self.links));
        self.links += 1;
        pad
    }

    /// Append `filter` fed by `inputs` and return its single output.
    fn chain(&mut self, inputs: &[Pad], filter: &str) -> Pad {
        let mut outputs = self.chain_n(inputs, filter, 1);
        outputs.remove(0)
    }

    fn chain_n(&mut self, inputs: &[Pad], filter: &str, outputs: usize) -> Vec<Pad> {
        let outs: Vec<Pad> = (0..outputs).map(|_| self.link()).collect();
        let mut line = String::new();
        for pad in inputs {
            line.push_str(&format!("[{}]", pad.name()));
        }
        line.push_str(filter);
        for pad in &outs {
            line.push_str(&format!("[{}]", pad.name()));
        }
        self.chains.push(line);
        outs
    }

    fn map(&mut self, pad: Option<Pad>, filter: &str) -> Option<Pad> {
        pad.map(|p| self.chain(&[p], filter))
    }

    fn silence(&mut self, duration: f64) -> Pad {
        self.chain(&[], &format!("{},atrim=duration={}", SILENCE, num(duration)))
    }

    fn visit(&mut self, clip: &Clip, want: Want) -> Result<Outputs> {
        let meta = clip.meta();
        let want = Want {
            video: want.video && meta.has_video,
            audio: want.audio && meta.has_audio,
        };
        if !want.video && !want.audio {
            return Ok(Outputs::default());
        }

        let outputs = match clip.node() {
            ClipNode::Source { path, .. } => {
                let i = self.input(Vec::new(), path);
                Outputs {
                    video: want.video.then(|| Pad::Stream(format!("{}:v:0", i))),
                    audio: want.audio.then(|| Pad::Stream(format!("{}:a:0", i))),
                }
            }
            ClipNode::Image { path } | ClipNode::Text { image: path, .. } => {
                let i = self.input(vec!["-loop", "1"], path);
                Outputs {
                    video: Some(Pad::Stream(format!("{}:v:0", i))),
                    audio: None,
                }
            }
            ClipNode::ImageSequence { list_file, fps, .. } => {
                let i = self.input(vec!["-f", "concat", "-safe", "0"], list_file);
                // Images of mixed sizes follow the first one.
                let mut filter = format!("fps={}", num(*fps));
                if let Some((w, h)) = meta.size() {
                    filter.push_str(&format!(",scale={}:{},setsar=1", w, h));
                }
                let video = self.chain(&[Pad::Stream(format!("{}:v:0", i))], &filter);
                Outputs {
                    video: Some(video),
                    audio: None,
                }
            }
            ClipNode::Subclip { input, start, end } => {
                let o = self.visit(input, want)?;
                let (s, e) = (num(*start), num(*end));
                Outputs {
                    video: self.map(
                        o.video,
                        &format!("trim=start={}:end={},setpts=PTS-STARTPTS", s, e),
                    ),
                    audio: self.map(
                        o.audio,
                        &format!("atrim=start={}:end={},asetpts=PTS-STARTPTS", s, e),
                    ),
                }
            }
            ClipNode::Resize {
                input,
                width,
                height,
            } => {
                let o = self.visit(input, want)?;
                Outputs {
                    video: self.map(o.video, &format!("scale={}:{},setsar=1", width, height)),
                    audio: o.audio,
                }
            }
            ClipNode::Crop { input, region } => {
                let o = self.visit(input, want)?;
                let filter = format!(
                    "crop={}:{}:{}:{}",
                    region.width(),
                    region.height(),
                    region.x1,
                    region.y1
                );
                Outputs {
                    video: self.map(o.video, &filter),
                    audio: o.audio,
                }
            }
            ClipNode::Rotate { input, degrees } => {
                let o = self.visit(input, want)?;
                // ffmpeg turns clockwise for positive angles.
                let radians = num(-degrees.to_radians());
                let filter = match meta.size() {
                    Some((w, h)) => format!("rotate=a={}:ow={}:oh={}:c=black", radians, w, h),
                    None => format!(
                        "rotate=a={r}:ow=rotw({r}):oh=roth({r}):c=black",
                        r = radians
                    ),
                };
                Outputs {
                    video: self.map(o.video, &filter),
                    audio: o.audio,
                }
            }
            ClipNode::Speed { input, factor } => {
                let o = self.visit(input, want)?;
                Outputs {
                    video: self.map(o.video, &format!("setpts=PTS/{}", num(*factor))),
                    audio: self.map(o.audio, &atempo_chain(*factor)),
                }
            }
            ClipNode::SetAudio { video, audio } => {
                let v = if want.video {
                    self.visit(video, Want::VIDEO)?.video
                } else {
                    None
                };
                let a = if want.audio {
                    let a = self.visit(audio, Want::AUDIO)?.audio;
                    self.map(
                        a,
                        &format!(
                            "atrim=duration={},asetpts=PTS-STARTPTS",
                            num(video.duration())
                        ),
                    )
                } else {
                    None
                };
                Outputs { video: v, audio: a }
            }
            ClipNode::FadeIn { input, seconds } => {
                let o = self.visit(input, want)?;
                Outputs {
                    video: self.map(o.video, &format!("fade=t=in:st=0:d={}", num(*seconds))),
                    audio: o.audio,
                }
            }
            ClipNode::FadeOut { input, seconds } => {
                let o = self.visit(input, want)?;
                let start = (input.duration() - seconds).max(0.0);
                Outputs {
                    video: self.map(
                        o.video,
                        &format!("fade=t=out:st={}:d={}", num(start), num(*seconds)),
                    ),
                    audio: o.audio,
                }
            }
            ClipNode::Desaturate { input } => {
                let o = self.visit(input, want)?;
                Outputs {
                    video: self.map(o.video, "hue=s=0"),
                    audio: o.audio,
                }
            }
            ClipNode::FlipHorizontal { input } => {
                let o = self.visit(input, want)?;
                Outputs {
                    video: self.map(o.video, "hflip"),
                    audio: o.audio,
                }
            }
            ClipNode::Concatenate { clips } => self.concatenate(clip, clips, want)?,
            ClipNode::Composite { base, layers } => self.composite(base, layers, want)?,
        };
        Ok(outputs)
    }

    fn concatenate(&mut self, whole: &Clip, clips: &[Clip], want: Want) -> Result<Outputs> {
        let target = whole.meta();
        let mut pads = Vec::with_capacity(clips.len() * 2);

        for clip in clips {
            let o = self.visit(clip, want)?;
            if want.video {
                let v = o
                    .video
                    .ok_or_else(|| Error::engine("concatenated clip produced no video"))?;
                let mut filters = Vec::new();
                if let Some((w, h)) = target.size() {
                    if clip.meta().size() != Some((w, h)) {
                        filters.push(format!("scale={}:{}", w, h));
                    }
                }
                filters.push("setsar=1".to_string());
                if let Some(fps) = target.fps {
                    filters.push(format!("fps={}", num(fps)));
                }
                pads.push(self.chain(&[v], &filters.join(",")));
            }
            if want.audio {
                let a = match o.audio {
                    Some(a) => self.chain(&[a], "aformat=sample_rates=44100:channel_layouts=stereo"),
                    None => self.silence(clip.duration()),
                };
                pads.push(a);
            }
        }

        let (v, a) = (usize::from(want.video), usize::from(want.audio));
        let mut outs = self
            .chain_n(
                &pads,
                &format!("concat=n={}:v={}:a={}", clips.len(), v, a),
                v + a,
            )
            .into_iter();
        Ok(Outputs {
            video: if want.video { outs.next() } else { None },
            audio: if want.audio { outs.next() } else { None },
        })
    }

    fn composite(&mut self, base: &Clip, layers: &[Layer], want: Want) -> Result<Outputs> {
        let o = self.visit(base, want)?;
        let mut video = o.video;
        let mut audio = Vec::new();
        if want.audio {
            audio.push(match o.audio {
                Some(a) => a,
                None => self.silence(base.duration()),
            });
        }

        for layer in layers {
            let layer_want = Want {
                video: want.video,
                audio: want.audio && layer.clip.meta().has_audio,
            };
            let lo = self.visit(&layer.clip, layer_want)?;
            let (start, end) = (num(layer.start), num(layer.start + layer.duration));

            if let (Some(base_pad), Some(layer_pad)) = (video.take(), lo.video) {
                let mut filters = vec![
                    format!("trim=duration={}", num(layer.duration)),
                    format!("setpts=PTS-STARTPTS+{}/TB", start),
                ];
                if layer.opacity < 1.0 {
                    filters.push("format=rgba".to_string());
                    filters.push(format!("colorchannelmixer=aa={}", num(layer.opacity)));
                }
                let shaped = self.chain(&[layer_pad], &filters.join(","));
                video = Some(self.chain(
                    &[base_pad, shaped],
                    &format!(
                        "overlay=x={}:y={}:enable='between(t,{},{})':eof_action=pass",
                        layer.x, layer.y, start, end
                    ),
                ));
            }

            if let Some(a) = lo.audio {
                let mut filter = format!(
                    "atrim=duration={},asetpts=PTS-STARTPTS",
                    num(layer.duration)
                );
                if layer.start > 0.0 {
                    let ms = (layer.start * 1000.0).round() as u64;
                    filter.push_str(&format!(",adelay=delays={}:all=1", ms));
                }
                audio.push(self.chain(&[a], &filter));
            }
        }

        let audio = match audio.len() {
            0 => None,
            1 => audio.pop(),
            n => Some(self.chain(
                &audio,
                &format!("amix=inputs={}:duration=first:dropout_transition=0", n),
            )),
        };
        Ok(Outputs { video, audio })
    }

    fn into_args(self, maps: &[Pad]) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
            .iter()
            .map(OsString::from)
            .collect();
        for input in self.inputs {
            args.extend(input.options.into_iter().map(OsString::from));
            args.push("-i".into());
            args.push(input.path.into_os_string());
        }
        if !self.chains.is_empty() {
            args.push("-filter_complex".into());
            args.push(self.chains.join(";").into());
        }
        for pad in maps {
            args.push("-map".into());
            args.push(pad.map_arg().into());
        }
        args
    }
}

/// `atempo` only accepts factors in `[0.5, 2.0]`, so larger changes are
/// chained.
fn atempo_chain(factor: f64) -> String {
    let mut filters = Vec::new();
    let mut remaining = factor;
    while remaining > 2.0 {
        filters.push("atempo=2".to_string());
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        filters.push("atempo=0.5".to_string());
        remaining *= 2.0;
    }
    if (remaining - 1.0).abs() > 1e-9 || filters.is_empty() {
        filters.push(format!("atempo={}", num(remaining)));
    }
    filters.join(",")
}

/// Seconds and factors formatted without float noise.
fn num(value: f64) -> String {
    let s = format!("{:.6}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Codecs picked from the output extension when the caller has no opinion.
fn default_codecs(path: &Path) -> (&'static str, &'static str) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("webm") => ("libvpx-vp9", "libopus"),
        Some("gif") => ("gif", DEFAULT_AUDIO_CODEC),
        Some("mp3") => (DEFAULT_VIDEO_CODEC, "libmp3lame"),
        Some("wav") => (DEFAULT_VIDEO_CODEC, "pcm_s16le"),
        Some("ogg") => ("libtheora", "libvorbis"),
        _ => (DEFAULT_VIDEO_CODEC, DEFAULT_AUDIO_CODEC),
    }
}

fn push_duration(args: &mut Vec<OsString>, clip: &Clip) {
    if clip.duration() > 0.0 {
        args.push("-t".into());
        args.push(num(clip.duration()).into());
    }
}

/// Arguments that encode `clip` into `output`.
pub fn encode_args(clip: &Clip, output: &Path, options: &WriteOptions) -> Result<Vec<OsString>> {
    let mut graph = FilterGraph::default();
    let o = graph.visit(clip, Want::ALL)?;

    let video = o.video.map(|v| {
        let mut tail = Vec::new();
        let odd = |d: Option<u32>| d.is_some_and(|d| d % 2 == 1);
        if odd(clip.meta().width) || odd(clip.meta().height) {
            tail.push("scale=trunc(iw/2)*2:trunc(ih/2)*2");
        }
        tail.push("format=yuv420p");
        graph.chain(&[v], &tail.join(","))
    });
    let audio = o.audio;
    if video.is_none() && audio.is_none() {
        return Err(Error::engine("clip has nothing to encode"));
    }

    let maps: Vec<Pad> = video.iter().chain(audio.iter()).cloned().collect();
    let mut args = graph.into_args(&maps);
    let (video_codec, audio_codec) = default_codecs(output);

    if video.is_some() {
        args.push("-c:v".into());
        args.push(options.codec.as_deref().unwrap_or(video_codec).into());
        if let Some(fps) = options.fps {
            args.push("-r".into());
            args.push(num(fps).into());
        }
        if let Some(bitrate) = &options.bitrate {
            args.push("-b:v".into());
            args.push(bitrate.into());
        }
    }
    if audio.is_some() {
        args.push("-c:a".into());
        args.push(audio_codec.into());
    }
    push_duration(&mut args, clip);
    args.push(output.as_os_str().to_os_string());
    Ok(args)
}

fn frame_graph(clip: &Clip, tail: &str) -> Result<(FilterGraph, Pad)> {
    let mut graph = FilterGraph::default();
    let video = graph
        .visit(clip, Want::VIDEO)?
        .video
        .ok_or_else(|| Error::engine("clip has no video stream to sample"))?;
    let pad = graph.chain(&[video], tail);
    Ok((graph, pad))
}

/// Arguments that decode `clip` at `fps` as raw RGB24 on stdout.
pub fn raw_frames_args(clip: &Clip, fps: f64) -> Result<Vec<OsString>> {
    let (graph, pad) = frame_graph(clip, &format!("fps={},format=rgb24", num(fps)))?;
    let mut args = graph.into_args(&[pad]);
    push_duration(&mut args, clip);
    args.extend(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"].map(OsString::from));
    Ok(args)
}

/// Arguments that decode `clip` at `fps` into numbered PNGs in `folder`.
pub fn image_files_args(clip: &Clip, fps: f64, folder: &Path) -> Result<Vec<OsString>> {
    let (graph, pad) = frame_graph(clip, &format!("fps={}", num(fps)))?;
    let mut args = graph.into_args(&[pad]);
    push_duration(&mut args, clip);
    args.extend(["-start_number", "0"].map(OsString::from));
    args.push(folder.join(FRAME_PATTERN).into_os_string());
    Ok(args)
}

/// ffconcat list playing each image for `1/fps` seconds.
pub fn image_sequence_list(frames: &[PathBuf], fps: f64) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    let duration = num(1.0 / fps);
    for frame in frames {
        list.push_str(&format!("file '{}'\nduration {}\n", quote(frame), duration));
    }
    // The concat demuxer ignores the last entry's duration unless the file
    // is listed again.
    if let Some(last) = frames.last() {
        list.push_str(&format!("file '{}'\n", quote(last)));
    }
    list
}

fn quote(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}
