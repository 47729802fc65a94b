//! Video Edit MCP Library
//!
//! MCP server for video editing backed by FFmpeg.
//!
//! Tools either write their result to a file or keep it in an in-memory
//! object store and answer with an `obj://` reference. References are
//! accepted anywhere a video path is, so edits can be chained without
//! re-encoding between steps: clips are lazy graphs that are rendered in
//! one FFmpeg invocation when finally written.

pub mod clip;
pub mod engine;
pub mod envelope;
pub mod ffmpeg;
pub mod handler;
pub mod output;
pub mod params;
pub mod probe;
pub mod render;
pub mod server;
pub mod store;

#[cfg(test)]
mod testing;

pub use clip::{Clip, ClipMeta, Frame, Layer, WriteOptions};
pub use engine::MediaEngine;
pub use envelope::{ToolResponse, VideoInfo};
pub use ffmpeg::FfmpegEngine;
pub use handler::VideoEditHandler;
pub use output::OutputResolver;
pub use server::{TOOL_NAMES, VideoEditServer, tool_definitions};
pub use store::{Identifier, ObjectRef, ObjectStore, StoredObject};
