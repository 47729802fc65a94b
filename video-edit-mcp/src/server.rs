//! MCP server for the video editing tools.
//!
//! Tool calls are dispatched by name to [`VideoEditHandler`]. Every tool
//! answers with a [`ToolResponse`] serialized as a single text block; only
//! arguments that fail to deserialize surface as protocol errors.

use crate::envelope::ToolResponse;
use crate::handler::VideoEditHandler;
use crate::params::*;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{
        CallToolResult, Content, ListResourcesResult, ReadResourceResult, ServerCapabilities,
        ServerInfo,
    },
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use video_edit_mcp_common::config::Config;
use video_edit_mcp_common::error::Error;

/// MCP server for video editing.
#[derive(Clone)]
pub struct VideoEditServer {
    /// Created on first use; tool calls never hold a lock while running
    handler: Arc<OnceCell<VideoEditHandler>>,
    config: Config,
}

impl VideoEditServer {
    pub fn new(config: Config) -> Self {
        Self {
            handler: Arc::new(OnceCell::new()),
            config,
        }
    }

    /// Create a server around an existing handler (for testing).
    pub fn with_handler(config: Config, handler: VideoEditHandler) -> Self {
        Self {
            handler: Arc::new(OnceCell::new_with(Some(handler))),
            config,
        }
    }

    async fn handler(&self) -> Result<&VideoEditHandler, Error> {
        self.handler
            .get_or_try_init(|| VideoEditHandler::new(&self.config))
            .await
    }

    /// Run the named tool with raw JSON arguments.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<CallToolResult, McpError> {
        if !TOOL_NAMES.contains(&name) {
            return Err(McpError::invalid_params(
                format!("Unknown tool: {}", name),
                None,
            ));
        }

        let handler = self.handler().await.map_err(|e| {
            McpError::internal_error(format!("Failed to initialize handler: {}", e), None)
        })?;

        let response = match name {
            "get_video_info" => handler.get_video_info(parse_params(arguments)?).await,
            "trim_video" => handler.trim_video(parse_params(arguments)?).await,
            "merge_video" => handler.merge_video(parse_params(arguments)?).await,
            "resize_video" => handler.resize_video(parse_params(arguments)?).await,
            "crop_video" => handler.crop_video(parse_params(arguments)?).await,
            "rotate_video" => handler.rotate_video(parse_params(arguments)?).await,
            "speed_up_video" => handler.speed_up_video(parse_params(arguments)?).await,
            "add_audio" => handler.add_audio(parse_params(arguments)?).await,
            "fadein_video" => handler.fadein_video(parse_params(arguments)?).await,
            "fadeout_video" => handler.fadeout_video(parse_params(arguments)?).await,
            "add_text_overlay" => handler.add_text_overlay(parse_params(arguments)?).await,
            "add_image_overlay" => handler.add_image_overlay(parse_params(arguments)?).await,
            "grayscale_video" => handler.grayscale_video(parse_params(arguments)?).await,
            "images_to_video" => handler.images_to_video(parse_params(arguments)?).await,
            "extract_frames" => handler.extract_frames(parse_params(arguments)?).await,
            "mirror_video" => handler.mirror_video(parse_params(arguments)?).await,
            "split_video_at_times" => {
                handler.split_video_at_times(parse_params(arguments)?).await
            }
            "convert_video_format" => {
                handler.convert_video_format(parse_params(arguments)?).await
            }
            "add_video_overlay" => handler.add_video_overlay(parse_params(arguments)?).await,
            "release_object" => handler.release_object(parse_params(arguments)?).await,
            _ => {
                return Err(McpError::invalid_params(
                    format!("Unknown tool: {}", name),
                    None,
                ));
            }
        };

        debug!(tool = name, success = response.success, "Tool finished");
        Ok(into_call_result(&response))
    }
}

/// Names of every tool, in listing order.
pub const TOOL_NAMES: &[&str] = &[
    "get_video_info",
    "trim_video",
    "merge_video",
    "resize_video",
    "crop_video",
    "rotate_video",
    "speed_up_video",
    "add_audio",
    "fadein_video",
    "fadeout_video",
    "add_text_overlay",
    "add_image_overlay",
    "grayscale_video",
    "images_to_video",
    "extract_frames",
    "mirror_video",
    "split_video_at_times",
    "convert_video_format",
    "add_video_overlay",
    "release_object",
];

/// Tool definitions advertised by `list_tools`.
pub fn tool_definitions() -> Vec<rmcp::model::Tool> {
    vec![
        create_tool::<GetVideoInfoParams>(
            "get_video_info",
            "Get duration, fps, size, codecs and file details of a video file or stored object.",
        ),
        create_tool::<TrimVideoParams>(
            "trim_video",
            "Keep only the part of a video between start_time and end_time (seconds).",
        ),
        create_tool::<MergeVideoParams>(
            "merge_video",
            "Concatenate two videos one after the other.",
        ),
        create_tool::<ResizeVideoParams>(
            "resize_video",
            "Scale a video to [width, height] pixels.",
        ),
        create_tool::<CropVideoParams>(
            "crop_video",
            "Crop a video to the rectangle from (x1, y1) to (x2, y2).",
        ),
        create_tool::<RotateVideoParams>(
            "rotate_video",
            "Rotate a video counter-clockwise by angle degrees.",
        ),
        create_tool::<SpeedVideoParams>(
            "speed_up_video",
            "Change playback speed by a factor; values above 1 speed up.",
        ),
        create_tool::<AddAudioParams>(
            "add_audio",
            "Replace the soundtrack of a video with another file's audio.",
        ),
        create_tool::<FadeVideoParams>(
            "fadein_video",
            "Fade a video in from black over fade_duration seconds.",
        ),
        create_tool::<FadeVideoParams>(
            "fadeout_video",
            "Fade a video out to black over its last fade_duration seconds.",
        ),
        create_tool::<TextOverlayParams>(
            "add_text_overlay",
            "Draw text over a video at (x, y) for duration seconds. Text is rendered with ImageMagick.",
        ),
        create_tool::<ImageOverlayParams>(
            "add_image_overlay",
            "Draw an image over a video at (x, y) for duration seconds.",
        ),
        create_tool::<VideoFilterParams>(
            "grayscale_video",
            "Convert a video to grayscale.",
        ),
        create_tool::<ImagesToVideoParams>(
            "images_to_video",
            "Build a video from the images in a folder, in file name order, at the given fps.",
        ),
        create_tool::<ExtractFramesParams>(
            "extract_frames",
            "Extract frames between start_time and end_time to a folder of PNG files or to a stored object.",
        ),
        create_tool::<VideoFilterParams>(
            "mirror_video",
            "Flip a video horizontally.",
        ),
        create_tool::<SplitVideoParams>(
            "split_video_at_times",
            "Split a video at the given times into consecutive parts.",
        ),
        create_tool::<ConvertFormatParams>(
            "convert_video_format",
            "Re-encode a video with another codec, frame rate or bitrate.",
        ),
        create_tool::<VideoOverlayParams>(
            "add_video_overlay",
            "Place one video over another (picture-in-picture) with optional opacity.",
        ),
        create_tool::<ReleaseObjectParams>(
            "release_object",
            "Drop a stored object so its memory can be reclaimed.",
        ),
    ]
}

impl ServerHandler for VideoEditServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Video editing server using FFmpeg. Every tool can write its result to a file \
                 (return_path=true) or keep it in memory as an obj:// reference that later \
                 tools accept wherever a video path is expected."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::ListToolsResult, McpError>> + Send + '_
    {
        async move {
            Ok(rmcp::model::ListToolsResult {
                tools: tool_definitions(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { self.dispatch(params.name.as_ref(), params.arguments).await }
    }

    fn list_resources(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            Ok(ListResourcesResult {
                resources: vec![],
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn read_resource(
        &self,
        params: rmcp::model::ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            Err(McpError::resource_not_found(
                format!("Unknown resource: {}", params.uri),
                None,
            ))
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn into_call_result(response: &ToolResponse) -> CallToolResult {
    let content = vec![Content::text(response.to_json())];
    if response.success {
        CallToolResult::success(content)
    } else {
        CallToolResult::error(content)
    }
}

/// Create a tool definition from a parameter type.
fn create_tool<T: JsonSchema>(name: &'static str, description: &'static str) -> rmcp::model::Tool {
    use schemars::schema_for;

    let schema = schema_for!(T);
    let schema_value = serde_json::to_value(&schema).unwrap_or_default();

    let input_schema = match schema_value {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    };

    rmcp::model::Tool {
        name: Cow::Borrowed(name),
        description: Some(Cow::Borrowed(description)),
        input_schema,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }
}

/// Parse tool parameters from JSON arguments.
fn parse_params<T: for<'de> Deserialize<'de>>(
    arguments: Option<serde_json::Map<String, serde_json::Value>>,
) -> Result<T, McpError> {
    arguments
        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
        .transpose()
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))?
        .ok_or_else(|| McpError::invalid_params("Missing parameters", None))
}

// =============================================================================
// Tests
// =============================================================================
