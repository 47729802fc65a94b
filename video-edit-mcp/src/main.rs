//! Video Edit MCP Server
//!
//! MCP server exposing FFmpeg-backed video editing tools.
//!
//! # Usage
//!
//! ```bash
//! # Run with stdio transport (default)
//! video-edit-mcp
//!
//! # Run with HTTP transport
//! video-edit-mcp --transport http --port 8080
//!
//! # Write results somewhere other than $OUTPUT_DIR
//! video-edit-mcp --output-dir ./renders
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use video_edit_mcp::VideoEditServer;
use video_edit_mcp_common::tracing::init_tracing;
use video_edit_mcp_common::{Config, McpServerBuilder, TransportArgs};

#[derive(Parser, Debug)]
#[command(name = "video-edit-mcp")]
#[command(about = "MCP server for video editing using FFmpeg")]
#[command(version)]
struct Args {
    #[command(flatten)]
    transport: TransportArgs,

    /// Directory for files written by tools (overrides the environment)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(output_dir) = args.output_dir {
        config = config.with_output_dir(output_dir);
    }

    tracing::info!(
        output_dir = %config.output_dir.display(),
        ffmpeg = %config.ffmpeg_path.display(),
        "Starting video-edit-mcp server"
    );

    let server = VideoEditServer::new(config);
    let transport = args.transport.into_transport();

    McpServerBuilder::new(server)
        .with_transport(transport)
        .run()
        .await?;

    Ok(())
}
