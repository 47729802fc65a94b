//! Workspace-level integration tests for the video editing MCP server.
//!
//! These tests verify:
//! - The server starts and advertises its capabilities
//! - Tool registration and schema generation
//! - Invalid input is rejected before any media work happens
//! - Every tool answers with the same JSON envelope

pub mod server_startup;
pub mod tool_schema;
pub mod input_validation;
pub mod output_format;
