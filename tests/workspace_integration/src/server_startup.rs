//! Server startup integration tests.
//!
//! The server must be constructible without FFmpeg installed; the media
//! engine is only created on the first tool call.

#[cfg(test)]
use tempfile::TempDir;
#[cfg(test)]
use video_edit_mcp_common::Config;

/// Configuration rooted in throwaway directories.
#[cfg(test)]
pub(crate) fn test_config(dir: &TempDir) -> Config {
    Config::default()
        .with_output_dir(dir.path().join("output"))
        .with_work_dir(dir.path().join("work"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::ServerHandler;
    use video_edit_mcp::VideoEditServer;

    #[test]
    fn test_server_startup() {
        let dir = TempDir::new().unwrap();
        let server = VideoEditServer::new(test_config(&dir));
        let info = server.get_info();

        let instructions = info.instructions.as_ref().unwrap().to_lowercase();
        assert!(instructions.contains("video"));
        assert!(instructions.contains("obj://"));
    }

    #[test]
    fn test_server_has_tools_capability() {
        let dir = TempDir::new().unwrap();
        let info = VideoEditServer::new(test_config(&dir)).get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_none());
    }

    #[test]
    fn test_server_creation_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let _server = VideoEditServer::new(test_config(&dir));
        assert!(!dir.path().join("work").exists());
        assert!(!dir.path().join("output").exists());
    }

    #[tokio::test]
    async fn test_first_call_creates_work_dir() {
        let dir = TempDir::new().unwrap();
        let server = VideoEditServer::new(test_config(&dir));
        let args = serde_json::json!({ "reference": "not-a-reference" });
        let result = server
            .dispatch("release_object", args.as_object().cloned())
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(dir.path().join("work").is_dir());
    }
}
