//! Output format tests.
//!
//! Every tool answers with one text content block holding the JSON result
//! envelope. Successful results carry exactly one output field; failures
//! carry `error`, `error_type` and `message` and are flagged `is_error`.

use rmcp::model::{CallToolResult, RawContent};
use serde_json::Value;

const OUTPUT_FIELDS: [&str; 5] = [
    "output_path",
    "output_object",
    "output_paths",
    "output_objects",
    "video_info",
];

/// Extract the envelope from a tool result.
fn envelope(result: &CallToolResult) -> Result<Value, String> {
    if result.content.len() != 1 {
        return Err(format!("expected one content block, got {}", result.content.len()));
    }
    match &result.content[0].raw {
        RawContent::Text(text) => {
            serde_json::from_str(&text.text).map_err(|e| format!("not JSON: {}", e))
        }
        _ => Err("envelope must be text content".to_string()),
    }
}

/// Validates the envelope shape against the result's error flag.
fn validate_envelope(result: &CallToolResult) -> Result<(), String> {
    let body = envelope(result)?;
    let success = body["success"]
        .as_bool()
        .ok_or_else(|| "missing success flag".to_string())?;

    if success == result.is_error.unwrap_or(false) {
        return Err("is_error must mirror success".to_string());
    }

    let outputs = OUTPUT_FIELDS
        .iter()
        .filter(|field| body.get(**field).is_some())
        .count();

    if success {
        if body.get("error").is_some() || body.get("error_type").is_some() {
            return Err("successful result carries error fields".to_string());
        }
        if outputs > 1 {
            return Err(format!("expected at most one output field, got {}", outputs));
        }
    } else {
        if outputs != 0 {
            return Err("failed result carries output fields".to_string());
        }
        for field in ["error", "error_type", "message"] {
            if !body[field].is_string() {
                return Err(format!("failed result lacks {}", field));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_startup::test_config;
    use rmcp::model::Content;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;
    use video_edit_mcp::VideoEditServer;
    use video_edit_mcp::{ObjectRef, ToolResponse};

    fn result_for(response: &ToolResponse) -> CallToolResult {
        let content = vec![Content::text(response.to_json())];
        if response.success {
            CallToolResult::success(content)
        } else {
            CallToolResult::error(content)
        }
    }

    #[test]
    fn test_success_envelopes_are_valid() {
        let responses = [
            ToolResponse::path(Path::new("/out/a.mp4"), "Video trimmed successfully"),
            ToolResponse::object(ObjectRef::new(), "Video trimmed successfully"),
            ToolResponse::objects(&[ObjectRef::new(), ObjectRef::new()], "Video split successfully"),
            ToolResponse::done("Released"),
        ];
        for response in &responses {
            let result = validate_envelope(&result_for(response));
            assert!(result.is_ok(), "{:?}: {:?}", response, result.err());
        }
    }

    #[test]
    fn test_is_error_must_mirror_success() {
        let response = ToolResponse::path(Path::new("/out/a.mp4"), "ok");
        let mismatched = CallToolResult::error(vec![Content::text(response.to_json())]);
        assert!(validate_envelope(&mismatched).is_err());
    }

    #[test]
    fn test_non_json_content_fails() {
        let result = CallToolResult::success(vec![Content::text("Video trimmed")]);
        assert!(validate_envelope(&result).is_err());
    }

    #[tokio::test]
    async fn test_server_failures_are_valid_envelopes() {
        let dir = TempDir::new().unwrap();
        let server = VideoEditServer::new(test_config(&dir));
        let missing = dir.path().join("missing.mp4").display().to_string();

        let calls = [
            ("get_video_info", json!({ "video_path": missing })),
            ("trim_video", json!({ "video_path": missing, "start_time": 0, "end_time": 1, "return_path": false })),
            ("release_object", json!({ "reference": ObjectRef::new().to_string() })),
            ("crop_video", json!({ "video_path": "in.mp4", "x1": 5, "y1": 5, "x2": 1, "y2": 1, "return_path": false })),
        ];

        for (tool, args) in calls {
            let result = server.dispatch(tool, args.as_object().cloned()).await.unwrap();
            assert_eq!(result.is_error, Some(true), "{}", tool);
            let check = validate_envelope(&result);
            assert!(check.is_ok(), "{}: {:?}", tool, check.err());
        }
    }

    #[tokio::test]
    async fn test_unknown_reference_reports_resolution_error() {
        let dir = TempDir::new().unwrap();
        let server = VideoEditServer::new(test_config(&dir));
        let args = json!({ "video_path": ObjectRef::new().to_string(), "return_path": false });
        let result = server
            .dispatch("mirror_video", args.as_object().cloned())
            .await
            .unwrap();
        let body = envelope(&result).unwrap();
        assert_eq!(body["error_type"], "ResolutionError");
        assert_eq!(body["message"], "Error mirroring video");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use rmcp::model::Content;
    use std::path::PathBuf;
    use video_edit_mcp::ToolResponse;
    use video_edit_mcp_common::Error;

    fn message_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 .,!?]{1,80}"
    }

    proptest! {
        /// Path results always produce a valid success envelope.
        #[test]
        fn path_results_are_valid(name in "[a-z0-9_]{1,20}", message in message_strategy()) {
            let path = PathBuf::from("/out").join(format!("{}.mp4", name));
            let response = ToolResponse::path(&path, &message);
            let result = CallToolResult::success(vec![Content::text(response.to_json())]);
            prop_assert!(validate_envelope(&result).is_ok());
            let body = envelope(&result).unwrap();
            prop_assert_eq!(body["output_path"].as_str(), Some(path.to_str().unwrap()));
        }

        /// Engine failures always produce a valid failure envelope.
        #[test]
        fn failures_are_valid(detail in message_strategy(), message in message_strategy()) {
            let response = ToolResponse::failure(&message, &Error::engine(detail));
            let result = CallToolResult::error(vec![Content::text(response.to_json())]);
            prop_assert!(validate_envelope(&result).is_ok());
            let body = envelope(&result).unwrap();
            prop_assert_eq!(body["error_type"].as_str(), Some("EngineError"));
        }
    }
}
