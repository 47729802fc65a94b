//! Input parameter validation tests.
//!
//! Invalid arguments come back as a `success: false` envelope with
//! `error_type: "ValidationError"`; undecodable arguments are MCP errors.

#[cfg(test)]
mod tests {
    use crate::server_startup::test_config;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use video_edit_mcp::VideoEditServer;
    use video_edit_mcp::params::*;

    async fn call(server: &VideoEditServer, tool: &str, args: Value) -> Value {
        let result = server
            .dispatch(tool, args.as_object().cloned())
            .await
            .expect("arguments decode");
        match &result.content[0].raw {
            rmcp::model::RawContent::Text(text) => serde_json::from_str(&text.text).unwrap(),
            other => panic!("expected text content, got {:?}", other),
        }
    }

    #[test]
    fn test_trim_rejects_inverted_range() {
        let params = TrimVideoParams {
            video_path: "in.mp4".to_string(),
            start_time: 5.0,
            end_time: 1.0,
            output: OutputParams::to_path("out.mp4"),
        };
        let errors = params.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "end_time"));
    }

    #[test]
    fn test_resize_rejects_zero_dimension() {
        let params = ResizeVideoParams {
            video_path: "in.mp4".to_string(),
            size: [0, 480],
            output: OutputParams::to_object(),
        };
        let errors = params.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "size"));
    }

    #[test]
    fn test_overlay_rejects_opacity_out_of_range() {
        let params = VideoOverlayParams {
            base_video_path: "a.mp4".to_string(),
            overlay_video_path: "b.mp4".to_string(),
            x: 0,
            y: 0,
            opacity: 2.0,
            duration: 1.0,
            output: OutputParams::to_object(),
        };
        let errors = params.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "opacity"));
    }

    #[tokio::test]
    async fn test_validation_failures_use_envelope() {
        let dir = TempDir::new().unwrap();
        let server = VideoEditServer::new(test_config(&dir));

        let cases = [
            ("trim_video", json!({ "video_path": "in.mp4", "start_time": 3, "end_time": 1, "output_name": "o.mp4" })),
            ("fadein_video", json!({ "video_path": "in.mp4", "fade_duration": 0, "output_name": "o.mp4" })),
            ("images_to_video", json!({ "images_folder_path": "", "fps": 24, "output_name": "o.mp4" })),
            ("split_video_at_times", json!({ "video_path": "in.mp4", "split_times": [3, 1], "output_name": "o.mp4" })),
            ("grayscale_video", json!({ "video_path": "in.mp4", "output_name": "" })),
            ("mirror_video", json!({ "video_path": "obj://garbage", "return_path": false })),
        ];

        for (tool, args) in cases {
            let body = call(&server, tool, args).await;
            assert_eq!(body["success"], false, "{} should fail", tool);
            assert_eq!(body["error_type"], "ValidationError", "{}", tool);
            assert!(body["message"].as_str().unwrap().starts_with("Invalid"));
        }
        assert!(!dir.path().join("output").exists(), "nothing was written");
    }

    #[tokio::test]
    async fn test_undecodable_arguments_are_protocol_errors() {
        let dir = TempDir::new().unwrap();
        let server = VideoEditServer::new(test_config(&dir));

        let wrong_type = json!({ "video_path": "in.mp4", "speed": "fast", "output_name": "o.mp4" });
        assert!(server.dispatch("speed_up_video", wrong_type.as_object().cloned()).await.is_err());

        let missing = json!({ "video_path": "in.mp4" });
        assert!(server.dispatch("trim_video", missing.as_object().cloned()).await.is_err());

        assert!(server.dispatch("trim_video", None).await.is_err());
    }
}

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;
    use video_edit_mcp::params::*;

    proptest! {
        /// Negative or zero fade durations never validate.
        #[test]
        fn fade_duration_must_be_positive(duration in -100.0f64..=0.0) {
            let params = FadeVideoParams {
                video_path: "in.mp4".to_string(),
                fade_duration: duration,
                output: OutputParams::to_object(),
            };
            prop_assert!(params.validate().is_err());
        }

        /// Crop regions validate exactly when they are non-empty.
        #[test]
        fn crop_region_ordering(x1 in 0i64..500, y1 in 0i64..500, w in -50i64..50, h in -50i64..50) {
            let params = CropVideoParams {
                video_path: "in.mp4".to_string(),
                x1,
                y1,
                x2: x1 + w,
                y2: y1 + h,
                output: OutputParams::to_object(),
            };
            prop_assert_eq!(params.validate().is_ok(), w > 0 && h > 0);
        }

        /// Split times validate when positive and strictly increasing.
        #[test]
        fn split_times_must_increase(mut times in prop::collection::vec(0.1f64..100.0, 1..8)) {
            times.sort_by(|a, b| a.partial_cmp(b).unwrap());
            times.dedup();
            let params = SplitVideoParams {
                video_path: "in.mp4".to_string(),
                split_times: times.clone(),
                output: OutputParams::to_object(),
            };
            prop_assert!(params.validate().is_ok());

            times.reverse();
            if times.len() > 1 {
                let reversed = SplitVideoParams { split_times: times, ..params };
                prop_assert!(reversed.validate().is_err());
            }
        }
    }
}
