//! Tool schema validity tests.
//!
//! Every registered tool must carry a description and an object schema
//! that lists its required arguments.

use serde_json::Value;

/// Validates that a JSON schema has the required structure.
fn validate_json_schema(schema: &Value) -> Result<(), String> {
    let obj = schema
        .as_object()
        .ok_or_else(|| "Schema must be an object".to_string())?;

    if let Some(type_val) = obj.get("type") {
        if type_val != "object" {
            return Err(format!("Expected type 'object', got {:?}", type_val));
        }
    }

    if let Some(properties) = obj.get("properties") {
        if !properties.is_object() {
            return Err("Properties must be an object".to_string());
        }
    }

    Ok(())
}

/// Validates that a tool has required fields.
fn validate_tool(tool: &rmcp::model::Tool) -> Result<(), String> {
    if tool.name.is_empty() {
        return Err("Tool name cannot be empty".to_string());
    }

    if tool.description.as_ref().is_none_or(|d| d.is_empty()) {
        return Err(format!("Tool '{}' must have a description", tool.name));
    }

    if tool.input_schema.is_empty() {
        return Err(format!("Tool '{}' must have an input schema", tool.name));
    }

    let schema_value = serde_json::to_value(&*tool.input_schema)
        .map_err(|e| format!("Failed to serialize schema: {}", e))?;
    validate_json_schema(&schema_value)?;

    Ok(())
}

fn required(tool: &rmcp::model::Tool) -> Vec<String> {
    tool.input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn properties(tool: &rmcp::model::Tool) -> Vec<String> {
    tool.input_schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use video_edit_mcp::{TOOL_NAMES, tool_definitions};

    fn tool(name: &str) -> rmcp::model::Tool {
        tool_definitions()
            .into_iter()
            .find(|t| t.name == name)
            .unwrap_or_else(|| panic!("tool {} not registered", name))
    }

    #[test]
    fn test_json_schema_validation() {
        let valid_schema = serde_json::json!({
            "type": "object",
            "properties": { "video_path": { "type": "string" } },
            "required": ["video_path"]
        });
        assert!(validate_json_schema(&valid_schema).is_ok());

        let invalid_schema = serde_json::json!({ "type": "string" });
        assert!(validate_json_schema(&invalid_schema).is_err());
    }

    #[test]
    fn test_every_tool_is_valid() {
        for tool in tool_definitions() {
            let result = validate_tool(&tool);
            assert!(result.is_ok(), "{:?}", result.err());
        }
    }

    #[test]
    fn test_registered_names() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), TOOL_NAMES.len());
        for name in TOOL_NAMES {
            assert!(tools.iter().any(|t| t.name == *name), "missing {}", name);
        }
    }

    #[test]
    fn test_editing_tools_expose_output_fields() {
        for name in TOOL_NAMES {
            if matches!(*name, "get_video_info" | "extract_frames" | "release_object") {
                continue;
            }
            let props = properties(&tool(name));
            assert!(props.contains(&"output_name".to_string()), "{} lacks output_name", name);
            assert!(props.contains(&"return_path".to_string()), "{} lacks return_path", name);
            assert!(
                !required(&tool(name)).contains(&"return_path".to_string()),
                "{} must default return_path",
                name
            );
        }
    }

    #[test]
    fn test_required_arguments() {
        assert_eq!(required(&tool("get_video_info")), vec!["video_path"]);

        let trim = required(&tool("trim_video"));
        for field in ["video_path", "start_time", "end_time"] {
            assert!(trim.contains(&field.to_string()), "trim_video requires {}", field);
        }

        let overlay = required(&tool("add_video_overlay"));
        assert!(overlay.contains(&"base_video_path".to_string()));
        assert!(overlay.contains(&"overlay_video_path".to_string()));
        assert!(!overlay.contains(&"opacity".to_string()));

        let text = required(&tool("add_text_overlay"));
        assert!(text.contains(&"text".to_string()));
        assert!(!text.contains(&"font_size".to_string()));
        assert!(!text.contains(&"path_of_imagemagick".to_string()));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use video_edit_mcp::tool_definitions;

    proptest! {
        /// Tool names are snake_case identifiers.
        #[test]
        fn tool_names_are_snake_case(index in 0usize..20) {
            let tools = tool_definitions();
            let tool = &tools[index % tools.len()];
            let name = tool.name.as_ref();
            prop_assert!(name.chars().next().is_some_and(|c| c.is_ascii_lowercase()));
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }

        /// Every required argument is also a declared property.
        #[test]
        fn required_fields_are_declared(index in 0usize..20) {
            let tools = tool_definitions();
            let tool = &tools[index % tools.len()];
            let props = properties(tool);
            for field in required(tool) {
                prop_assert!(props.contains(&field), "{} requires undeclared {}", tool.name, field);
            }
        }
    }
}
