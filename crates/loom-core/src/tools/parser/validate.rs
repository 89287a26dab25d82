//! Schema validation for parsed tool input

use serde_json::{Map, Value};

use crate::tools::errors::ToolParseError;
use crate::tools::types::ToolDefinition;

/// Check required parameters and declared primitive types
pub(super) fn validate_input(
    tool: &ToolDefinition,
    input: &Map<String, Value>,
) -> Result<(), ToolParseError> {
    let missing: Vec<&str> = tool
        .input_schema
        .required
        .iter()
        .filter(|name| !input.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();

    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!(
            "missing required parameter{} {}",
            if missing.len() == 1 { "" } else { "s" },
            missing
                .iter()
                .map(|name| format!("'{}'", name))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    for (name, value) in input {
        if let Some(expected) = tool.param_type(name) {
            if !expected.matches(value) {
                problems.push(format!("parameter '{}' must be a {}", name, expected));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ToolParseError::SchemaValidation {
            tool: tool.name.clone(),
            message: problems.join("; "),
            example: tool.usage_example(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::ParamType;
    use serde_json::json;

    fn write_file() -> ToolDefinition {
        ToolDefinition::new("write_file", "Write a file")
            .required_param("file_path", ParamType::String)
            .required_param("content", ParamType::String)
            .optional_param("append", ParamType::Boolean)
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_input() {
        let input = object(json!({"file_path": "a.txt", "content": "hi", "extra": 1}));
        assert!(validate_input(&write_file(), &input).is_ok());
    }

    #[test]
    fn test_missing_and_mistyped() {
        let input = object(json!({"file_path": "a.txt", "append": "yes"}));
        let err = validate_input(&write_file(), &input).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("missing required parameter 'content'"));
        assert!(text.contains("parameter 'append' must be a boolean"));
    }
}
