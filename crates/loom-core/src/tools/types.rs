//! Tool-related type definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primitive parameter type declared in a tool schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Whether a JSON value satisfies this declared type
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Placeholder value used when generating a usage example
    pub fn example_value(self, name: &str) -> Value {
        match self {
            Self::String => Value::String(format!("<{}>", name)),
            Self::Number | Self::Integer => Value::from(1),
            Self::Boolean => Value::Bool(true),
            Self::Array => Value::Array(Vec::new()),
            Self::Object => Value::Object(Map::new()),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        };
        write!(f, "{}", name)
    }
}

/// Schema of a single parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Declared type; untyped parameters accept any value
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<ParamType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// JSON-schema-like input description of a tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
}

/// A tool the model may invoke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", alias = "input_schema", default)]
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::default(),
        }
    }

    /// Add a required parameter
    pub fn required_param(mut self, name: impl Into<String>, param_type: ParamType) -> Self {
        let name = name.into();
        self.input_schema.required.push(name.clone());
        self.input_schema.properties.insert(
            name,
            PropertySchema {
                param_type: Some(param_type),
                description: None,
            },
        );
        self
    }

    /// Add an optional parameter
    pub fn optional_param(mut self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.input_schema.properties.insert(
            name.into(),
            PropertySchema {
                param_type: Some(param_type),
                description: None,
            },
        );
        self
    }

    /// Declared type of a parameter, if any
    pub fn param_type(&self, name: &str) -> Option<ParamType> {
        self.input_schema
            .properties
            .get(name)
            .and_then(|p| p.param_type)
    }

    /// A correct invocation of this tool in the tag protocol
    pub fn usage_example(&self) -> String {
        let mut example = Map::new();
        for name in &self.input_schema.required {
            let value = self
                .param_type(name)
                .unwrap_or(ParamType::String)
                .example_value(name);
            example.insert(name.clone(), value);
        }
        let body = serde_json::to_string(&Value::Object(example)).unwrap_or_else(|_| "{}".into());
        format!("<{name}>{body}</{name}>", name = self.name, body = body)
    }
}

/// A tool invocation parsed out of model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// Parsed parameters
    pub input: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, input: Map<String, Value>) -> Self {
        Self {
            id: format!("toolu_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            input,
        }
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(Value::as_str)
    }

    /// The argument that best describes what the call acts on
    pub fn target(&self) -> Option<&str> {
        ["file_path", "path", "command", "query", "pattern", "url"]
            .iter()
            .find_map(|key| self.get_string(key))
    }
}

/// Output of one parse
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Model prose with tool-call blocks removed
    pub text: String,
    /// Tool calls in order of appearance
    pub tool_calls: Vec<ToolCall>,
    pub has_tool_calls: bool,
}

/// Result of executing a tool, as reported back by the agent loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}
