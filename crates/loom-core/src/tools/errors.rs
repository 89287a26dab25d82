//! Tool-call protocol errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a protocol violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorKind {
    UnknownTool,
    MalformedXml,
    SchemaValidation,
    MaxMistakes,
}

impl ToolErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::UnknownTool => "UNKNOWN_TOOL",
            Self::MalformedXml => "MALFORMED_XML",
            Self::SchemaValidation => "SCHEMA_VALIDATION",
            Self::MaxMistakes => "MAX_MISTAKES",
        }
    }
}

/// A classified tool-call parse failure
///
/// Every variant carries enough text to be fed back to the model as a
/// corrective instruction on the next turn.
#[derive(Debug, Clone, Error)]
pub enum ToolParseError {
    #[error("Unknown tool '{name}'. Available tools: {available}")]
    UnknownTool {
        name: String,
        available: String,
        example: Option<String>,
    },

    #[error("Malformed tool call: {message}")]
    MalformedXml {
        message: String,
        example: Option<String>,
    },

    #[error("Invalid parameters for '{tool}': {message}")]
    SchemaValidation {
        tool: String,
        message: String,
        example: String,
    },

    #[error("Too many consecutive tool-call mistakes ({count}); last error: {last}")]
    MaxMistakes { count: u32, last: Box<ToolParseError> },
}

impl ToolParseError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            Self::UnknownTool { .. } => ToolErrorKind::UnknownTool,
            Self::MalformedXml { .. } => ToolErrorKind::MalformedXml,
            Self::SchemaValidation { .. } => ToolErrorKind::SchemaValidation,
            Self::MaxMistakes { .. } => ToolErrorKind::MaxMistakes,
        }
    }

    /// Whether the agent loop must stop instead of retrying
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MaxMistakes { .. })
    }

    /// Message to send back to the model, including a correct example
    pub fn corrective_message(&self) -> String {
        match self {
            Self::UnknownTool { example, .. } => match example {
                Some(example) => format!(
                    "[{}] {}\nUse one of the available tools, for example:\n{}",
                    self.kind().code(),
                    self,
                    example
                ),
                None => format!(
                    "[{}] {}\nUse one of the available tools with the syntax <tool_name>{{...}}</tool_name>.",
                    self.kind().code(),
                    self
                ),
            },
            Self::MalformedXml { example, .. } => match example {
                Some(example) => format!(
                    "[{}] {}\nExpected format:\n{}",
                    self.kind().code(),
                    self,
                    example
                ),
                None => format!(
                    "[{}] {}\nWrap each tool call as <tool_name>{{\"param\": \"value\"}}</tool_name>.",
                    self.kind().code(),
                    self
                ),
            },
            Self::SchemaValidation { example, .. } => format!(
                "[{}] {}\nExpected format:\n{}",
                self.kind().code(),
                self,
                example
            ),
            Self::MaxMistakes { .. } => format!(
                "[{}] {}\nStopping: the tool-call protocol was violated too many times.",
                self.kind().code(),
                self
            ),
        }
    }
}
