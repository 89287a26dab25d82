//! Tool catalog types and the tag-protocol parser

pub mod errors;
pub mod parser;
pub mod types;

pub use errors::{ToolErrorKind, ToolParseError};
pub use parser::{DEFAULT_MAX_MISTAKES, StreamEvent, ToolCallParser};
pub use types::{
    InputSchema, ParamType, ParseResult, PropertySchema, ToolCall, ToolDefinition, ToolOutcome,
};
