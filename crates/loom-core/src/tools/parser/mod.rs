//! Tool-call parser for the XML tag protocol
//!
//! The model invokes a tool by writing `<tool_name>...</tool_name>` in its
//! reply, with either a JSON object or `<param>value</param>` pairs inside.
//! Parsing fails loudly instead of guessing: every violation is classified
//! and counted, and the caller feeds the error back to the model.

mod params;
mod streaming;
mod validate;

use tracing::{debug, warn};

use crate::grammar::{self, EXCESS_NEWLINES, LOOSE_TAG_PAIR};
use crate::tools::errors::ToolParseError;
use crate::tools::types::{ParseResult, ToolCall, ToolDefinition};

pub use streaming::StreamEvent;
use streaming::StreamState;

/// Consecutive protocol violations tolerated before aborting
pub const DEFAULT_MAX_MISTAKES: u32 = 3;

/// Stateful parser for one conversation
///
/// The mistake counter persists across calls. A successful parse does not
/// reset it; callers reset explicitly after a good turn.
#[derive(Debug, Clone)]
pub struct ToolCallParser {
    tools: Vec<ToolDefinition>,
    mistakes: u32,
    max_mistakes: u32,
    stream: StreamState,
}

impl ToolCallParser {
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self {
            tools,
            mistakes: 0,
            max_mistakes: DEFAULT_MAX_MISTAKES,
            stream: StreamState::default(),
        }
    }

    pub fn with_max_mistakes(mut self, max_mistakes: u32) -> Self {
        self.max_mistakes = max_mistakes.max(1);
        self
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Replace the tool catalog
    pub fn update_tools(&mut self, tools: Vec<ToolDefinition>) {
        debug!(count = tools.len(), "Tool catalog updated");
        self.tools = tools;
    }

    pub fn mistake_count(&self) -> u32 {
        self.mistakes
    }

    pub fn max_mistakes(&self) -> u32 {
        self.max_mistakes
    }

    pub fn reset_mistakes(&mut self) {
        self.mistakes = 0;
    }

    fn find_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    fn available_names(&self) -> String {
        if self.tools.is_empty() {
            return "(none)".to_string();
        }
        self.tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Parse a complete model response
    pub fn parse_response(&mut self, raw: &str) -> Result<ParseResult, ToolParseError> {
        match self.parse_inner(raw) {
            Ok(result) => {
                debug!(tool_calls = result.tool_calls.len(), "Parsed model response");
                Ok(result)
            }
            Err(err) => Err(self.record_mistake(err)),
        }
    }

    fn record_mistake(&mut self, err: ToolParseError) -> ToolParseError {
        self.mistakes += 1;
        warn!(
            kind = err.kind().code(),
            mistakes = self.mistakes,
            max = self.max_mistakes,
            "Tool-call protocol violation: {}",
            err
        );

        if self.mistakes >= self.max_mistakes {
            ToolParseError::MaxMistakes {
                count: self.mistakes,
                last: Box::new(err),
            }
        } else {
            err
        }
    }

    fn parse_inner(&self, raw: &str) -> Result<ParseResult, ToolParseError> {
        let mut tool_calls = Vec::new();
        let mut clean = String::with_capacity(raw.len());
        let mut cursor = 0;

        for pair in grammar::tag_pairs(raw) {
            let Some(tool) = self.find_tool(pair.name) else {
                return Err(ToolParseError::UnknownTool {
                    name: pair.name.to_string(),
                    available: self.available_names(),
                    example: self.tools.first().map(ToolDefinition::usage_example),
                });
            };

            let input = params::parse_parameters(tool, pair.inner)?;
            validate::validate_input(tool, &input)?;

            tool_calls.push(ToolCall::new(tool.name.clone(), input));
            clean.push_str(&raw[cursor..pair.start]);
            cursor = pair.end;
        }
        clean.push_str(&raw[cursor..]);

        if tool_calls.is_empty() && LOOSE_TAG_PAIR.is_match(raw) {
            return Err(ToolParseError::MalformedXml {
                message: "found tag-like markup but no tool call could be parsed".to_string(),
                example: self.tools.first().map(ToolDefinition::usage_example),
            });
        }

        let text = EXCESS_NEWLINES
            .replace_all(&clean, "\n\n")
            .trim()
            .to_string();
        let has_tool_calls = !tool_calls.is_empty();

        Ok(ParseResult {
            text,
            tool_calls,
            has_tool_calls,
        })
    }

    /// Feed one chunk of a streamed response
    ///
    /// Reports the moment a known tool's opening tag appears and when its
    /// closing tag completes the block, so the caller can stop the stream
    /// early. Text outside tool tags is discarded. When one chunk closes
    /// more than one call, the first is returned and the rest are queued;
    /// call again with an empty chunk until `queued_stream_calls` is zero.
    pub fn parse_streaming_chunk(&mut self, chunk: &str) -> StreamEvent {
        let tools = &self.tools;
        self.stream
            .push(chunk, |name| tools.iter().any(|t| t.name == name))
    }

    /// Completed calls waiting to be returned by `parse_streaming_chunk`
    pub fn queued_stream_calls(&self) -> usize {
        self.stream.queued_completions()
    }

    /// Text still held by the streaming buffer
    pub fn stream_buffer(&self) -> &str {
        self.stream.buffered()
    }

    pub fn reset_stream(&mut self) {
        self.stream.reset();
    }
}
