//! Token-cheap rendering of tool execution results

use crate::tools::{ToolCall, ToolOutcome};

use super::text::{head_chars, tail_chars};

/// Results longer than this are truncated
pub const MAX_RESULT_CHARS: usize = 800;
/// Head kept from long file contents
pub const FILE_HEAD_CHARS: usize = 600;
/// Tail kept from long file contents
pub const FILE_TAIL_CHARS: usize = 100;

const FILE_READING_TOOLS: [&str; 3] = ["read_file", "view_file", "cat"];

/// Render a tool result as `✓ name(target)` or `✗ name(target): error`
///
/// File contents over the limit keep their head and tail around a
/// `[CONTENT TRUNCATED]` marker; other output is head-truncated.
pub fn format_tool_result(call: &ToolCall, outcome: &ToolOutcome) -> String {
    let target = call.target().unwrap_or_default();

    if !outcome.success {
        let error = outcome.error.as_deref().unwrap_or("unknown error");
        return format!(
            "✗ {}({}): {}",
            call.name,
            target,
            truncate_head(error.trim())
        );
    }

    let status = format!("✓ {}({})", call.name, target);
    let output = outcome.output.as_deref().unwrap_or_default().trim_end();
    if output.is_empty() {
        return status;
    }

    let body = if FILE_READING_TOOLS.contains(&call.name.as_str()) {
        truncate_head_tail(output)
    } else {
        truncate_head(output)
    };
    format!("{}\n{}", status, body)
}

fn truncate_head(text: &str) -> String {
    if text.chars().count() <= MAX_RESULT_CHARS {
        text.to_string()
    } else {
        format!("{}...", head_chars(text, MAX_RESULT_CHARS))
    }
}

fn truncate_head_tail(text: &str) -> String {
    if text.chars().count() <= MAX_RESULT_CHARS {
        text.to_string()
    } else {
        format!(
            "{}\n...[CONTENT TRUNCATED]...\n{}",
            head_chars(text, FILE_HEAD_CHARS),
            tail_chars(text, FILE_TAIL_CHARS)
        )
    }
}
