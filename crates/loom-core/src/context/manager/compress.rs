//! Pattern-aware compression and the heavier `compress_context` strategy

use tracing::debug;

use super::core::ContextManager;
use super::types::{ContextStats, ManagedContextResult};
use crate::context::text::{head_chars, similarity, tail_chars};
use crate::grammar::{self, ERROR_MARKER, SUCCESS_MARKER, tool_result_status};
use crate::llm::{Message, MessageRole};

/// Head kept when compressing a tool result
const RESULT_HEAD_CHARS: usize = 600;
/// Tail kept when compressing a tool result
const RESULT_TAIL_CHARS: usize = 200;
/// Head kept when compressing anything else
const PLAIN_HEAD_CHARS: usize = 800;
/// Tool results shorter than this are left alone by `compress_context`
const MIN_RESULT_COMPRESS_CHARS: usize = 300;
/// Marker lines kept per compressed tool result
const MAX_KEY_LINES: usize = 5;
/// Messages kept on each side of the summarized middle
const SUMMARY_EDGE: usize = 2;

const TOPICS: [(&str, &[&str]); 3] = [
    (
        "file operations",
        &["read_file", "write_file", "edit_file", "file", "directory"],
    ),
    ("code search", &["search", "grep", "find", "query"]),
    (
        "debugging",
        &["error", "debug", "bug", "fix", "exception", "stack trace"],
    ),
];

/// Status line of a tool result and the text after it
///
/// Falls back to the first error marker line, then the first success marker
/// line, with the whole text as the remainder.
fn split_status(text: &str) -> Option<(&str, &str)> {
    if let Some(status) = tool_result_status(text) {
        let rest = text
            .find(status)
            .map(|idx| &text[idx + status.len()..])
            .unwrap_or(text);
        return Some((status, rest.trim_start_matches(['\r', '\n'])));
    }

    ERROR_MARKER
        .find(text)
        .or_else(|| SUCCESS_MARKER.find(text))
        .map(|m| (m.as_str().trim(), text))
}

impl ContextManager {
    /// Fixed-size summary of an oversized message
    ///
    /// Tool results keep their status line plus head and tail; anything else
    /// is head-truncated.
    pub(super) fn compress_long_content(&self, text: &str) -> Option<String> {
        let total = text.chars().count();
        if total <= self.config.max_message_length {
            return None;
        }

        let compressed = match split_status(text) {
            Some((status, rest)) => {
                let rest_len = rest.chars().count();
                if rest_len <= RESULT_HEAD_CHARS + RESULT_TAIL_CHARS {
                    format!("{}\n{}", status, rest)
                } else {
                    format!(
                        "{}\n{}\n...[{} characters compressed]...\n{}",
                        status,
                        head_chars(rest, RESULT_HEAD_CHARS),
                        rest_len - RESULT_HEAD_CHARS - RESULT_TAIL_CHARS,
                        tail_chars(rest, RESULT_TAIL_CHARS)
                    )
                }
            }
            None => format!(
                "{}\n...[CONTENT TRUNCATED: {} characters omitted]",
                head_chars(text, PLAIN_HEAD_CHARS),
                total.saturating_sub(PLAIN_HEAD_CHARS)
            ),
        };

        (compressed.chars().count() < total).then_some(compressed)
    }

    /// Status line plus the error and success lines of a tool result
    fn extract_key_lines(text: &str) -> Option<String> {
        let (status, rest) = split_status(text)?;

        let mut lines = vec![status.to_string()];
        for line in ERROR_MARKER
            .find_iter(rest)
            .chain(SUCCESS_MARKER.find_iter(rest))
            .map(|m| m.as_str().trim())
        {
            if lines.len() > MAX_KEY_LINES {
                break;
            }
            if !line.is_empty() && !lines.iter().any(|l| l == line) {
                lines.push(line.to_string());
            }
        }

        if lines.len() == 1 {
            let head = head_chars(rest.trim(), 200);
            if !head.is_empty() {
                lines.push(format!("{}...", head));
            }
        }
        Some(lines.join("\n"))
    }

    /// Aggressive alternative to [`ContextManager::manage_context`] for
    /// tool-result-heavy conversations
    ///
    /// Compresses tool results to their key lines, drops consecutive
    /// same-role near-duplicates and, above the configured message count,
    /// replaces the middle of the conversation with a synthesized summary.
    pub fn compress_context(&self, messages: &[Message]) -> ManagedContextResult {
        if messages.is_empty() {
            return ManagedContextResult::default();
        }

        let original_count = messages.len();
        let original_tokens = self.estimate_tokens(messages);

        let mut compressed: Vec<Message> = Vec::with_capacity(messages.len());
        for message in messages {
            let mut message = self.compress_tool_result(message);
            message.ensure_tokens(&self.estimator);

            let near_duplicate = compressed.last().is_some_and(|previous: &Message| {
                !message.is_system()
                    && previous.role == message.role
                    && similarity(&previous.text(), &message.text())
                        > self.config.consecutive_similarity_threshold
            });
            if near_duplicate {
                debug!(role = %message.role, "Dropped near-duplicate consecutive message");
                continue;
            }
            compressed.push(message);
        }

        if compressed.len() > self.config.summarize_above {
            compressed = self.summarize_middle(compressed);
        }

        let total_tokens = self.estimate_tokens(&compressed);
        let stats = ContextStats {
            total_messages: compressed.len(),
            total_tokens,
            truncated_messages: original_count.saturating_sub(compressed.len()),
            tokens_saved: original_tokens.saturating_sub(total_tokens),
        };

        ManagedContextResult {
            was_modified: compressed.len() != original_count || total_tokens != original_tokens,
            messages: compressed,
            stats,
        }
    }

    fn compress_tool_result(&self, message: &Message) -> Message {
        if message.role != MessageRole::User {
            return message.clone();
        }
        let text = message.text();
        if text.chars().count() < MIN_RESULT_COMPRESS_CHARS {
            return message.clone();
        }

        match Self::extract_key_lines(&text) {
            Some(key_lines) if self.estimator.estimate(&key_lines) < self.estimator.estimate(&text) => {
                message.with_text(key_lines)
            }
            _ => message.clone(),
        }
    }

    fn summarize_middle(&self, messages: Vec<Message>) -> Vec<Message> {
        let end = messages.len() - SUMMARY_EDGE;
        let mut head: Vec<Message> = Vec::with_capacity(SUMMARY_EDGE * 2 + 1);
        let mut middle = Vec::new();
        let mut tail = Vec::with_capacity(SUMMARY_EDGE);

        for (index, message) in messages.into_iter().enumerate() {
            if index < SUMMARY_EDGE {
                head.push(message);
            } else if index >= end {
                tail.push(message);
            } else if message.is_system() {
                head.push(message);
            } else {
                middle.push(message);
            }
        }

        let mut summary = Message::system(Self::summary_text(&middle));
        summary.ensure_tokens(&self.estimator);
        debug!(summarized = middle.len(), "Summarized middle of conversation");

        head.push(summary);
        head.extend(tail);
        head
    }

    fn summary_text(middle: &[Message]) -> String {
        let user = middle.iter().filter(|m| m.role == MessageRole::User).count();
        let assistant = middle
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();
        let tool_calls: usize = middle
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .map(|m| grammar::tag_pairs(&m.text()).len())
            .sum();

        let combined = middle
            .iter()
            .map(|m| m.text().to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");
        let topics: Vec<&str> = TOPICS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| combined.contains(k)))
            .map(|(topic, _)| *topic)
            .collect();

        format!(
            "[CONVERSATION SUMMARY] {} earlier messages compressed ({} user, {} assistant). Tool calls: {}. Topics: {}.",
            middle.len(),
            user,
            assistant,
            tool_calls,
            if topics.is_empty() {
                "general discussion".to_string()
            } else {
                topics.join(", ")
            }
        )
    }
}
