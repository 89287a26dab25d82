//! Conversation message types

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::TokenEstimator;

/// Cache control for Anthropic prompt caching
///
/// Marks a content block as a caching breakpoint. Provider clients decide
/// where to place these; the context manager only carries them through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControl {
    /// Cache type - currently only "ephemeral" is supported
    #[serde(rename = "type")]
    pub control_type: String,
}

impl CacheControl {
    /// Create a new ephemeral cache control
    pub fn ephemeral() -> Self {
        Self {
            control_type: "ephemeral".to_string(),
        }
    }
}

impl Default for CacheControl {
    fn default() -> Self {
        Self::ephemeral()
    }
}

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions)
    System,
    /// User message (human input and tool results)
    User,
    /// Assistant message (model output)
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A typed content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
}

impl ContentBlock {
    /// Plain text block without cache metadata
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            cache_control: None,
        }
    }

    /// Text block marked as a prompt caching breakpoint
    pub fn cached_text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            cache_control: Some(CacheControl::ephemeral()),
        }
    }

    fn as_text(&self) -> &str {
        match self {
            Self::Text { text, .. } => text,
        }
    }
}

/// Message content: a plain string or an ordered list of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// One turn in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: MessageContent,
    /// Cached token count (estimated or provider-reported)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<usize>,
    /// When the message was created
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message with plain text content
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
            tokens: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a message from content blocks
    pub fn with_blocks(role: MessageRole, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content: MessageContent::Blocks(blocks),
            tokens: None,
            timestamp: Utc::now(),
        }
    }

    /// Flattened text of the message; blocks are joined with newlines
    pub fn text(&self) -> Cow<'_, str> {
        match &self.content {
            MessageContent::Text(text) => Cow::Borrowed(text),
            MessageContent::Blocks(blocks) if blocks.len() == 1 => {
                Cow::Borrowed(blocks[0].as_text())
            }
            MessageContent::Blocks(blocks) => Cow::Owned(
                blocks
                    .iter()
                    .map(ContentBlock::as_text)
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == MessageRole::System
    }

    /// A new message with the same role and timestamp but replaced text
    ///
    /// The token cache is cleared; the original message is left untouched.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            role: self.role,
            content: MessageContent::Text(text.into()),
            tokens: None,
            timestamp: self.timestamp,
        }
    }

    /// A new message with `prefix` prepended to its content
    ///
    /// For block content the prefix goes into the first block so cache
    /// metadata on the blocks is preserved.
    pub fn with_prefix(&self, prefix: &str) -> Self {
        let content = match &self.content {
            MessageContent::Text(text) => MessageContent::Text(format!("{}{}", prefix, text)),
            MessageContent::Blocks(blocks) => {
                let mut blocks = blocks.clone();
                match blocks.first_mut() {
                    Some(ContentBlock::Text { text, .. }) => {
                        *text = format!("{}{}", prefix, text);
                    }
                    None => blocks.push(ContentBlock::text(prefix)),
                }
                MessageContent::Blocks(blocks)
            }
        };
        Self {
            role: self.role,
            content,
            tokens: None,
            timestamp: self.timestamp,
        }
    }

    /// Token count, computing and caching it if absent
    pub fn ensure_tokens(&mut self, estimator: &TokenEstimator) -> usize {
        match self.tokens {
            Some(tokens) => tokens,
            None => {
                let tokens = estimator.estimate(&self.text());
                self.tokens = Some(tokens);
                tokens
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_flattens_blocks() {
        let msg = Message::with_blocks(
            MessageRole::User,
            vec![ContentBlock::text("first"), ContentBlock::cached_text("second")],
        );
        assert_eq!(msg.text(), "first\nsecond");
    }

    #[test]
    fn test_with_prefix_keeps_cache_control() {
        let msg = Message::with_blocks(
            MessageRole::Assistant,
            vec![ContentBlock::cached_text("body")],
        );
        let prefixed = msg.with_prefix("[note] ");
        assert_eq!(prefixed.text(), "[note] body");
        match &prefixed.content {
            MessageContent::Blocks(blocks) => match &blocks[0] {
                ContentBlock::Text { cache_control, .. } => assert!(cache_control.is_some()),
            },
            _ => panic!("expected blocks"),
        }
        // original untouched
        assert_eq!(msg.text(), "body");
    }

    #[test]
    fn test_with_text_clears_token_cache() {
        let mut msg = Message::user("hello world");
        msg.ensure_tokens(&TokenEstimator::new());
        assert!(msg.tokens.is_some());
        let replaced = msg.with_text("bye");
        assert!(replaced.tokens.is_none());
        assert_eq!(replaced.timestamp, msg.timestamp);
    }

    #[test]
    fn test_serde_shapes() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");

        let blocks: Message = serde_json::from_str(
            r#"{"role":"assistant","content":[{"type":"text","text":"x","cache_control":{"type":"ephemeral"}}]}"#,
        )
        .unwrap();
        assert_eq!(blocks.role, MessageRole::Assistant);
        assert_eq!(blocks.text(), "x");
    }
}
