//! Types for context manager results and statistics

use serde::{Deserialize, Serialize};

use crate::llm::Message;

/// Counters describing one context pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStats {
    /// Messages in the output
    pub total_messages: usize,
    /// Estimated tokens in the output
    pub total_tokens: usize,
    /// Messages removed relative to the input
    pub truncated_messages: usize,
    /// Estimated tokens removed relative to the input
    pub tokens_saved: usize,
}

/// Output of [`super::ContextManager::manage_context`]
#[derive(Debug, Clone, Default)]
pub struct ManagedContextResult {
    pub messages: Vec<Message>,
    pub was_modified: bool,
    pub stats: ContextStats,
}

impl ManagedContextResult {
    /// Output tokens as a fraction of the input; 1.0 for empty input
    pub fn compression_ratio(&self) -> f32 {
        let original = self.stats.total_tokens + self.stats.tokens_saved;
        if original == 0 {
            1.0
        } else {
            self.stats.total_tokens as f32 / original as f32
        }
    }
}

/// Context usage statistics
#[derive(Debug, Clone, Serialize)]
pub struct ContextUsageStats {
    /// Current token count
    pub current_tokens: usize,
    /// Total window of the model
    pub context_window: usize,
    /// Hard ceiling after the output reserve
    pub max_tokens: usize,
    /// Threshold for proactive truncation
    pub threshold_tokens: usize,
    /// Usage as a percentage of `max_tokens`
    pub usage_percentage: f32,
    /// Number of messages
    pub messages_count: usize,
    /// Whether approaching the limit
    pub is_approaching_limit: bool,
    /// Whether over the limit
    pub is_over_limit: bool,
}

impl ContextUsageStats {
    /// Get remaining tokens before threshold
    pub fn tokens_until_threshold(&self) -> usize {
        self.threshold_tokens.saturating_sub(self.current_tokens)
    }

    /// Get remaining tokens before limit
    pub fn tokens_until_limit(&self) -> usize {
        self.max_tokens.saturating_sub(self.current_tokens)
    }
}
