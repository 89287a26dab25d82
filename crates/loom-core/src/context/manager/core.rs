//! Core ContextManager struct and the primary pipeline

use tracing::{debug, info, instrument};

use super::super::config::ContextManagerConfig;
use super::super::estimator::TokenEstimator;
use super::super::window::{
    Aggressiveness, ContextWindowInfo, ContextWindowPolicy, TruncationStrategy,
};
use super::types::{ContextStats, ContextUsageStats, ManagedContextResult};
use crate::llm::Message;

/// Keeps a conversation inside a model's context window
///
/// Each pass works on a copy of the caller's history; the input slice is
/// never modified. One manager serves one model id.
#[derive(Debug, Clone)]
pub struct ContextManager {
    pub(super) model: String,
    pub(super) config: ContextManagerConfig,
    pub(super) policy: ContextWindowPolicy,
    pub(super) estimator: TokenEstimator,
}

impl ContextManager {
    /// Create a manager for `model` with default configuration and window table
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            config: ContextManagerConfig::default(),
            policy: ContextWindowPolicy::default(),
            estimator: TokenEstimator::new(),
        }
    }

    pub fn with_config(mut self, config: ContextManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: ContextWindowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn config(&self) -> &ContextManagerConfig {
        &self.config
    }

    pub fn policy(&self) -> &ContextWindowPolicy {
        &self.policy
    }

    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    pub fn window_info(&self) -> ContextWindowInfo {
        self.policy.window_info(&self.model)
    }

    /// Estimate tokens for a conversation
    pub fn estimate_tokens(&self, messages: &[Message]) -> usize {
        self.estimator.estimate_messages(messages)
    }

    /// Index one past the preserved prefix
    ///
    /// The prefix is every leading system message plus the first
    /// `preserved_prefix_length` non-system messages. Nothing before this
    /// index is removed or rewritten by any pass.
    pub fn preserved_prefix_end(&self, messages: &[Message]) -> usize {
        let wanted = self.config.preserved_prefix_length;
        if wanted == 0 {
            return messages.iter().take_while(|m| m.is_system()).count();
        }

        let mut seen = 0;
        for (index, message) in messages.iter().enumerate() {
            if !message.is_system() {
                seen += 1;
                if seen == wanted {
                    return index + 1;
                }
            }
        }
        messages.len()
    }

    /// Get context usage statistics
    pub fn usage_stats(&self, messages: &[Message]) -> ContextUsageStats {
        let info = self.window_info();
        let current_tokens = self.estimate_tokens(messages);
        let max_tokens = info.max_allowed_size;
        let threshold_tokens = info.recommended_truncation_threshold;

        ContextUsageStats {
            current_tokens,
            context_window: info.context_window,
            max_tokens,
            threshold_tokens,
            usage_percentage: if max_tokens == 0 {
                0.0
            } else {
                (current_tokens as f32 / max_tokens as f32) * 100.0
            },
            messages_count: messages.len(),
            is_approaching_limit: current_tokens >= threshold_tokens,
            is_over_limit: current_tokens >= max_tokens,
        }
    }

    /// Run the full pipeline: annotate, optimize, truncate, emergency-truncate
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    pub fn manage_context(
        &self,
        messages: &[Message],
        aggressiveness: Aggressiveness,
    ) -> ManagedContextResult {
        if messages.is_empty() {
            return ManagedContextResult::default();
        }

        let mut working = messages.to_vec();
        for message in &mut working {
            message.ensure_tokens(&self.estimator);
        }
        let original_count = working.len();
        let original_tokens = self.estimate_tokens(&working);
        let prefix_end = self.preserved_prefix_end(&working);

        let (mut working, mut modified) = self.optimize_content(working, prefix_end);

        let tokens = self.estimate_tokens(&working);
        if self
            .policy
            .should_truncate_proactively(tokens, &self.model, aggressiveness)
        {
            let strategy = match self.policy.truncation_strategy(tokens, &self.model) {
                TruncationStrategy::None => TruncationStrategy::Half,
                strategy => strategy,
            };
            let removed = self.remove_range(&mut working, prefix_end, strategy);
            if removed > 0 {
                info!(
                    ?strategy,
                    removed,
                    tokens_before = tokens,
                    "Proactively truncated conversation"
                );
                modified = true;
            }
        }

        let info = self.window_info();
        if self.estimate_tokens(&working) >= info.max_allowed_size
            && self.emergency_truncate(&mut working, prefix_end) > 0
        {
            modified = true;
        }

        let total_tokens = self.estimate_tokens(&working);
        let stats = ContextStats {
            total_messages: working.len(),
            total_tokens,
            truncated_messages: original_count.saturating_sub(working.len()),
            tokens_saved: original_tokens.saturating_sub(total_tokens),
        };
        let was_modified =
            modified || working.len() != original_count || total_tokens != original_tokens;

        debug!(
            total_tokens,
            tokens_saved = stats.tokens_saved,
            truncated = stats.truncated_messages,
            was_modified,
            "Context pass complete"
        );

        ManagedContextResult {
            messages: working,
            was_modified,
            stats,
        }
    }
}
