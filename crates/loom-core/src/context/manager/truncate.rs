//! Range removal and emergency truncation

use tracing::{info, warn};

use super::core::ContextManager;
use crate::context::window::TruncationStrategy;
use crate::llm::{Message, MessageRole};

/// Messages always kept at the end of the conversation
const TAIL_KEEP: usize = 2;

impl ContextManager {
    /// Indices of removable messages: non-system, after the prefix
    fn removable_indices(messages: &[Message], prefix_end: usize) -> Vec<usize> {
        messages
            .iter()
            .enumerate()
            .skip(prefix_end)
            .filter(|(_, m)| !m.is_system())
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of removable messages a strategy takes out
    pub(super) fn removal_count(strategy: TruncationStrategy, removable: usize) -> usize {
        let even = |n: usize| n - n % 2;
        match strategy {
            TruncationStrategy::None => 0,
            TruncationStrategy::LastTwo => removable.saturating_sub(TAIL_KEEP),
            TruncationStrategy::Half => even(removable / 2),
            TruncationStrategy::Quarter => even(removable * 3 / 4),
        }
    }

    /// Remove the oldest `count` removable messages, returning the index of
    /// the first surviving removable message
    fn remove_oldest(
        messages: &mut Vec<Message>,
        removable: &[usize],
        count: usize,
    ) -> Option<usize> {
        let doomed = &removable[..count];
        let mut index = 0;
        messages.retain(|_| {
            let keep = doomed.binary_search(&index).is_err();
            index += 1;
            keep
        });

        // every removed index precedes the first survivor
        removable.get(count).map(|&first| first - count)
    }

    /// Splice out a contiguous run of messages after the preserved prefix
    ///
    /// If the first message after the prefix is then an assistant message,
    /// it gets a visible truncation notice. Returns the number removed.
    pub(super) fn remove_range(
        &self,
        messages: &mut Vec<Message>,
        prefix_end: usize,
        strategy: TruncationStrategy,
    ) -> usize {
        let removable = Self::removable_indices(messages, prefix_end);
        let count = Self::removal_count(strategy, removable.len());
        if count == 0 {
            return 0;
        }

        if let Some(first) = Self::remove_oldest(messages, &removable, count) {
            if messages[first].role == MessageRole::Assistant {
                let notice = format!("[CONTEXT TRUNCATED] {} previous messages removed\n\n", count);
                let mut annotated = messages[first].with_prefix(&notice);
                annotated.ensure_tokens(&self.estimator);
                messages[first] = annotated;
            }
        }

        count
    }

    /// Collapse to system messages, the preserved prefix and the last two
    /// messages. Returns the number removed.
    pub(super) fn emergency_truncate(&self, messages: &mut Vec<Message>, prefix_end: usize) -> usize {
        let removable = Self::removable_indices(messages, prefix_end);
        let count = removable.len().saturating_sub(TAIL_KEEP);
        if count == 0 {
            warn!(
                tokens = self.estimate_tokens(messages),
                "Conversation exceeds the context window but nothing is left to remove"
            );
            return 0;
        }

        if let Some(first) = Self::remove_oldest(messages, &removable, count) {
            let notice = format!(
                "[EMERGENCY CONTEXT TRUNCATION] {} earlier messages removed to fit the context window\n\n",
                count
            );
            let mut annotated = messages[first].with_prefix(&notice);
            annotated.ensure_tokens(&self.estimator);
            messages[first] = annotated;
        }

        info!(removed = count, "Emergency context truncation applied");
        count
    }
}
