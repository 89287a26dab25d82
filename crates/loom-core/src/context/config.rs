//! Context manager configuration

use serde::{Deserialize, Serialize};

use super::window::Aggressiveness;

/// Tunables for the context management passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextManagerConfig {
    /// Default aggressiveness used by clients that do not pass one
    pub aggressiveness: Aggressiveness,
    /// Non-system messages at the start that are never removed or rewritten
    pub preserved_prefix_length: usize,
    /// Word-set similarity at which a repeated file read counts as unchanged
    ///
    /// Heuristic; tune per workload.
    pub duplicate_similarity_threshold: f64,
    /// Minimum content length (chars) before exact-duplicate detection applies
    pub min_duplicate_length: usize,
    /// Content longer than this (chars) is compressed
    pub max_message_length: usize,
    /// Similarity above which consecutive same-role messages are merged away
    /// by `compress_context`
    pub consecutive_similarity_threshold: f64,
    /// Message count above which `compress_context` summarizes the middle
    pub summarize_above: usize,
}

impl Default for ContextManagerConfig {
    fn default() -> Self {
        Self {
            aggressiveness: Aggressiveness::Moderate,
            preserved_prefix_length: 2,
            duplicate_similarity_threshold: 0.9,
            min_duplicate_length: 200,
            max_message_length: 1000,
            consecutive_similarity_threshold: 0.8,
            summarize_above: 10,
        }
    }
}

impl ContextManagerConfig {
    pub fn with_aggressiveness(mut self, aggressiveness: Aggressiveness) -> Self {
        self.aggressiveness = aggressiveness;
        self
    }

    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = max;
        self
    }

    pub fn with_duplicate_similarity_threshold(mut self, threshold: f64) -> Self {
        self.duplicate_similarity_threshold = threshold;
        self
    }
}
