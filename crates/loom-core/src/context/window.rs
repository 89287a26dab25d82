//! Per-model context window policy
//!
//! Maps a model id to its window size and derives two ceilings from it: a
//! hard `max_allowed_size` that reserves room for the response, and a softer
//! `recommended_truncation_threshold` that triggers proactive truncation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LoomError;

/// Window assumed for model ids that match no known family
pub const DEFAULT_CONTEXT_WINDOW: usize = 200_000;

/// Fraction of an unrecognized window kept as the hard ceiling
const PROPORTIONAL_MAX_ALLOWED: f64 = 0.75;
/// Fraction of an unrecognized window kept as the truncation threshold
const PROPORTIONAL_THRESHOLD: f64 = 0.65;

/// Multiplier applied to the threshold before an emergency split
const HALF_STRATEGY_FACTOR: f64 = 1.5;

/// Derived window constants for one model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindowInfo {
    /// Total tokens the model accepts
    pub context_window: usize,
    /// Hard ceiling after reserving the output budget
    pub max_allowed_size: usize,
    /// Soft ceiling that triggers proactive truncation
    pub recommended_truncation_threshold: usize,
}

/// How eagerly truncation kicks in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggressiveness {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl Aggressiveness {
    /// Threshold multiplier; a lower multiplier truncates earlier
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Conservative => 0.7,
            Self::Moderate => 1.0,
            Self::Aggressive => 1.2,
        }
    }
}

impl FromStr for Aggressiveness {
    type Err = LoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "moderate" => Ok(Self::Moderate),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(LoomError::invalid_input_field(
                format!("unknown aggressiveness '{}'", other),
                "aggressiveness",
            )),
        }
    }
}

impl std::fmt::Display for Aggressiveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        };
        write!(f, "{}", name)
    }
}

/// Range-removal strategy picked from the current token count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationStrategy {
    /// Nothing to do
    None,
    /// Keep only the last two messages after the preserved prefix
    LastTwo,
    /// Remove roughly half of the messages after the preserved prefix
    Half,
    /// Remove three quarters of the messages after the preserved prefix
    Quarter,
}

/// Fixed reserves for a known window size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowReserve {
    pub context_window: usize,
    pub max_allowed_size: usize,
    pub recommended_truncation_threshold: usize,
}

/// Model family and window lookup table
///
/// Families are matched case-insensitively as substrings of the model id,
/// first match wins, so more specific names must come first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelWindowTable {
    pub families: Vec<(String, usize)>,
    pub reserves: Vec<WindowReserve>,
    pub fallback_window: usize,
}

impl Default for ModelWindowTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ModelWindowTable {
    /// An empty table; every model falls back to `fallback_window`
    pub fn empty(fallback_window: usize) -> Self {
        Self {
            families: Vec::new(),
            reserves: Vec::new(),
            fallback_window,
        }
    }

    /// Built-in table covering the Anthropic, Gemini, Azure OpenAI and DeepSeek families
    pub fn with_defaults() -> Self {
        let families = [
            ("claude-sonnet-4", 200_000),
            ("claude-opus-4", 200_000),
            ("claude-3-7-sonnet", 200_000),
            ("claude-3-5-sonnet", 200_000),
            ("claude-3-5-haiku", 200_000),
            ("claude", 200_000),
            ("gemini-1.5-flash", 1_048_576),
            ("gemini-1.5-pro", 1_048_576),
            ("gemini-2", 1_048_576),
            ("gemini", 1_048_576),
            ("gpt-4o", 128_000),
            ("gpt-4.1", 128_000),
            ("gpt-4-turbo", 128_000),
            ("gpt-4", 8_192),
            ("gpt-35-turbo", 16_385),
            ("gpt-3.5", 16_385),
            ("deepseek", 64_000),
        ];

        let reserves = vec![
            WindowReserve {
                context_window: 1_048_576,
                max_allowed_size: 1_008_576,
                recommended_truncation_threshold: 988_576,
            },
            WindowReserve {
                context_window: 200_000,
                max_allowed_size: 160_000,
                recommended_truncation_threshold: 140_000,
            },
            WindowReserve {
                context_window: 128_000,
                max_allowed_size: 98_000,
                recommended_truncation_threshold: 88_000,
            },
            WindowReserve {
                context_window: 64_000,
                max_allowed_size: 44_000,
                recommended_truncation_threshold: 34_000,
            },
        ];

        Self {
            families: families
                .into_iter()
                .map(|(name, window)| (name.to_string(), window))
                .collect(),
            reserves,
            fallback_window: DEFAULT_CONTEXT_WINDOW,
        }
    }

    /// Add or override a family entry ahead of the existing ones
    pub fn with_family(mut self, family: impl Into<String>, window: usize) -> Self {
        self.families.insert(0, (family.into().to_lowercase(), window));
        self
    }

    /// Window size for a model id
    pub fn window_for(&self, model_id: &str) -> usize {
        let model = model_id.to_lowercase();
        self.families
            .iter()
            .find(|(family, _)| model.contains(family.as_str()))
            .map(|(_, window)| *window)
            .unwrap_or(self.fallback_window)
    }

    fn info_for_window(&self, context_window: usize) -> ContextWindowInfo {
        if let Some(reserve) = self
            .reserves
            .iter()
            .find(|r| r.context_window == context_window)
        {
            return ContextWindowInfo {
                context_window,
                max_allowed_size: reserve.max_allowed_size,
                recommended_truncation_threshold: reserve.recommended_truncation_threshold,
            };
        }

        ContextWindowInfo {
            context_window,
            max_allowed_size: (context_window as f64 * PROPORTIONAL_MAX_ALLOWED) as usize,
            recommended_truncation_threshold: (context_window as f64 * PROPORTIONAL_THRESHOLD)
                as usize,
        }
    }
}

/// Context window policy backed by a [`ModelWindowTable`]
#[derive(Debug, Clone, Default)]
pub struct ContextWindowPolicy {
    table: ModelWindowTable,
}

impl ContextWindowPolicy {
    pub fn new(table: ModelWindowTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ModelWindowTable {
        &self.table
    }

    /// Window constants for a model id
    pub fn window_info(&self, model_id: &str) -> ContextWindowInfo {
        self.table.info_for_window(self.table.window_for(model_id))
    }

    /// Threshold after applying the aggressiveness multiplier
    pub fn scaled_threshold(&self, model_id: &str, aggressiveness: Aggressiveness) -> usize {
        let info = self.window_info(model_id);
        (info.recommended_truncation_threshold as f64 * aggressiveness.multiplier()) as usize
    }

    /// Whether `tokens` has reached the aggressiveness-scaled threshold
    pub fn should_truncate_proactively(
        &self,
        tokens: usize,
        model_id: &str,
        aggressiveness: Aggressiveness,
    ) -> bool {
        tokens >= self.scaled_threshold(model_id, aggressiveness)
    }

    /// Pick a truncation strategy for the current token count
    pub fn truncation_strategy(&self, tokens: usize, model_id: &str) -> TruncationStrategy {
        let info = self.window_info(model_id);
        let threshold = info.recommended_truncation_threshold as f64;

        if tokens >= info.max_allowed_size {
            TruncationStrategy::Quarter
        } else if tokens as f64 >= threshold * HALF_STRATEGY_FACTOR {
            TruncationStrategy::Half
        } else if tokens >= info.recommended_truncation_threshold {
            TruncationStrategy::LastTwo
        } else {
            TruncationStrategy::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_families() {
        let policy = ContextWindowPolicy::default();
        assert_eq!(policy.window_info("claude-sonnet-4-20250514").context_window, 200_000);
        assert_eq!(policy.window_info("Claude-3-5-Sonnet-latest").context_window, 200_000);
        assert_eq!(policy.window_info("gemini-2.5-pro").context_window, 1_048_576);
        assert_eq!(policy.window_info("gpt-4o-mini").context_window, 128_000);
        assert_eq!(policy.window_info("gpt-4-0613").context_window, 8_192);
        assert_eq!(policy.window_info("deepseek-chat").context_window, 64_000);
    }

    #[test]
    fn test_unknown_model_falls_back_proportionally() {
        let policy = ContextWindowPolicy::default();
        let info = policy.window_info("some-custom-deployment");
        assert_eq!(info.context_window, 200_000);
        assert_eq!(info.max_allowed_size, 160_000);

        let policy = ContextWindowPolicy::new(ModelWindowTable::empty(100_000));
        let info = policy.window_info("anything");
        assert_eq!(info.max_allowed_size, 75_000);
        assert_eq!(info.recommended_truncation_threshold, 65_000);
    }

    #[test]
    fn test_invariant_ordering_holds_for_all_entries() {
        let table = ModelWindowTable::with_defaults();
        let policy = ContextWindowPolicy::new(table.clone());
        for (family, _) in &table.families {
            let info = policy.window_info(family);
            assert!(info.recommended_truncation_threshold < info.max_allowed_size, "{}", family);
            assert!(info.max_allowed_size < info.context_window, "{}", family);
        }
    }

    #[test]
    fn test_reserve_buffers_in_range() {
        let table = ModelWindowTable::with_defaults();
        for reserve in &table.reserves {
            let output = reserve.context_window - reserve.max_allowed_size;
            let proactive = reserve.context_window - reserve.recommended_truncation_threshold;
            assert!((20_000..=40_000).contains(&output));
            assert!((30_000..=60_000).contains(&proactive));
        }
    }

    #[test]
    fn test_aggressiveness_scaling() {
        let policy = ContextWindowPolicy::default();
        let model = "claude-sonnet-4";
        // threshold 140k
        assert!(policy.should_truncate_proactively(98_000, model, Aggressiveness::Conservative));
        assert!(!policy.should_truncate_proactively(98_000, model, Aggressiveness::Moderate));
        assert!(policy.should_truncate_proactively(140_000, model, Aggressiveness::Moderate));
        assert!(!policy.should_truncate_proactively(140_000, model, Aggressiveness::Aggressive));
    }

    #[test]
    fn test_truncation_strategy_bands() {
        let policy = ContextWindowPolicy::new(ModelWindowTable::empty(100_000));
        // threshold 65k, max 75k; 1.5x threshold = 97.5k is above max
        assert_eq!(policy.truncation_strategy(10_000, "m"), TruncationStrategy::None);
        assert_eq!(policy.truncation_strategy(65_000, "m"), TruncationStrategy::LastTwo);
        assert_eq!(policy.truncation_strategy(75_000, "m"), TruncationStrategy::Quarter);

        let policy = ContextWindowPolicy::default();
        let model = "gemini-2.5-flash";
        // threshold 988,576 * 1.5 is beyond max, so 1M is already quarter
        assert_eq!(policy.truncation_strategy(1_010_000, model), TruncationStrategy::Quarter);
    }

    #[test]
    fn test_half_band_with_custom_reserve() {
        let mut table = ModelWindowTable::empty(100_000);
        table.reserves.push(WindowReserve {
            context_window: 100_000,
            max_allowed_size: 90_000,
            recommended_truncation_threshold: 50_000,
        });
        let policy = ContextWindowPolicy::new(table);
        assert_eq!(policy.truncation_strategy(76_000, "m"), TruncationStrategy::Half);
        assert_eq!(policy.truncation_strategy(60_000, "m"), TruncationStrategy::LastTwo);
    }

    #[test]
    fn test_aggressiveness_from_str() {
        assert_eq!("Aggressive".parse::<Aggressiveness>().unwrap(), Aggressiveness::Aggressive);
        assert!("reckless".parse::<Aggressiveness>().is_err());
    }
}
