//! Token estimation for conversation content
//!
//! Exact tokenization varies by provider, so estimates are derived from the
//! character count divided by a density-dependent ratio. Text that looks
//! like tool-call markup or code packs more tokens per character than
//! natural language, so it is assigned a smaller ratio. Estimates are
//! rounded up and never under-count on purpose.

use serde::{Deserialize, Serialize};

use crate::grammar::{CODE_FENCE, CODE_KEYWORD, TECHNICAL_TOKEN, TOOL_MARKUP};
use crate::llm::Message;

/// Characters per token for each density band
const TOOL_HEAVY_RATIO: f64 = 3.0;
const CODE_HEAVY_RATIO: f64 = 3.2;
const TECHNICAL_RATIO: f64 = 3.5;
const NATURAL_RATIO: f64 = 4.2;

/// Matches needed before text counts as tool-heavy (an open and a close tag)
const TOOL_MARKUP_MIN_MATCHES: usize = 2;
/// Keyword matches needed before text without fences counts as code
const CODE_KEYWORD_MIN_MATCHES: usize = 3;
/// Path or file-name matches needed before text counts as technical
const TECHNICAL_MIN_MATCHES: usize = 3;

/// Density band a piece of text falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentDensity {
    ToolHeavy,
    CodeHeavy,
    Technical,
    Natural,
}

impl ContentDensity {
    /// Characters per token for this band
    pub fn chars_per_token(self) -> f64 {
        match self {
            Self::ToolHeavy => TOOL_HEAVY_RATIO,
            Self::CodeHeavy => CODE_HEAVY_RATIO,
            Self::Technical => TECHNICAL_RATIO,
            Self::Natural => NATURAL_RATIO,
        }
    }
}

impl std::fmt::Display for ContentDensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ToolHeavy => "tool-heavy",
            Self::CodeHeavy => "code-heavy",
            Self::Technical => "technical",
            Self::Natural => "natural",
        };
        write!(f, "{}", name)
    }
}

/// Heuristic text-to-token estimator
///
/// A pure function of its input: the same string always yields the same
/// estimate, and appending text never lowers it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenEstimator;

impl TokenEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Classify text into a density band
    pub fn classify(&self, text: &str) -> ContentDensity {
        if TOOL_MARKUP.find_iter(text).take(TOOL_MARKUP_MIN_MATCHES).count()
            >= TOOL_MARKUP_MIN_MATCHES
        {
            ContentDensity::ToolHeavy
        } else if CODE_FENCE.is_match(text)
            || CODE_KEYWORD.find_iter(text).take(CODE_KEYWORD_MIN_MATCHES).count()
                >= CODE_KEYWORD_MIN_MATCHES
        {
            ContentDensity::CodeHeavy
        } else if TECHNICAL_TOKEN.find_iter(text).take(TECHNICAL_MIN_MATCHES).count()
            >= TECHNICAL_MIN_MATCHES
        {
            ContentDensity::Technical
        } else {
            ContentDensity::Natural
        }
    }

    /// Estimate the token count of a string
    pub fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count() as f64;
        (chars / self.classify(text).chars_per_token()).ceil() as usize
    }

    /// Token count of a message, using its cached value when present
    pub fn estimate_message(&self, message: &Message) -> usize {
        message
            .tokens
            .unwrap_or_else(|| self.estimate(&message.text()))
    }

    /// Total tokens for a list of messages
    pub fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }
}
