//! Core types for usage tracking

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Usage record for a single completed API call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// Calculated cost (USD)
    pub cost: f64,
    pub provider: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl UsageRecord {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        input_tokens: u64,
        output_tokens: u64,
        cost: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cost,
            provider: provider.into(),
            model: model.into(),
            timestamp: Utc::now(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Aggregated usage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub request_count: usize,
    /// Distinct session ids among the records
    pub session_count: usize,
    pub average_tokens_per_request: f64,
}

impl UsageStats {
    /// Reduce a set of records to totals
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a UsageRecord>) -> Self {
        let mut stats = Self::default();
        let mut sessions = HashSet::new();

        for record in records {
            stats.input_tokens += record.input_tokens;
            stats.output_tokens += record.output_tokens;
            stats.total_tokens += record.total_tokens;
            stats.total_cost += record.cost;
            stats.request_count += 1;
            if let Some(session) = &record.session_id {
                sessions.insert(session.as_str());
            }
        }

        stats.session_count = sessions.len();
        if stats.request_count > 0 {
            stats.average_tokens_per_request = stats.total_tokens as f64 / stats.request_count as f64;
        }
        stats
    }

    pub fn format_cost(&self) -> String {
        format_cost(self.total_cost)
    }
}

/// Format a USD amount with precision that suits its magnitude
pub fn format_cost(cost: f64) -> String {
    if cost < 0.01 {
        format!("${:.4}", cost)
    } else if cost < 1.0 {
        format!("${:.3}", cost)
    } else {
        format!("${:.2}", cost)
    }
}

/// Bookkeeping for one streamed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub stream_id: String,
    pub started_at: DateTime<Utc>,
    /// Tool whose invocation cut the stream short
    #[serde(default)]
    pub interrupted_for_tool: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

impl StreamRecord {
    pub fn was_interrupted(&self) -> bool {
        self.interrupted_for_tool.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}
