//! Configuration model

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::logging_config::LoggingConfig;
use crate::context::ContextManagerConfig;
use crate::recovery::RetryConfig;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoomConfig {
    pub context: ContextManagerConfig,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    pub parser: ParserConfig,
    pub usage: UsageConfig,
    pub logging: LoggingConfig,
}

/// Per-minute token quota for the rate-limited provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Input plus output tokens allowed per minute
    pub tokens_per_minute: u64,
    /// Share of the quota usable as a burst budget (0.0 - 1.0)
    pub burst_fraction: f64,
    /// Provider whose usage counts against the quota
    pub provider: String,
    /// Sleep once and retry instead of failing when the quota is exhausted
    pub wait_on_rate_limit: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            tokens_per_minute: 40_000,
            burst_fraction: 0.1,
            provider: "anthropic".to_string(),
            wait_on_rate_limit: true,
        }
    }
}

/// Tool-call parser settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Consecutive protocol violations before the run is aborted
    pub max_mistakes: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { max_mistakes: 3 }
    }
}

/// Usage history persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Records older than this are purged
    pub retention_days: u32,
    pub history_key: String,
    pub stream_key: String,
    /// JSON file backing the usage store; the data dir default when unset
    pub store_path: Option<PathBuf>,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            history_key: "loom.usage_history".to_string(),
            stream_key: "loom.stream_history".to_string(),
            store_path: None,
        }
    }
}
