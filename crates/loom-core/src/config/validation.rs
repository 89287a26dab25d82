//! Configuration validation

use super::model::LoomConfig;
use crate::error::{LoomError, LoomResult};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete configuration
    pub fn validate(config: &LoomConfig) -> LoomResult<()> {
        Self::validate_context(config)?;
        Self::validate_retry(config)?;
        Self::validate_limits(config)?;
        Self::validate_logging(config)?;
        Ok(())
    }

    fn validate_context(config: &LoomConfig) -> LoomResult<()> {
        let context = &config.context;
        for (name, value) in [
            ("duplicate_similarity_threshold", context.duplicate_similarity_threshold),
            ("consecutive_similarity_threshold", context.consecutive_similarity_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(LoomError::config(format!(
                    "context.{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        if context.max_message_length == 0 {
            return Err(LoomError::config("context.max_message_length must be positive"));
        }
        Ok(())
    }

    fn validate_retry(config: &LoomConfig) -> LoomResult<()> {
        let retry = &config.retry;
        if retry.backoff_multiplier < 1.0 {
            return Err(LoomError::config(format!(
                "retry.backoff_multiplier must be at least 1.0, got {}",
                retry.backoff_multiplier
            )));
        }
        if retry.base_delay > retry.max_delay {
            return Err(LoomError::config(format!(
                "retry.base_delay ({:?}) exceeds retry.max_delay ({:?})",
                retry.base_delay, retry.max_delay
            )));
        }
        Ok(())
    }

    fn validate_limits(config: &LoomConfig) -> LoomResult<()> {
        if config.rate_limit.tokens_per_minute == 0 {
            return Err(LoomError::config("rate_limit.tokens_per_minute must be positive"));
        }
        if !(0.0..=1.0).contains(&config.rate_limit.burst_fraction) {
            return Err(LoomError::config(format!(
                "rate_limit.burst_fraction must be between 0.0 and 1.0, got {}",
                config.rate_limit.burst_fraction
            )));
        }
        if config.parser.max_mistakes == 0 {
            return Err(LoomError::config("parser.max_mistakes must be at least 1"));
        }
        if config.usage.retention_days == 0 {
            return Err(LoomError::config("usage.retention_days must be at least 1"));
        }
        Ok(())
    }

    fn validate_logging(config: &LoomConfig) -> LoomResult<()> {
        let level = config.logging.level.to_lowercase();
        // anything with a target directive is passed to EnvFilter as-is
        if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
            return Err(LoomError::config(format!(
                "Invalid log level '{}'. Valid levels are: {:?}",
                config.logging.level, LOG_LEVELS
            )));
        }
        Ok(())
    }
}
