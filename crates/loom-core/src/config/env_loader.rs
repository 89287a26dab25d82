//! Environment variable overrides
//!
//! Every override uses the `LOOM_` prefix. Unset variables leave the
//! configuration untouched; unparsable values are configuration errors.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use super::model::LoomConfig;
use crate::error::{LoomError, LoomResult};

fn parse_var<T: FromStr>(name: &str, value: &str) -> LoomResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| LoomError::config(format!("Invalid {} value: '{}'", name, value)))
}

/// Apply `LOOM_*` variables from the process environment
pub fn apply_env_overrides(config: &mut LoomConfig) -> LoomResult<()> {
    apply_overrides_from(config, |name| env::var(name).ok())
}

/// Apply overrides from an arbitrary variable source
pub fn apply_overrides_from(
    config: &mut LoomConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> LoomResult<()> {
    if let Some(value) = lookup("LOOM_AGGRESSIVENESS") {
        config.context.aggressiveness = value
            .parse()
            .map_err(|e| LoomError::config(format!("Invalid LOOM_AGGRESSIVENESS value: {}", e)))?;
    }
    if let Some(value) = lookup("LOOM_TOKENS_PER_MINUTE") {
        config.rate_limit.tokens_per_minute = parse_var("LOOM_TOKENS_PER_MINUTE", &value)?;
    }
    if let Some(value) = lookup("LOOM_RATE_LIMIT_PROVIDER") {
        config.rate_limit.provider = value;
    }
    if let Some(value) = lookup("LOOM_MAX_RETRIES") {
        config.retry.max_retries = parse_var("LOOM_MAX_RETRIES", &value)?;
    }
    if let Some(value) = lookup("LOOM_MAX_MISTAKES") {
        config.parser.max_mistakes = parse_var("LOOM_MAX_MISTAKES", &value)?;
    }
    if let Some(value) = lookup("LOOM_USAGE_STORE") {
        config.usage.store_path = Some(PathBuf::from(value));
    }
    if let Some(value) = lookup("LOOM_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Some(value) = lookup("LOOM_LOG_FORMAT") {
        config.logging.format = value.parse().map_err(LoomError::config)?;
    }

    debug!("Applied environment overrides");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use crate::context::Aggressiveness;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = LoomConfig::default();
        apply_overrides_from(
            &mut config,
            lookup(&[
                ("LOOM_AGGRESSIVENESS", "conservative"),
                ("LOOM_TOKENS_PER_MINUTE", "120000"),
                ("LOOM_MAX_RETRIES", "7"),
                ("LOOM_LOG_LEVEL", "debug"),
                ("LOOM_LOG_FORMAT", "json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.context.aggressiveness, Aggressiveness::Conservative);
        assert_eq!(config.rate_limit.tokens_per_minute, 120_000);
        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.parser.max_mistakes, 3);
    }

    #[test]
    fn test_no_variables_no_changes() {
        let mut config = LoomConfig::default();
        apply_overrides_from(&mut config, lookup(&[])).unwrap();
        assert_eq!(config, LoomConfig::default());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let mut config = LoomConfig::default();
        let err = apply_overrides_from(&mut config, lookup(&[("LOOM_MAX_RETRIES", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("LOOM_MAX_RETRIES"));

        let err =
            apply_overrides_from(&mut config, lookup(&[("LOOM_AGGRESSIVENESS", "reckless")]))
                .unwrap_err();
        assert!(matches!(err, LoomError::Config { .. }));
    }
}
