//! File-based configuration loading

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::model::LoomConfig;
use crate::error::{LoomError, LoomResult};

/// Default location of the config file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_default()
        .join("loom")
        .join("config.toml")
}

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if file doesn't exist.
pub fn load_from_file(path: &Path) -> LoomResult<LoomConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(LoomConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        LoomError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;

    let config: LoomConfig = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            LoomError::config_with_context(
                format!("Failed to parse TOML config: {}", e),
                format!("Deserializing TOML configuration from '{}'", path.display()),
            )
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            LoomError::config_with_context(
                format!("Failed to parse YAML config: {}", e),
                format!("Deserializing YAML configuration from '{}'", path.display()),
            )
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            LoomError::config_with_context(
                format!("Failed to parse JSON config: {}", e),
                format!("Deserializing JSON configuration from '{}'", path.display()),
            )
        })?,
    };

    Ok(config)
}

/// Serialize a configuration in the format implied by the file extension
pub fn render_config(config: &LoomConfig, path: &Path) -> LoomResult<String> {
    let rendered = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::to_string_pretty(config)?,
        Some("yaml") | Some("yml") => serde_yaml::to_string(config)?,
        _ => serde_json::to_string_pretty(config)?,
    };
    Ok(rendered)
}

/// Write a configuration file, creating parent directories if needed
pub fn save_to_file(config: &LoomConfig, path: &Path) -> LoomResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| LoomError::io(format!("Failed to create directory: {}", e)))?;
    }

    let content = render_config(config, path)?;
    fs::write(path, content).map_err(|e| {
        LoomError::io_with_path(format!("Failed to write config: {}", e), path.display().to_string())
    })?;

    debug!(path = %path.display(), "Saved configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Aggressiveness;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_from_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, LoomConfig::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("loom.toml");
        fs::write(
            &config_path,
            r#"
[context]
aggressiveness = "aggressive"
max_message_length = 1500

[retry]
max_retries = 5
base_delay = "2s"

[rate_limit]
tokens_per_minute = 80000
"#,
        )
        .unwrap();

        let config = load_from_file(&config_path).unwrap();
        assert_eq!(config.context.aggressiveness, Aggressiveness::Aggressive);
        assert_eq!(config.context.max_message_length, 1500);
        assert_eq!(config.context.duplicate_similarity_threshold, 0.9);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay, Duration::from_secs(2));
        assert_eq!(config.rate_limit.tokens_per_minute, 80_000);
        assert_eq!(config.parser.max_mistakes, 3);
    }

    #[test]
    fn test_load_from_yaml_and_json_files() {
        let temp_dir = TempDir::new().unwrap();

        let yaml_path = temp_dir.path().join("loom.yaml");
        fs::write(&yaml_path, "parser:\n  max_mistakes: 5\nlogging:\n  format: json\n").unwrap();
        let config = load_from_file(&yaml_path).unwrap();
        assert_eq!(config.parser.max_mistakes, 5);
        assert_eq!(config.logging.format, crate::config::LogFormat::Json);

        let json_path = temp_dir.path().join("loom.json");
        fs::write(&json_path, r#"{"usage": {"retention_days": 7}}"#).unwrap();
        let config = load_from_file(&json_path).unwrap();
        assert_eq!(config.usage.retention_days, 7);
    }

    #[test]
    fn test_parse_error_carries_context() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[context\n").unwrap();

        match load_from_file(&path) {
            Err(LoomError::Config { message, context }) => {
                assert!(message.contains("TOML"));
                assert!(context.unwrap().contains("broken.toml"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = LoomConfig::default();
        config.rate_limit.provider = "gemini".to_string();
        save_to_file(&config, &path).unwrap();

        assert_eq!(load_from_file(&path).unwrap(), config);
    }
}
