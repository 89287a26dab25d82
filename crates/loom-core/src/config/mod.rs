//! Configuration management for Loom
//!
//! Configuration is layered: built-in defaults, then an optional JSON, TOML
//! or YAML file, then `LOOM_*` environment variables. The result is
//! validated before use.

mod env_loader;
mod file_loader;
mod logging_config;
mod model;
mod validation;

pub use env_loader::{apply_env_overrides, apply_overrides_from};
pub use file_loader::{default_config_path, load_from_file, render_config, save_to_file};
pub use logging_config::{LogFormat, LoggingConfig};
pub use model::{LoomConfig, ParserConfig, RateLimitConfig, UsageConfig};
pub use validation::ConfigValidator;

use std::path::Path;

use crate::error::LoomResult;

impl LoomConfig {
    /// Load a config file; missing files yield the defaults
    pub fn load_from_file(path: &Path) -> LoomResult<Self> {
        load_from_file(path)
    }

    /// Load from `path` (or the default location), apply environment
    /// overrides and validate
    pub fn load(path: Option<&Path>) -> LoomResult<Self> {
        let default_path = default_config_path();
        let mut config = load_from_file(path.unwrap_or(&default_path))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> LoomResult<()> {
        apply_env_overrides(self)
    }

    pub fn validate(&self) -> LoomResult<()> {
        ConfigValidator::validate(self)
    }
}
