//! From trait implementations for LoomError conversions

use super::types::LoomError;

impl From<std::io::Error> for LoomError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for LoomError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<toml::de::Error> for LoomError {
    fn from(error: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML config: {}", error))
    }
}

impl From<toml::ser::Error> for LoomError {
    fn from(error: toml::ser::Error) -> Self {
        Self::config(format!("Failed to serialize TOML config: {}", error))
    }
}

impl From<serde_yaml::Error> for LoomError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::config(format!("Failed to parse YAML config: {}", error))
    }
}

impl From<reqwest::Error> for LoomError {
    fn from(error: reqwest::Error) -> Self {
        Self::Provider {
            message: error.to_string(),
            provider: None,
            status: error.status().map(|s| s.as_u16()),
            retry_after: None,
        }
    }
}
