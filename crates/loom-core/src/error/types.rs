//! Core error types for Loom

use std::time::Duration;

use thiserror::Error;

use crate::tools::ToolParseError;

/// Result type alias for Loom operations
pub type LoomResult<T> = Result<T, LoomError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C: std::fmt::Display>(self, context: C) -> LoomResult<T>;

    /// Add context lazily (only evaluated on error)
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> LoomResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context<C: std::fmt::Display>(self, context: C) -> LoomResult<T> {
        self.map_err(|e| LoomError::other(format!("{}: {}", context, e)))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> LoomResult<T> {
        self.map_err(|e| LoomError::other(format!("{}: {}", f(), e)))
    }
}

/// Main error type for Loom
#[derive(Error, Debug, Clone)]
pub enum LoomError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Errors reported by an LLM provider call
    ///
    /// `message` is matched by the retry classifier, so it should carry the
    /// provider's own wording (status line, error type) verbatim.
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        provider: Option<String>,
        status: Option<u16>,
        retry_after: Option<Duration>,
    },

    /// Tool-call protocol violations
    #[error(transparent)]
    Parse(#[from] ToolParseError),

    /// Local token quota exhausted for the current minute window
    #[error("Rate limit exceeded: {reason} (resets in {}s)", .wait.as_secs())]
    RateLimited { reason: String, wait: Duration },

    /// Persistence errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        key: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// Operation was cancelled
    #[error("Operation was cancelled")]
    Cancelled,

    /// Generic error
    #[error("Error: {message}")]
    Other { message: String },
}

impl LoomError {
    /// Short machine-readable code for the variant
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "LOOM_CONFIG",
            Self::Provider { .. } => "LOOM_PROVIDER",
            Self::Parse(err) => err.kind().code(),
            Self::RateLimited { .. } => "LOOM_RATE_LIMITED",
            Self::Storage { .. } => "LOOM_STORAGE",
            Self::Json { .. } => "LOOM_JSON",
            Self::Io { .. } => "LOOM_IO",
            Self::InvalidInput { .. } => "LOOM_INVALID_INPUT",
            Self::Cancelled => "LOOM_CANCELLED",
            Self::Other { .. } => "LOOM_OTHER",
        }
    }

    /// HTTP status attached to a provider error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => *status,
            _ => None,
        }
    }

    /// Explicit retry-after hint attached to the error, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Provider { retry_after, .. } => *retry_after,
            Self::RateLimited { wait, .. } => Some(*wait),
            _ => None,
        }
    }
}
