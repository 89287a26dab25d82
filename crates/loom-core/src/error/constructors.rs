//! Constructor methods for LoomError

use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;

use super::types::LoomError;
use crate::recovery::retry_after_from_headers;

/// Longest slice of a non-JSON error body kept in the message
const MAX_BODY_CHARS: usize = 500;

/// Pull the human-readable message out of a provider error body
///
/// Understands `{"error": {"message": ..}}`, `{"error": ".."}` and
/// `{"message": ..}`; anything else is used as-is.
fn error_body_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed.as_ref().and_then(|value| {
        value
            .pointer("/error/message")
            .or_else(|| value.get("error"))
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    });

    message.unwrap_or_else(|| body.trim().chars().take(MAX_BODY_CHARS).collect())
}

impl LoomError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a new provider error from a message only
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            provider: None,
            status: None,
            retry_after: None,
        }
    }

    /// Create a provider error carrying an HTTP status
    pub fn provider_status(message: impl Into<String>, status: u16) -> Self {
        Self::Provider {
            message: message.into(),
            provider: None,
            status: Some(status),
            retry_after: None,
        }
    }

    /// Create a provider error with an explicit retry-after hint
    pub fn provider_retry_after(message: impl Into<String>, retry_after: Duration) -> Self {
        Self::Provider {
            message: message.into(),
            provider: None,
            status: Some(429),
            retry_after: Some(retry_after),
        }
    }

    /// Build a provider error from a failed HTTP response
    ///
    /// The message starts with the status code and reason so the retry
    /// classifier sees the same wording a provider SDK would surface. The
    /// retry-after hint is read from the response headers only for 429 and
    /// 5xx responses.
    pub fn from_http(
        provider: impl Into<String>,
        status: u16,
        headers: &HeaderMap,
        body: &str,
    ) -> Self {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Unknown Status");

        let retry_after = if status == 429 || (500..600).contains(&status) {
            retry_after_from_headers(headers, Utc::now())
        } else {
            None
        };

        Self::Provider {
            message: format!("{} {}: {}", status, reason, error_body_message(body)),
            provider: Some(provider.into()),
            status: Some(status),
            retry_after,
        }
    }

    /// Create a local rate-limit error
    pub fn rate_limited(reason: impl Into<String>, wait: Duration) -> Self {
        Self::RateLimited {
            reason: reason.into(),
            wait,
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            key: None,
        }
    }

    /// Create a storage error for a specific key
    pub fn storage_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a new JSON error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
        }
    }

    /// Create a new IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
        }
    }

    /// Create an IO error for a path
    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Attach the provider name to a provider error; other variants pass through
    pub fn with_provider(self, name: impl Into<String>) -> Self {
        match self {
            Self::Provider {
                message,
                status,
                retry_after,
                ..
            } => Self::Provider {
                message,
                provider: Some(name.into()),
                status,
                retry_after,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_from_http_extracts_nested_message() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("7"));
        let body = r#"{"type":"error","error":{"type":"rate_limit_error","message":"Number of request tokens has exceeded your per-minute rate limit"}}"#;

        let error = LoomError::from_http("anthropic", 429, &headers, body);
        assert_eq!(error.status(), Some(429));
        assert_eq!(error.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(
            error.to_string(),
            "Provider error: 429 Too Many Requests: Number of request tokens has exceeded your per-minute rate limit"
        );
    }

    #[test]
    fn test_from_http_plain_body() {
        let error = LoomError::from_http("gemini", 503, &HeaderMap::new(), "  upstream busy \n");
        assert_eq!(error.retry_after(), None);
        assert!(error.to_string().contains("503 Service Unavailable: upstream busy"));
    }

    #[test]
    fn test_from_http_ignores_reset_headers_on_client_errors() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));
        headers.insert(
            "anthropic-ratelimit-tokens-reset",
            HeaderValue::from_static("2099-01-01T00:00:00Z"),
        );

        let unauthorized = LoomError::from_http("anthropic", 401, &headers, "invalid x-api-key");
        assert_eq!(unauthorized.retry_after(), None);
        let bad_request = LoomError::from_http("anthropic", 400, &headers, "bad request");
        assert_eq!(bad_request.retry_after(), None);

        let busy = LoomError::from_http("anthropic", 529, &headers, "overloaded");
        assert_eq!(busy.retry_after(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_from_http_survives_oversized_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("1e300"));
        let error = LoomError::from_http("openai", 429, &headers, "slow down");
        assert_eq!(error.retry_after(), Some(Duration::MAX));
    }
}
