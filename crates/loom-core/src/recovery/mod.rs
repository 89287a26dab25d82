//! Error recovery for provider calls
//!
//! This module provides:
//! - Error classification (transient vs permanent) from status codes and
//!   provider wording
//! - Exponential backoff with jitter
//! - A retry executor with listeners and cooperative cancellation
//! - Retry-after extraction from HTTP headers

pub mod backoff;
pub mod retry;
pub mod retry_after;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use retry::{RetryAttemptRecord, RetryConfig, RetryExecutor, RetryOutcome};
pub use retry_after::{parse_retry_after, retry_after_from_headers};

use crate::error::LoomError;

/// Error classification for recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient errors that may succeed on retry
    Transient,
    /// Permanent errors that will not succeed on retry
    Permanent,
    /// Unrecognized errors, retried optimistically
    Unknown,
}

impl ErrorClass {
    /// Check if an error of this class should be retried
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::Unknown)
    }
}

const AUTH_WORDING: [&str; 6] = [
    "unauthorized",
    "forbidden",
    "invalid api key",
    "invalid x-api-key",
    "authentication",
    "permission denied",
];
const RATE_LIMIT_WORDING: [&str; 5] = [
    "rate limit",
    "rate_limit",
    "too many requests",
    "quota",
    "resource_exhausted",
];
const NETWORK_WORDING: [&str; 9] = [
    "timeout",
    "timed out",
    "connection reset",
    "connection refused",
    "connection closed",
    "econnreset",
    "enotfound",
    "dns",
    "network",
];
const SERVER_WORDING: [&str; 4] = [
    "internal server error",
    "bad gateway",
    "service unavailable",
    "gateway timeout",
];
const VENDOR_WORDING: [&str; 4] = [
    "overloaded",
    "try again",
    "temporarily unavailable",
    "capacity",
];
const BAD_REQUEST_WORDING: [&str; 3] = ["bad request", "invalid", "malformed"];

/// Whether `code` appears in `message` as a standalone number
fn contains_code(message: &str, code: &str) -> bool {
    message.match_indices(code).any(|(start, _)| {
        let end = start + code.len();
        let before = message[..start].chars().next_back();
        let after = message[end..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
    })
}

fn contains_any(message: &str, wording: &[&str]) -> bool {
    wording.iter().any(|w| message.contains(w))
}

/// Classify an HTTP status code, if it is one the classifier knows about
pub fn classify_status(status: u16) -> Option<ErrorClass> {
    match status {
        401 | 403 => Some(ErrorClass::Permanent),
        408 | 409 | 429 => Some(ErrorClass::Transient),
        500..=599 => Some(ErrorClass::Transient),
        400 | 404 | 413 | 422 => Some(ErrorClass::Permanent),
        _ => None,
    }
}

/// Classify an error message by its wording
///
/// Authentication wording wins over everything else, so an "invalid api
/// key" message is never retried even though it says "invalid". Rate-limit,
/// network, server and vendor-overload wording are transient. Bad-request
/// wording is permanent. Anything unrecognized is [`ErrorClass::Unknown`].
pub fn classify_message(message: &str) -> ErrorClass {
    let msg = message.to_lowercase();

    if contains_any(&msg, &AUTH_WORDING) || contains_code(&msg, "401") || contains_code(&msg, "403")
    {
        ErrorClass::Permanent
    } else if contains_any(&msg, &RATE_LIMIT_WORDING) || contains_code(&msg, "429") {
        ErrorClass::Transient
    } else if contains_any(&msg, &NETWORK_WORDING) {
        ErrorClass::Transient
    } else if contains_any(&msg, &SERVER_WORDING)
        || ["500", "502", "503", "504", "529"]
            .iter()
            .any(|code| contains_code(&msg, code))
    {
        ErrorClass::Transient
    } else if contains_any(&msg, &VENDOR_WORDING) {
        ErrorClass::Transient
    } else if contains_any(&msg, &BAD_REQUEST_WORDING) || contains_code(&msg, "400") {
        ErrorClass::Permanent
    } else {
        ErrorClass::Unknown
    }
}

/// Classify a [`LoomError`] into an error class
pub fn classify_error(error: &LoomError) -> ErrorClass {
    match error {
        LoomError::Provider {
            message,
            status,
            retry_after,
            ..
        } => {
            let class = status
                .and_then(classify_status)
                .unwrap_or_else(|| classify_message(message));
            // A retry hint only settles errors nothing else could classify
            match (class, retry_after) {
                (ErrorClass::Unknown, Some(_)) => ErrorClass::Transient,
                (class, _) => class,
            }
        }
        LoomError::RateLimited { .. } => ErrorClass::Transient,
        LoomError::Parse(_) | LoomError::Cancelled => ErrorClass::Permanent,
        LoomError::Config { .. } | LoomError::InvalidInput { .. } => ErrorClass::Permanent,
        LoomError::Json { .. } => ErrorClass::Permanent,
        LoomError::Storage { .. } => ErrorClass::Unknown,
        LoomError::Io { message, .. } | LoomError::Other { message } => classify_message(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_classify_status_codes() {
        assert_eq!(
            classify_error(&LoomError::provider_status("whatever", 429)),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error(&LoomError::provider_status("whatever", 503)),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error(&LoomError::provider_status("whatever", 401)),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error(&LoomError::provider_status("whatever", 400)),
            ErrorClass::Permanent
        );
    }

    #[test]
    fn test_classify_provider_wording() {
        assert_eq!(
            classify_error(&LoomError::provider("401 Unauthorized")),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error(&LoomError::provider("Invalid API key provided")),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error(&LoomError::provider("Rate limit exceeded, please slow down")),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error(&LoomError::provider("request timed out after 60s")),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error(&LoomError::provider("502 Bad Gateway")),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error(&LoomError::provider("Overloaded")),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error(&LoomError::provider("400 bad request: messages must alternate")),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error(&LoomError::provider("something odd happened")),
            ErrorClass::Unknown
        );
    }

    #[test]
    fn test_status_codes_match_whole_numbers() {
        assert_eq!(classify_message("request id 54011 failed"), ErrorClass::Unknown);
        assert_eq!(classify_message("error 500 from upstream"), ErrorClass::Transient);
        assert!(contains_code("429", "429"));
        assert!(!contains_code("14290", "429"));
    }

    #[test]
    fn test_retry_after_forces_transient() {
        let error = LoomError::provider_retry_after("slow down", Duration::from_secs(5));
        assert_eq!(classify_error(&error), ErrorClass::Transient);

        let error = LoomError::Provider {
            message: "something odd happened".into(),
            provider: None,
            status: None,
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(classify_error(&error), ErrorClass::Transient);
    }

    #[test]
    fn test_retry_after_does_not_override_auth_failure() {
        let error = LoomError::Provider {
            message: "401 Unauthorized: invalid x-api-key".into(),
            provider: Some("anthropic".into()),
            status: Some(401),
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(classify_error(&error), ErrorClass::Permanent);

        let error = LoomError::Provider {
            message: "invalid api key".into(),
            provider: None,
            status: None,
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(classify_error(&error), ErrorClass::Permanent);
    }

    #[test]
    fn test_classify_local_errors() {
        assert_eq!(
            classify_error(&LoomError::rate_limited("quota", Duration::from_secs(3))),
            ErrorClass::Transient
        );
        assert_eq!(classify_error(&LoomError::Cancelled), ErrorClass::Permanent);
        assert_eq!(
            classify_error(&LoomError::config("bad value")),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error(&LoomError::io("connection reset by peer")),
            ErrorClass::Transient
        );
        assert!(ErrorClass::Unknown.is_retryable());
        assert!(!ErrorClass::Permanent.is_retryable());
    }
}
