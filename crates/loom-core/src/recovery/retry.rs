//! Retry executor for transient provider failures
//!
//! [`RetryExecutor::with_retry`] runs an async operation up to
//! `max_retries + 1` times. Failures are classified with
//! [`classify_error`]; permanent errors stop the loop at once. Between
//! attempts the executor sleeps for either the error's explicit retry-after
//! hint (capped at `max_delay`, never jittered) or an exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::backoff::{BackoffConfig, ExponentialBackoff};
use super::classify_error;
use crate::error::{LoomError, LoomResult};
use crate::events::{RetryEvent, RetryListener};

/// Jitter applied to computed backoff delays
const JITTER_RATIO: f64 = 0.1;

/// Configuration for retry behavior
///
/// # Example
/// ```
/// use loom_core::recovery::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_max_retries(5)
///     .with_base_delay(Duration::from_millis(200))
///     .with_max_delay(Duration::from_secs(10));
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Maximum delay between retries
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add ±10% random jitter to computed delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for LLM API calls: more retries, longer delays
    pub fn api_call() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(60_000),
            backoff_multiplier: 2.5,
            jitter: true,
        }
    }

    /// Create a config that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Convert to BackoffConfig for use with [`ExponentialBackoff`]
    pub fn to_backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            multiplier: self.backoff_multiplier,
            jitter: self.jitter,
            jitter_ratio: JITTER_RATIO,
        }
    }

    pub fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::with_config(self.to_backoff_config())
    }

    /// Delay before retrying after `error` on the given 1-based attempt
    pub fn delay_for(&self, error: &LoomError, attempt: u32) -> Duration {
        match error.retry_after() {
            Some(hint) => hint.min(self.max_delay),
            None => self.create_backoff().delay_for_attempt(attempt),
        }
    }
}

/// One failed attempt inside a `with_retry` call
#[derive(Debug, Clone, Serialize)]
pub struct RetryAttemptRecord {
    /// 1-based attempt number
    pub attempt: u32,
    pub error: String,
    /// Sleep scheduled after this attempt, zero when no retry followed
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    pub timestamp: DateTime<Utc>,
}

/// Result of a retried operation
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Final value or the last error
    pub result: LoomResult<T>,
    /// Attempts actually started
    pub attempts: u32,
    pub total_duration: Duration,
    /// Set when the cancellation token fired
    pub cancelled: bool,
    /// Every failed attempt, oldest first
    pub history: Vec<RetryAttemptRecord>,
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&LoomError> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> LoomResult<T> {
        self.result
    }
}

/// Runs operations with retries and notifies listeners of scheduled retries
#[derive(Clone, Default)]
pub struct RetryExecutor {
    listeners: Vec<Arc<dyn RetryListener>>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl RetryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return self
    pub fn with_listener(mut self, listener: Arc<dyn RetryListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn RetryListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&self, event: &RetryEvent) {
        for listener in &self.listeners {
            listener.on_retry_attempt(event);
        }
    }

    /// Execute an operation with retries
    ///
    /// Cancellation is checked before every attempt and raced against every
    /// backoff sleep. A cancelled run returns `LoomError::Cancelled` with
    /// `cancelled` set.
    #[instrument(skip_all, fields(operation = %operation_name, max_retries = config.max_retries))]
    pub async fn with_retry<T, F, Fut>(
        &self,
        mut operation: F,
        config: &RetryConfig,
        operation_name: &str,
        cancel_token: Option<&CancellationToken>,
    ) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LoomResult<T>>,
    {
        let start = Instant::now();
        let mut history = Vec::new();
        let mut attempt = 0u32;

        let finish = |result: LoomResult<T>,
                      attempts: u32,
                      cancelled: bool,
                      history: Vec<RetryAttemptRecord>| RetryOutcome {
            result,
            attempts,
            total_duration: start.elapsed(),
            cancelled,
            history,
        };

        loop {
            if cancel_token.is_some_and(|token| token.is_cancelled()) {
                debug!(attempts = attempt, "Retry loop cancelled before attempt");
                return finish(Err(LoomError::Cancelled), attempt, true, history);
            }

            attempt += 1;
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempts = attempt, "Operation succeeded after retry");
                    }
                    return finish(Ok(value), attempt, false, history);
                }
                Err(error) => error,
            };

            let class = classify_error(&error);
            let exhausted = attempt > config.max_retries;
            if !class.is_retryable() || exhausted {
                if exhausted && class.is_retryable() {
                    error!(attempts = attempt, error = %error, "Retries exhausted");
                } else {
                    debug!(attempts = attempt, class = ?class, error = %error, "Error is not retryable");
                }
                history.push(RetryAttemptRecord {
                    attempt,
                    error: error.to_string(),
                    delay: Duration::ZERO,
                    timestamp: Utc::now(),
                });
                return finish(Err(error), attempt, false, history);
            }

            let delay = config.delay_for(&error, attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Operation failed, retrying"
            );

            history.push(RetryAttemptRecord {
                attempt,
                error: error.to_string(),
                delay,
                timestamp: Utc::now(),
            });
            self.notify(&RetryEvent {
                operation: operation_name.to_string(),
                attempt,
                max_retries: config.max_retries,
                delay,
                error: error.to_string(),
            });

            if let Some(token) = cancel_token {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(attempts = attempt, "Retry loop cancelled during backoff");
                        return finish(Err(LoomError::Cancelled), attempt, true, history);
                    }
                    _ = sleep(delay) => {}
                }
            } else {
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<RetryEvent>>,
    }

    impl RetryListener for RecordingListener {
        fn on_retry_attempt(&self, event: &RetryEvent) {
            self.events.lock().push(event.clone());
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(false)
    }

    #[test]
    fn test_presets() {
        let default = RetryConfig::default();
        assert_eq!(default.max_retries, 3);
        assert_eq!(default.base_delay, Duration::from_secs(1));
        assert_eq!(default.max_delay, Duration::from_secs(30));

        let api = RetryConfig::api_call();
        assert_eq!(api.max_retries, 5);
        assert_eq!(api.base_delay, Duration::from_secs(2));
        assert_eq!(api.max_delay, Duration::from_secs(60));
        assert_eq!(api.backoff_multiplier, 2.5);
    }

    #[test]
    fn test_retry_after_hint_is_capped_without_jitter() {
        let config = RetryConfig::default();
        let error = LoomError::provider_retry_after("slow down", Duration::from_secs(120));
        assert_eq!(config.delay_for(&error, 1), Duration::from_secs(30));

        let error = LoomError::provider_retry_after("slow down", Duration::from_secs(5));
        assert_eq!(config.delay_for(&error, 3), Duration::from_secs(5));
    }

    #[test]
    fn test_config_deserializes_humantime() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"max_retries": 2, "base_delay": "250ms"}"#).unwrap();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.base_delay, Duration::from_millis(250));
        assert_eq!(config.max_delay, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let listener = Arc::new(RecordingListener::default());
        let executor = RetryExecutor::new().with_listener(listener.clone());

        let outcome = executor
            .with_retry(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(LoomError::provider("503 Service Unavailable"))
                        } else {
                            Ok("done")
                        }
                    }
                },
                &fast_config(),
                "test.op",
                None,
            )
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.history.len(), 2);
        // 100ms then 200ms
        assert_eq!(outcome.total_duration, Duration::from_millis(300));

        let events = listener.events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].operation, "test.op");
        assert_eq!(events[0].attempt, 1);
        assert_eq!(events[1].delay, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_stops_immediately() {
        let executor = RetryExecutor::new();
        let outcome: RetryOutcome<()> = executor
            .with_retry(
                || async { Err(LoomError::provider("401 Unauthorized: invalid x-api-key")) },
                &fast_config(),
                "test.auth",
                None,
            )
            .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.total_duration, Duration::ZERO);
        assert_eq!(outcome.history[0].delay, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_with_reset_headers_is_not_retried() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "anthropic-ratelimit-tokens-reset",
            reqwest::header::HeaderValue::from_static("2099-01-01T00:00:00Z"),
        );
        headers.insert("retry-after", reqwest::header::HeaderValue::from_static("5"));

        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::new();
        let outcome: RetryOutcome<()> = executor
            .with_retry(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let error =
                        LoomError::from_http("anthropic", 401, &headers, "invalid x-api-key");
                    async move { Err(error) }
                },
                &fast_config(),
                "test.auth_headers",
                None,
            )
            .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.total_duration, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<()> = RetryExecutor::new()
            .with_retry(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(LoomError::provider("connection reset")) }
                },
                &fast_config().with_max_retries(2),
                "test.flaky",
                None,
            )
            .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.history.len(), 3);
        assert!(!outcome.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff() {
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let outcome: RetryOutcome<()> = RetryExecutor::new()
            .with_retry(
                || async { Err(LoomError::provider("overloaded")) },
                &fast_config().with_base_delay(Duration::from_secs(10)),
                "test.cancel",
                Some(&token),
            )
            .await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.attempts, 1);
        assert!(matches!(outcome.error(), Some(LoomError::Cancelled)));
        assert!(outcome.total_duration < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();

        let outcome: RetryOutcome<()> = RetryExecutor::new()
            .with_retry(|| async { Ok(()) }, &fast_config(), "test.noop", Some(&token))
            .await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.attempts, 0);
    }
}
