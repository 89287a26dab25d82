//! Per-minute token quota
//!
//! The window is coarse: it starts at the first read or write after the
//! previous window expired and lasts sixty seconds. Expiry is checked
//! lazily on every call; no timer is involved. The limiter never sleeps,
//! it only tells the caller how long to wait.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Length of one accounting window
pub const WINDOW_LENGTH: Duration = Duration::from_secs(60);

/// Token counters for the current one-minute window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub tokens_per_minute: u64,
    pub current_minute_tokens: u64,
    pub minute_window_start: DateTime<Utc>,
}

impl RateLimitWindow {
    pub fn new(tokens_per_minute: u64, now: DateTime<Utc>) -> Self {
        Self {
            tokens_per_minute,
            current_minute_tokens: 0,
            minute_window_start: now,
        }
    }

    /// Start a fresh window if the current one has expired
    ///
    /// Returns true when a reset happened.
    pub fn roll(&mut self, now: DateTime<Utc>) -> bool {
        let expired = (now - self.minute_window_start)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= WINDOW_LENGTH);
        if expired {
            self.current_minute_tokens = 0;
            self.minute_window_start = now;
        }
        expired
    }

    pub fn is_limit_exceeded(&self) -> bool {
        self.current_minute_tokens >= self.tokens_per_minute
    }

    pub fn remaining(&self) -> u64 {
        self.tokens_per_minute
            .saturating_sub(self.current_minute_tokens)
    }

    /// Time until the window resets, zero once it has expired
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = (now - self.minute_window_start)
            .to_std()
            .unwrap_or(Duration::ZERO);
        WINDOW_LENGTH.saturating_sub(elapsed)
    }
}

/// Outcome of a quota check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub reason: Option<String>,
    #[serde(with = "humantime_serde")]
    pub wait_time: Option<Duration>,
}

impl RateLimitDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            wait_time: None,
        }
    }

    pub fn deny(reason: impl Into<String>, wait_time: Duration) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            wait_time: Some(wait_time),
        }
    }
}

/// Token-per-minute limiter for one provider
///
/// A burst budget, `tokens_per_minute * burst_fraction`, lets small
/// requests overdraw the minute quota by at most one budget. Callers
/// consult [`RateLimiter::check_burst`] first and fall back to
/// [`RateLimiter::check_rate_limit`]; the limiter itself never combines
/// the two.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window: RateLimitWindow,
    burst_fraction: f64,
}

impl RateLimiter {
    pub fn new(tokens_per_minute: u64) -> Self {
        Self::starting_at(tokens_per_minute, Utc::now())
    }

    /// Create a limiter whose first window starts at `now`
    pub fn starting_at(tokens_per_minute: u64, now: DateTime<Utc>) -> Self {
        Self {
            window: RateLimitWindow::new(tokens_per_minute, now),
            burst_fraction: 0.0,
        }
    }

    pub fn with_burst_fraction(mut self, fraction: f64) -> Self {
        self.burst_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn tokens_per_minute(&self) -> u64 {
        self.window.tokens_per_minute
    }

    /// Size of the burst budget in tokens
    pub fn burst_budget(&self) -> u64 {
        (self.window.tokens_per_minute as f64 * self.burst_fraction) as u64
    }

    pub fn check_rate_limit(&mut self, estimated_tokens: u64) -> RateLimitDecision {
        self.check_rate_limit_at(estimated_tokens, Utc::now())
    }

    /// Check whether `estimated_tokens` fits in the current window
    pub fn check_rate_limit_at(
        &mut self,
        estimated_tokens: u64,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        if self.window.roll(now) {
            debug!("Rate limit window reset");
        }

        let projected = self.window.current_minute_tokens + estimated_tokens;
        if projected <= self.window.tokens_per_minute {
            return RateLimitDecision::allow();
        }

        let wait = self.window.time_until_reset(now);
        warn!(
            current = self.window.current_minute_tokens,
            estimated = estimated_tokens,
            limit = self.window.tokens_per_minute,
            wait_secs = wait.as_secs(),
            "Rate limit would be exceeded"
        );
        RateLimitDecision::deny(
            format!(
                "{} tokens used this minute, {} requested, limit {}",
                self.window.current_minute_tokens, estimated_tokens, self.window.tokens_per_minute
            ),
            wait,
        )
    }

    pub fn check_burst(&mut self, estimated_tokens: u64) -> RateLimitDecision {
        self.check_burst_at(estimated_tokens, Utc::now())
    }

    /// Check whether a request qualifies for the burst budget
    pub fn check_burst_at(&mut self, estimated_tokens: u64, now: DateTime<Utc>) -> RateLimitDecision {
        self.window.roll(now);

        let budget = self.burst_budget();
        if budget == 0 || estimated_tokens > budget {
            return RateLimitDecision::deny(
                format!("{} tokens exceed the burst budget of {}", estimated_tokens, budget),
                Duration::ZERO,
            );
        }

        let ceiling = self.window.tokens_per_minute + budget;
        if self.window.current_minute_tokens + estimated_tokens <= ceiling {
            RateLimitDecision::allow()
        } else {
            RateLimitDecision::deny(
                "burst budget exhausted for this minute",
                self.window.time_until_reset(now),
            )
        }
    }

    pub fn record_usage(&mut self, actual_tokens: u64) {
        self.record_usage_at(actual_tokens, Utc::now());
    }

    /// Add consumed tokens to the current window
    pub fn record_usage_at(&mut self, actual_tokens: u64, now: DateTime<Utc>) {
        self.window.roll(now);
        self.window.current_minute_tokens += actual_tokens;
    }

    /// Snapshot of the window with expiry applied
    pub fn status_at(&mut self, now: DateTime<Utc>) -> RateLimitWindow {
        self.window.roll(now);
        self.window.clone()
    }

    pub fn status(&mut self) -> RateLimitWindow {
        self.status_at(Utc::now())
    }
}
