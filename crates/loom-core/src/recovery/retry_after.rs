//! Retry-after extraction from provider responses
//!
//! Providers express "come back later" in several ways: delta seconds,
//! milliseconds, absolute Unix timestamps, HTTP dates or RFC 3339
//! timestamps. A bare number is taken as a Unix timestamp when it is at
//! least half the current epoch time; this is a magnitude heuristic and can
//! misread very large delta values.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

/// Headers consulted in order; the first one that parses wins
const RETRY_HEADERS: [&str; 4] = [
    "retry-after",
    "x-ratelimit-reset",
    "anthropic-ratelimit-tokens-reset",
    "anthropic-ratelimit-requests-reset",
];

fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

/// Seconds to a duration, saturating values too large to represent
fn duration_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
}

/// Parse a single retry-after value relative to `now`
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(ms) = value.strip_suffix("ms").and_then(parse_number) {
        return Some(duration_from_secs(ms / 1000.0));
    }
    if let Some(secs) = value.strip_suffix('s').and_then(parse_number) {
        return Some(duration_from_secs(secs));
    }

    if let Some(number) = parse_number(value) {
        let now_secs = now.timestamp() as f64;
        if number >= now_secs / 2.0 {
            return Some(duration_from_secs((number - now_secs).max(0.0)));
        }
        return Some(duration_from_secs(number));
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(until(date.with_timezone(&Utc), now));
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(until(date.with_timezone(&Utc), now));
    }

    None
}

/// Extract a retry-after hint from response headers
pub fn retry_after_from_headers(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(ms) = header("retry-after-ms").and_then(parse_number) {
        return Some(duration_from_secs(ms / 1000.0));
    }

    RETRY_HEADERS
        .iter()
        .find_map(|name| header(name).and_then(|value| parse_retry_after(value, now)))
}
