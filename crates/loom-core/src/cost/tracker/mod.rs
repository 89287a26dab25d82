//! Usage, cost and quota tracking
//!
//! [`TokenTracker`] owns the per-minute [`crate::cost::RateLimiter`] for the
//! rate-limited provider and the persisted [`UsageRecord`] log.

#[allow(clippy::module_inception)]
mod tracker;
mod types;

pub use tracker::TokenTracker;
pub use types::{StreamRecord, UsageRecord, UsageStats, format_cost};
