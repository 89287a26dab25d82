//! Cost tracking, pricing and rate limiting for LLM usage
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use loom_core::cost::TokenTracker;
//! use loom_core::storage::MemoryStore;
//!
//! let tracker = TokenTracker::new(Arc::new(MemoryStore::new()));
//!
//! let decision = tracker.check_rate_limit(12_000);
//! if !decision.allowed {
//!     println!("wait {:?}: {:?}", decision.wait_time, decision.reason);
//! }
//!
//! let record = tracker.track_api_usage(12_000, 800, "claude-sonnet-4-20250514", "anthropic", None)?;
//! println!("Cost: {}", loom_core::cost::format_cost(record.cost));
//! ```

pub mod pricing;
pub mod rate_limit;
pub mod tracker;

pub use pricing::{PricingTable, ProviderPricing, TokenPrice};
pub use rate_limit::{RateLimitDecision, RateLimitWindow, RateLimiter, WINDOW_LENGTH};
pub use tracker::{StreamRecord, TokenTracker, UsageRecord, UsageStats, format_cost};
