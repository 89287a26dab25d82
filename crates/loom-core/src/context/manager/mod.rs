//! Context window manager
//!
//! The primary pipeline, [`ContextManager::manage_context`], runs four
//! ordered stages over a copy of the conversation:
//!
//! 1. token annotation
//! 2. content optimization (duplicate file reads, duplicate long content,
//!    oversized messages)
//! 3. proactive range removal when the aggressiveness-scaled threshold is met
//! 4. emergency truncation when the hard ceiling is still exceeded
//!
//! [`ContextManager::compress_context`] is a separate, heavier strategy and
//! is not chained after the pipeline.

mod compress;
mod core;
mod optimize;
#[cfg(test)]
mod tests;
mod truncate;
mod types;

pub use core::ContextManager;
pub use types::{ContextStats, ContextUsageStats, ManagedContextResult};
