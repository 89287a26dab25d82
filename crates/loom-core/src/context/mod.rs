//! Context window management for LLM conversations
//!
//! This module keeps multi-turn conversations inside a model's context
//! window:
//!
//! - [`TokenEstimator`] estimates token counts from text density
//! - [`ContextWindowPolicy`] maps model ids to window sizes and thresholds
//! - [`ContextManager`] deduplicates, compresses and truncates history
//! - [`format_tool_result`] renders tool output in a token-cheap form
//!
//! # Example
//!
//! ```rust,ignore
//! use loom_core::context::{Aggressiveness, ContextManager};
//! use loom_core::llm::Message;
//!
//! let manager = ContextManager::new("claude-sonnet-4-20250514");
//! let history = vec![
//!     Message::user("Refactor the parser"),
//!     Message::assistant("<read_file>{\"path\":\"src/parser.rs\"}</read_file>"),
//! ];
//!
//! let result = manager.manage_context(&history, Aggressiveness::Moderate);
//! println!("{} tokens saved", result.stats.tokens_saved);
//! ```

pub mod config;
pub mod estimator;
pub mod manager;
pub mod text;
pub mod tool_result;
pub mod window;

pub use config::ContextManagerConfig;
pub use estimator::{ContentDensity, TokenEstimator};
pub use manager::{ContextManager, ContextStats, ContextUsageStats, ManagedContextResult};
pub use tool_result::format_tool_result;
pub use window::{
    Aggressiveness, ContextWindowInfo, ContextWindowPolicy, DEFAULT_CONTEXT_WINDOW,
    ModelWindowTable, TruncationStrategy, WindowReserve,
};
