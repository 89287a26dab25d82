//! Loom Core Library
//!
//! Conversation context management and tool-call protocol handling for
//! editor-integrated LLM assistants. The crate keeps multi-turn
//! conversations inside a provider's token window, tracks usage, cost and
//! per-minute token quotas, retries transient provider failures with
//! backoff, and parses the XML tool-invocation protocol out of model output.
//!
//! The components are leaf-first:
//!
//! - [`context::TokenEstimator`] and [`context::ContextWindowPolicy`]
//! - [`recovery::RetryExecutor`]
//! - [`cost::RateLimiter`] and [`cost::TokenTracker`]
//! - [`context::ContextManager`]
//! - [`tools::ToolCallParser`]
//! - [`llm::ChatClient`], which composes all of the above around a
//!   [`llm::ChatProvider`]

pub mod config;
pub mod context;
pub mod cost;
pub mod error;
pub mod events;
pub mod grammar;
pub mod llm;
pub mod recovery;
pub mod storage;
pub mod tools;

// Re-export commonly used types
pub use config::LoomConfig;
pub use context::{
    Aggressiveness, ContextManager, ContextWindowInfo, ContextWindowPolicy, ManagedContextResult,
    TokenEstimator, TruncationStrategy,
};
pub use cost::{PricingTable, RateLimiter, TokenTracker, UsageRecord};
pub use error::{LoomError, LoomResult};
pub use events::{EventBus, LoomEvent, RetryListener};
pub use llm::{ChatClient, ChatProvider, Message, MessageRole};
pub use recovery::{RetryConfig, RetryExecutor, RetryOutcome};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use tools::{ParseResult, ToolCall, ToolCallParser, ToolDefinition, ToolParseError};
