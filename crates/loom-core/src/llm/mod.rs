//! LLM conversation types, the provider contract and the chat client

pub mod client;
pub mod messages;
pub mod provider;

pub use client::{ChatClient, ChatOptions, ChatTurn};
pub use messages::{CacheControl, ContentBlock, Message, MessageContent, MessageRole};
pub use provider::{ChatProvider, ProviderRequest, ProviderResponse, ProviderUsage};
