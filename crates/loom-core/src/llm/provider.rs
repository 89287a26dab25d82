//! Provider contract
//!
//! A provider is the vendor-specific network call. Everything around it
//! (context management, quotas, retries, tool parsing) lives in
//! [`super::ChatClient`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::messages::Message;
use crate::error::LoomResult;
use crate::tools::ToolDefinition;

/// One request to a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ProviderUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// A provider reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub content: String,
    pub usage: ProviderUsage,
}

impl ProviderResponse {
    pub fn new(content: impl Into<String>, usage: ProviderUsage) -> Self {
        Self {
            content: content.into(),
            usage,
        }
    }
}

/// Vendor chat call
///
/// Failures should be reported as [`crate::LoomError::Provider`] with the
/// HTTP status and any retry-after hint, see [`crate::LoomError::from_http`].
/// The retry executor classifies on those fields.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name used for pricing and quota accounting
    fn name(&self) -> &str;

    /// Model id used for window sizing and pricing
    fn model(&self) -> &str;

    /// Send one chat completion request
    async fn send(&self, request: ProviderRequest) -> LoomResult<ProviderResponse>;
}
