//! Chat client composing context management, quotas, retries and tool parsing

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::messages::Message;
use super::provider::{ChatProvider, ProviderRequest, ProviderResponse};
use crate::config::LoomConfig;
use crate::context::{Aggressiveness, ContextManager, ContextStats};
use crate::cost::{TokenTracker, UsageRecord};
use crate::error::{LoomError, LoomResult};
use crate::events::{EventBus, LoomEvent};
use crate::recovery::{RetryConfig, RetryExecutor};
use crate::storage::KeyValueStore;
use crate::tools::{ToolCall, ToolCallParser, ToolDefinition};

/// Per-client request options
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub aggressiveness: Aggressiveness,
    /// Sleep out a local quota denial once instead of failing
    pub wait_on_rate_limit: bool,
    pub system_prompt: Option<String>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            aggressiveness: Aggressiveness::Moderate,
            wait_on_rate_limit: true,
            system_prompt: None,
        }
    }
}

/// Result of one [`ChatClient::send_message`] call
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    /// Model prose, with tool-call blocks removed when a parser is set
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: UsageRecord,
    pub context_stats: ContextStats,
    /// Provider attempts including the successful one
    pub attempts: u32,
}

impl ChatTurn {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Provider-agnostic chat client
///
/// Every call runs, in order: context management, a local quota check,
/// the provider call under the retry executor, usage tracking and, when a
/// tool catalog is configured, tool-call parsing. Callers serialize calls
/// for one conversation; the client itself holds no conversation state.
pub struct ChatClient<P> {
    provider: P,
    context: ContextManager,
    tracker: Arc<TokenTracker>,
    retry: RetryExecutor,
    retry_config: RetryConfig,
    parser: Option<Mutex<ToolCallParser>>,
    events: EventBus,
    options: ChatOptions,
    cancel_token: Option<CancellationToken>,
}

impl<P: ChatProvider> ChatClient<P> {
    /// Create a client with default settings
    pub fn new(provider: P, tracker: Arc<TokenTracker>) -> Self {
        let context = ContextManager::new(provider.model());
        Self {
            provider,
            context,
            tracker,
            retry: RetryExecutor::new(),
            retry_config: RetryConfig::api_call(),
            parser: None,
            events: EventBus::default(),
            options: ChatOptions::default(),
            cancel_token: None,
        }
    }

    /// Create a client wired from a loaded configuration
    pub fn from_config(provider: P, config: &LoomConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let tracker = TokenTracker::from_config(store, &config.rate_limit, &config.usage);
        let context = ContextManager::new(provider.model()).with_config(config.context.clone());
        let options = ChatOptions {
            aggressiveness: config.context.aggressiveness,
            wait_on_rate_limit: config.rate_limit.wait_on_rate_limit,
            system_prompt: None,
        };

        Self::new(provider, Arc::new(tracker))
            .with_context_manager(context)
            .with_retry_config(config.retry.clone())
            .with_options(options)
    }

    pub fn with_context_manager(mut self, context: ContextManager) -> Self {
        self.context = context;
        self
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn with_retry_executor(mut self, executor: RetryExecutor) -> Self {
        self.retry = executor;
        self
    }

    /// Enable tool-call parsing against `tools`
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.parser = Some(Mutex::new(ToolCallParser::new(tools)));
        self
    }

    pub fn with_parser(mut self, parser: ToolCallParser) -> Self {
        self.parser = Some(Mutex::new(parser));
        self
    }

    /// Publish events on `events`; retry attempts are forwarded too
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.retry.add_listener(Arc::new(events.clone()));
        self.events = events;
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.options.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn tracker(&self) -> &Arc<TokenTracker> {
        &self.tracker
    }

    pub fn context_manager(&self) -> &ContextManager {
        &self.context
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current consecutive protocol-violation count, zero without a parser
    pub fn mistake_count(&self) -> u32 {
        self.parser
            .as_ref()
            .map(|parser| parser.lock().mistake_count())
            .unwrap_or(0)
    }

    /// Replace the tool catalog of the parser, creating one if needed
    pub fn update_tools(&mut self, tools: Vec<ToolDefinition>) {
        match &self.parser {
            Some(parser) => parser.lock().update_tools(tools),
            None => self.parser = Some(Mutex::new(ToolCallParser::new(tools))),
        }
    }

    /// Send `user_message` after `history`
    #[instrument(skip_all, fields(provider = %self.provider.name(), model = %self.provider.model(), history = history.len()))]
    pub async fn send_message(
        &self,
        history: &[Message],
        user_message: impl Into<String>,
    ) -> LoomResult<ChatTurn> {
        let mut conversation = history.to_vec();
        conversation.push(Message::user(user_message));

        let managed = self
            .context
            .manage_context(&conversation, self.options.aggressiveness);
        if managed.was_modified {
            self.events.publish(LoomEvent::ContextTruncated {
                model: self.provider.model().to_string(),
                removed_messages: managed.stats.truncated_messages,
                tokens_saved: managed.stats.tokens_saved,
            });
        }
        let context_stats = managed.stats;

        let mut estimated = self.context.estimate_tokens(&managed.messages) as u64;
        if let Some(prompt) = &self.options.system_prompt {
            estimated += self.context.estimator().estimate(prompt) as u64;
        }
        self.acquire_quota(estimated).await?;

        let request = ProviderRequest {
            messages: managed.messages,
            system_prompt: self.options.system_prompt.clone(),
            tools: self
                .parser
                .as_ref()
                .map(|parser| parser.lock().tools().to_vec())
                .unwrap_or_default(),
        };

        let (response, attempts) = self.send_with_retry(&request).await?;

        let usage = self.tracker.track_api_usage(
            response.usage.input_tokens,
            response.usage.output_tokens,
            self.provider.model(),
            self.provider.name(),
            None,
        )?;

        let (text, tool_calls) = self.parse_tool_calls(response.content)?;
        debug!(
            attempts,
            tool_calls = tool_calls.len(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Chat turn complete"
        );

        Ok(ChatTurn {
            text,
            tool_calls,
            usage,
            context_stats,
            attempts,
        })
    }

    /// Check the burst budget, then the regular quota
    async fn acquire_quota(&self, estimated: u64) -> LoomResult<()> {
        if !self.tracker.counts_against_quota(self.provider.name()) {
            return Ok(());
        }
        if self.tracker.check_burst(estimated).allowed {
            return Ok(());
        }

        let decision = self.tracker.check_rate_limit(estimated);
        if decision.allowed {
            return Ok(());
        }

        let wait = decision.wait_time.unwrap_or(Duration::ZERO);
        let reason = decision
            .reason
            .unwrap_or_else(|| "token quota exceeded".to_string());
        if !self.options.wait_on_rate_limit {
            return Err(LoomError::rate_limited(reason, wait));
        }

        info!(wait_secs = wait.as_secs(), "Waiting for token quota");
        self.events
            .publish(LoomEvent::rate_limit_wait(self.provider.name(), wait, reason));

        match &self.cancel_token {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(LoomError::Cancelled),
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            None => tokio::time::sleep(wait).await,
        }
        Ok(())
    }

    async fn send_with_retry(&self, request: &ProviderRequest) -> LoomResult<(ProviderResponse, u32)> {
        let provider = &self.provider;
        let outcome = self
            .retry
            .with_retry(
                move || provider.send(request.clone()),
                &self.retry_config,
                "chat.send",
                self.cancel_token.as_ref(),
            )
            .await;

        let attempts = outcome.attempts;
        if !outcome.is_success() && !outcome.cancelled {
            warn!(
                attempts,
                elapsed_ms = outcome.total_duration.as_millis() as u64,
                "Provider call failed"
            );
        }
        outcome.into_result().map(|response| (response, attempts))
    }

    fn parse_tool_calls(&self, content: String) -> LoomResult<(String, Vec<ToolCall>)> {
        let Some(parser) = &self.parser else {
            return Ok((content, Vec::new()));
        };

        let parsed = {
            let mut parser = parser.lock();
            let parsed = parser.parse_response(&content)?;
            parser.reset_mistakes();
            parsed
        };

        for call in &parsed.tool_calls {
            self.events.publish(LoomEvent::tool_call(&call.id, &call.name));
        }
        Ok((parsed.text, parsed.tool_calls))
    }
}

impl<P: ChatProvider> std::fmt::Debug for ChatClient<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("options", &self.options)
            .field("has_parser", &self.parser.is_some())
            .finish()
    }
}
