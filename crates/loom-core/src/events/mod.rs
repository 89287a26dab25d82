//! Event notification for UIs and diagnostics
//!
//! Two mechanisms live here:
//!
//! - [`RetryListener`]: synchronous, fire-and-forget callbacks registered on a
//!   [`crate::recovery::RetryExecutor`] for "retrying in N seconds" feedback
//! - [`EventBus`]: a broadcast channel carrying [`LoomEvent`]s to any number
//!   of subscribers
//!
//! The bus implements [`RetryListener`] itself, so registering it on an
//! executor forwards retry attempts to every subscriber.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;

/// One scheduled retry, reported before the backoff sleep starts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryEvent {
    /// Name passed to `with_retry`
    pub operation: String,
    /// 1-based number of the attempt that just failed
    pub attempt: u32,
    pub max_retries: u32,
    /// Sleep before the next attempt
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Display form of the failure
    pub error: String,
}

/// Receives retry notifications from a retry executor
///
/// Callbacks run inline on the retrying task and must not block.
pub trait RetryListener: Send + Sync {
    fn on_retry_attempt(&self, event: &RetryEvent);
}

/// Events published through the [`EventBus`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoomEvent {
    /// A failed operation will be retried after a delay
    RetryScheduled(RetryEvent),

    /// A request is held back by the local per-minute token quota
    RateLimitWait {
        provider: String,
        #[serde(with = "humantime_serde")]
        wait: Duration,
        reason: String,
    },

    /// The context manager removed or rewrote messages before a request
    ContextTruncated {
        model: String,
        removed_messages: usize,
        tokens_saved: usize,
    },

    /// A tool invocation was parsed out of model output
    ToolCallDetected { id: String, name: String },
}

impl LoomEvent {
    pub fn rate_limit_wait(
        provider: impl Into<String>,
        wait: Duration,
        reason: impl Into<String>,
    ) -> Self {
        Self::RateLimitWait {
            provider: provider.into(),
            wait,
            reason: reason.into(),
        }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ToolCallDetected {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RetryScheduled(_) => "retry_scheduled",
            Self::RateLimitWait { .. } => "rate_limit_wait",
            Self::ContextTruncated { .. } => "context_truncated",
            Self::ToolCallDetected { .. } => "tool_call_detected",
        }
    }
}

/// Broadcast bus for [`LoomEvent`]s
///
/// Each subscriber receives a copy of every event published after it
/// subscribed. Slow subscribers lose the oldest events once `capacity` is
/// exceeded.
///
/// # Example
///
/// ```rust
/// use loom_core::events::{EventBus, LoomEvent};
///
/// #[tokio::main]
/// async fn main() {
///     let bus = EventBus::new(16);
///     let mut subscriber = bus.subscribe();
///
///     bus.publish(LoomEvent::tool_call("toolu_1", "read_file"));
///
///     let event = subscriber.recv().await.unwrap();
///     assert_eq!(event.event_type(), "tool_call_detected");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LoomEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, capacity }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers reached, 0 when nobody listens.
    pub fn publish(&self, event: LoomEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<LoomEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl RetryListener for EventBus {
    fn on_retry_attempt(&self, event: &RetryEvent) {
        self.publish(LoomEvent::RetryScheduled(event.clone()));
    }
}

/// Thread-safe handle to a shared bus
pub type SharedEventBus = Arc<EventBus>;
