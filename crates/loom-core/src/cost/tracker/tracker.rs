//! Token tracker implementation

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::types::{StreamRecord, UsageRecord, UsageStats};
use crate::config::{RateLimitConfig, UsageConfig};
use crate::cost::pricing::PricingTable;
use crate::cost::rate_limit::{RateLimitDecision, RateLimitWindow, RateLimiter};
use crate::error::LoomResult;
use crate::storage::KeyValueStore;

/// Window used by [`TokenTracker::overall_stats`]
const OVERALL_WINDOW_HOURS: i64 = 24;

/// Usage, cost and rate-limit tracker for one session
///
/// Usage history is an append-only list of [`UsageRecord`]s persisted in a
/// [`KeyValueStore`]. Records older than the retention period are dropped
/// whenever new usage is tracked. Only usage reported for the rate-limited
/// provider counts against the per-minute quota.
pub struct TokenTracker {
    store: Arc<dyn KeyValueStore>,
    pricing: PricingTable,
    limiter: Mutex<RateLimiter>,
    rate_limited_provider: String,
    session_id: String,
    history_key: String,
    stream_key: String,
    retention: ChronoDuration,
    /// Serializes read-modify-write cycles on the store
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for TokenTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenTracker")
            .field("session_id", &self.session_id)
            .field("rate_limited_provider", &self.rate_limited_provider)
            .field("history_key", &self.history_key)
            .field("retention_days", &self.retention.num_days())
            .finish()
    }
}

impl TokenTracker {
    /// Create a tracker with default quota, retention and pricing
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::from_config(store, &RateLimitConfig::default(), &UsageConfig::default())
    }

    pub fn from_config(
        store: Arc<dyn KeyValueStore>,
        rate_limit: &RateLimitConfig,
        usage: &UsageConfig,
    ) -> Self {
        let limiter = RateLimiter::new(rate_limit.tokens_per_minute)
            .with_burst_fraction(rate_limit.burst_fraction);

        Self {
            store,
            pricing: PricingTable::with_defaults(),
            limiter: Mutex::new(limiter),
            rate_limited_provider: rate_limit.provider.clone(),
            session_id: uuid::Uuid::new_v4().to_string(),
            history_key: usage.history_key.clone(),
            stream_key: usage.stream_key.clone(),
            retention: ChronoDuration::days(i64::from(usage.retention_days)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Mutex::new(limiter);
        self
    }

    pub fn with_rate_limited_provider(mut self, provider: impl Into<String>) -> Self {
        self.rate_limited_provider = provider.into();
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn rate_limited_provider(&self) -> &str {
        &self.rate_limited_provider
    }

    /// Whether usage reported for `provider` counts against the quota
    pub fn counts_against_quota(&self, provider: &str) -> bool {
        self.pricing.resolve_provider(provider)
            == self.pricing.resolve_provider(&self.rate_limited_provider)
    }

    // ========== Rate limiting ==========

    pub fn check_rate_limit(&self, estimated_tokens: u64) -> RateLimitDecision {
        self.limiter.lock().check_rate_limit(estimated_tokens)
    }

    pub fn check_rate_limit_at(&self, estimated_tokens: u64, now: DateTime<Utc>) -> RateLimitDecision {
        self.limiter.lock().check_rate_limit_at(estimated_tokens, now)
    }

    pub fn check_burst(&self, estimated_tokens: u64) -> RateLimitDecision {
        self.limiter.lock().check_burst(estimated_tokens)
    }

    pub fn check_burst_at(&self, estimated_tokens: u64, now: DateTime<Utc>) -> RateLimitDecision {
        self.limiter.lock().check_burst_at(estimated_tokens, now)
    }

    /// Snapshot of the current rate-limit window
    pub fn rate_limit_status(&self) -> RateLimitWindow {
        self.limiter.lock().status()
    }

    pub fn rate_limit_status_at(&self, now: DateTime<Utc>) -> RateLimitWindow {
        self.limiter.lock().status_at(now)
    }

    // ========== Usage history ==========

    /// Record one completed API call
    ///
    /// Without an explicit `session_id` the tracker's own session is used.
    pub fn track_api_usage(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        model: &str,
        provider: &str,
        session_id: Option<&str>,
    ) -> LoomResult<UsageRecord> {
        self.track_api_usage_at(input_tokens, output_tokens, model, provider, session_id, Utc::now())
    }

    pub fn track_api_usage_at(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        model: &str,
        provider: &str,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> LoomResult<UsageRecord> {
        let cost = self
            .pricing
            .calculate_cost(provider, model, input_tokens, output_tokens);
        let record = UsageRecord::new(provider, model, input_tokens, output_tokens, cost)
            .with_session(session_id.unwrap_or(self.session_id.as_str()))
            .with_timestamp(now);

        if self.counts_against_quota(provider) {
            self.limiter.lock().record_usage_at(record.total_tokens, now);
        }

        let _guard = self.write_lock.lock();
        let mut history: Vec<UsageRecord> = self.load_list(&self.history_key)?;
        history.push(record.clone());
        let purged = self.retain_recent(&mut history, now);
        self.save_list(&self.history_key, &history)?;

        debug!(
            provider,
            model,
            input_tokens,
            output_tokens,
            cost,
            purged,
            "Tracked API usage"
        );
        Ok(record)
    }

    /// All persisted usage records, oldest first
    pub fn history(&self) -> LoomResult<Vec<UsageRecord>> {
        self.load_list(&self.history_key)
    }

    pub fn current_session_stats(&self) -> LoomResult<UsageStats> {
        let history = self.history()?;
        Ok(UsageStats::from_records(
            history
                .iter()
                .filter(|r| r.session_id.as_deref() == Some(self.session_id.as_str())),
        ))
    }

    /// Stats over the last 24 hours
    pub fn overall_stats(&self) -> LoomResult<UsageStats> {
        self.overall_stats_at(Utc::now())
    }

    pub fn overall_stats_at(&self, now: DateTime<Utc>) -> LoomResult<UsageStats> {
        let since = now - ChronoDuration::hours(OVERALL_WINDOW_HOURS);
        let history = self.history()?;
        Ok(UsageStats::from_records(
            history.iter().filter(|r| r.timestamp >= since),
        ))
    }

    /// Stats over the whole history, keyed by provider
    pub fn stats_by_provider(&self) -> LoomResult<BTreeMap<String, UsageStats>> {
        let history = self.history()?;
        let mut grouped: BTreeMap<String, Vec<&UsageRecord>> = BTreeMap::new();
        for record in &history {
            grouped.entry(record.provider.clone()).or_default().push(record);
        }

        Ok(grouped
            .into_iter()
            .map(|(provider, records)| (provider, UsageStats::from_records(records)))
            .collect())
    }

    /// Drop records older than the retention period
    pub fn cleanup_old_records(&self) -> LoomResult<usize> {
        self.cleanup_old_records_at(Utc::now())
    }

    pub fn cleanup_old_records_at(&self, now: DateTime<Utc>) -> LoomResult<usize> {
        let _guard = self.write_lock.lock();
        let mut history: Vec<UsageRecord> = self.load_list(&self.history_key)?;
        let purged = self.retain_recent(&mut history, now);
        if purged > 0 {
            self.save_list(&self.history_key, &history)?;
            info!(purged, "Removed expired usage records");
        }
        Ok(purged)
    }

    pub fn clear_history(&self) -> LoomResult<()> {
        let _guard = self.write_lock.lock();
        self.store.update(&self.history_key, Value::Array(Vec::new()))?;
        info!("Cleared usage history");
        Ok(())
    }

    fn retain_recent(&self, history: &mut Vec<UsageRecord>, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let before = history.len();
        history.retain(|r| r.timestamp >= cutoff);
        before - history.len()
    }

    // ========== Streaming ==========

    /// Begin bookkeeping for a streamed response, returning its id
    pub fn start_stream_tracking(&self) -> LoomResult<String> {
        let now = Utc::now();
        let record = StreamRecord {
            stream_id: format!("stream_{}", uuid::Uuid::new_v4().simple()),
            started_at: now,
            interrupted_for_tool: None,
            completed_at: None,
            output_tokens: None,
        };
        let stream_id = record.stream_id.clone();

        let _guard = self.write_lock.lock();
        let mut streams: Vec<StreamRecord> = self.load_list(&self.stream_key)?;
        let cutoff = now - self.retention;
        streams.retain(|s| s.started_at >= cutoff);
        streams.push(record);
        self.save_list(&self.stream_key, &streams)?;

        debug!(stream_id = %stream_id, "Started stream tracking");
        Ok(stream_id)
    }

    /// Mark a stream as cut short by a tool invocation
    ///
    /// Returns false when the stream id is unknown.
    pub fn interrupt_stream_for_tool(&self, stream_id: &str, tool_name: &str) -> LoomResult<bool> {
        self.update_stream(stream_id, |stream| {
            stream.interrupted_for_tool = Some(tool_name.to_string());
        })
    }

    /// Mark a stream as finished
    pub fn complete_stream(&self, stream_id: &str, output_tokens: Option<u64>) -> LoomResult<bool> {
        self.update_stream(stream_id, |stream| {
            stream.completed_at = Some(Utc::now());
            stream.output_tokens = output_tokens;
        })
    }

    pub fn stream_history(&self) -> LoomResult<Vec<StreamRecord>> {
        self.load_list(&self.stream_key)
    }

    fn update_stream(
        &self,
        stream_id: &str,
        apply: impl FnOnce(&mut StreamRecord),
    ) -> LoomResult<bool> {
        let _guard = self.write_lock.lock();
        let mut streams: Vec<StreamRecord> = self.load_list(&self.stream_key)?;
        let Some(stream) = streams.iter_mut().find(|s| s.stream_id == stream_id) else {
            warn!(stream_id, "Unknown stream id");
            return Ok(false);
        };

        apply(stream);
        self.save_list(&self.stream_key, &streams)?;
        Ok(true)
    }

    // ========== Persistence ==========

    /// Load a JSON array, skipping entries that do not deserialize
    fn load_list<T: DeserializeOwned>(&self, key: &str) -> LoomResult<Vec<T>> {
        let value = self.store.get_or(key, Value::Array(Vec::new()))?;
        let Value::Array(items) = value else {
            warn!(key, "Stored value is not an array, ignoring it");
            return Ok(Vec::new());
        };

        let total = items.len();
        let parsed: Vec<T> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        if parsed.len() < total {
            debug!(key, skipped = total - parsed.len(), "Skipped malformed stored entries");
        }
        Ok(parsed)
    }

    fn save_list<T: Serialize>(&self, key: &str, items: &[T]) -> LoomResult<()> {
        self.store.update(key, serde_json::to_value(items)?)
    }
}
