//! Incremental detection of tool calls in a token stream

use std::collections::VecDeque;

use serde::Serialize;

use crate::grammar::OPEN_TAG;

/// What a streamed chunk revealed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// No tool call in progress
    Text,
    /// An opening tag for a known tool was seen in this chunk
    ToolCallStarted { name: String },
    /// Still buffering the body of an open tool call
    ToolCallPending { name: String },
    /// The closing tag arrived; `raw` is the full `<name>...</name>` block
    ToolCallComplete { name: String, raw: String },
}

/// Buffer state carried across chunks
#[derive(Debug, Clone, Default)]
pub(super) struct StreamState {
    buffer: String,
    open: Option<String>,
    completed: VecDeque<StreamEvent>,
}

impl StreamState {
    pub(super) fn reset(&mut self) {
        self.buffer.clear();
        self.open = None;
        self.completed.clear();
    }

    pub(super) fn buffered(&self) -> &str {
        &self.buffer
    }

    pub(super) fn queued_completions(&self) -> usize {
        self.completed.len()
    }

    /// Feed one chunk; `is_known` decides which tag names are tools
    ///
    /// The buffer is rescanned until no complete block remains, so one
    /// chunk can finish several calls. Completions are returned oldest
    /// first, one per call; the extras are queued and an empty chunk
    /// drains them.
    pub(super) fn push(&mut self, chunk: &str, is_known: impl Fn(&str) -> bool) -> StreamEvent {
        self.buffer.push_str(chunk);

        let status = loop {
            match self.scan(&is_known) {
                event @ StreamEvent::ToolCallComplete { .. } => self.completed.push_back(event),
                other => break other,
            }
        };
        self.completed.pop_front().unwrap_or(status)
    }

    fn scan(&mut self, is_known: &impl Fn(&str) -> bool) -> StreamEvent {
        let opened_now = if self.open.is_none() {
            match self.find_known_open_tag(is_known) {
                Some((start, name)) => {
                    self.buffer.drain(..start);
                    self.open = Some(name);
                    true
                }
                None => {
                    self.discard_keeping_partial_tag();
                    return StreamEvent::Text;
                }
            }
        } else {
            false
        };

        let Some(name) = self.open.clone() else {
            return StreamEvent::Text;
        };

        let closing = format!("</{}>", name);
        match self.buffer.find(&closing) {
            Some(offset) => {
                let end = offset + closing.len();
                let raw: String = self.buffer.drain(..end).collect();
                self.open = None;
                StreamEvent::ToolCallComplete { name, raw }
            }
            None if opened_now => StreamEvent::ToolCallStarted { name },
            None => StreamEvent::ToolCallPending { name },
        }
    }

    fn find_known_open_tag(&self, is_known: &impl Fn(&str) -> bool) -> Option<(usize, String)> {
        OPEN_TAG.captures_iter(&self.buffer).find_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str();
            is_known(name).then(|| (whole.start(), name.to_string()))
        })
    }

    /// Drop buffered prose, keeping a trailing `<...` that may become a tag
    fn discard_keeping_partial_tag(&mut self) {
        match self.buffer.rfind('<') {
            Some(idx) if !self.buffer[idx..].contains('>') => {
                self.buffer.drain(..idx);
            }
            _ => self.buffer.clear(),
        }
    }
}
