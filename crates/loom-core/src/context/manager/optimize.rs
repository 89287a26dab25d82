//! Content optimization: duplicate file reads, duplicate content, long messages

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::core::ContextManager;
use crate::context::text::{content_hash, jaccard, word_set};
use crate::grammar::file_read_path;
use crate::llm::Message;

/// Last recorded content of a file read
struct FileSnapshot {
    index: usize,
    words: HashSet<String>,
}

/// State carried through one optimization walk
#[derive(Default)]
struct SeenContent {
    files: HashMap<String, FileSnapshot>,
    hashes: HashSet<u64>,
}

impl SeenContent {
    fn record_file(&mut self, path: &str, index: usize, words: HashSet<String>) {
        self.files
            .insert(path.to_string(), FileSnapshot { index, words });
    }
}

impl ContextManager {
    /// Walk the messages after the preserved prefix, replacing repeated file
    /// reads, dropping repeated long content and compressing oversized
    /// messages. Returns the new list and whether anything changed.
    pub(super) fn optimize_content(
        &self,
        messages: Vec<Message>,
        prefix_end: usize,
    ) -> (Vec<Message>, bool) {
        let mut seen = SeenContent::default();
        let mut optimized = Vec::with_capacity(messages.len());
        let mut modified = false;

        for (index, message) in messages.into_iter().enumerate() {
            let text = message.text().into_owned();
            let length = text.chars().count();

            if index < prefix_end || message.is_system() {
                if let Some(path) = file_read_path(&text) {
                    seen.record_file(path, index, word_set(&text));
                }
                if length > self.config.min_duplicate_length {
                    seen.hashes.insert(content_hash(&text));
                }
                optimized.push(message);
                continue;
            }

            if let Some(path) = file_read_path(&text) {
                let words = word_set(&text);
                let original = seen
                    .files
                    .get(path)
                    .filter(|s| jaccard(&s.words, &words) >= self.config.duplicate_similarity_threshold)
                    .map(|s| s.index);

                match original {
                    Some(original) => {
                        if let Some(replacement) = self.duplicate_read_notice(&message, path, original) {
                            debug!(index, original, path, "Replaced duplicate file read");
                            optimized.push(replacement);
                            modified = true;
                            continue;
                        }
                    }
                    None => seen.record_file(path, index, words),
                }
            }

            if length > self.config.min_duplicate_length
                && !seen.hashes.insert(content_hash(&text))
            {
                debug!(index, length, "Dropped duplicate message content");
                modified = true;
                continue;
            }

            if length > self.config.max_message_length {
                if let Some(compressed) = self.compress_long_content(&text) {
                    let mut replacement = message.with_text(compressed);
                    let tokens = replacement.ensure_tokens(&self.estimator);
                    if tokens < self.estimator.estimate_message(&message) {
                        debug!(index, length, tokens, "Compressed long message");
                        optimized.push(replacement);
                        modified = true;
                        continue;
                    }
                }
            }

            optimized.push(message);
        }

        (optimized, modified)
    }

    /// Reference notice for an unchanged file read, if it is actually cheaper
    fn duplicate_read_notice(
        &self,
        message: &Message,
        path: &str,
        original: usize,
    ) -> Option<Message> {
        let notice = format!(
            "[DUPLICATE FILE READ OPTIMIZED] '{}' was already read in message {} and is unchanged; refer to that message for its content.",
            path, original
        );
        let mut replacement = message.with_text(notice);
        let tokens = replacement.ensure_tokens(&self.estimator);
        (tokens < self.estimator.estimate_message(message)).then_some(replacement)
    }
}
