//! Small text helpers shared by the context passes

use std::collections::HashSet;

/// Words shorter than this are ignored when comparing content
const MIN_WORD_LEN: usize = 3;

/// Polynomial base for [`content_hash`]
const HASH_BASE: u64 = 31;

/// First `n` characters of `text`
pub fn head_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Last `n` characters of `text`
pub fn tail_chars(text: &str, n: usize) -> &str {
    let total = text.chars().count();
    if total <= n {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Lowercased whitespace-split words longer than two characters
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Jaccard similarity of two word sets, in `[0, 1]`
///
/// Two empty sets are identical.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Word-set similarity of two strings
pub fn similarity(a: &str, b: &str) -> f64 {
    jaccard(&word_set(a), &word_set(b))
}

/// Cheap polynomial hash over the characters of `text`
pub fn content_hash(text: &str) -> u64 {
    text.chars().fold(0u64, |hash, c| {
        hash.wrapping_mul(HASH_BASE).wrapping_add(c as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_tail_respect_char_boundaries() {
        let text = "✓✓✓abc";
        assert_eq!(head_chars(text, 2), "✓✓");
        assert_eq!(tail_chars(text, 4), "✓abc");
        assert_eq!(head_chars(text, 100), text);
        assert_eq!(tail_chars(text, 100), text);
    }

    #[test]
    fn test_word_set_ignores_short_words() {
        let words = word_set("a an the Rust is great");
        assert!(words.contains("the"));
        assert!(words.contains("rust"));
        assert!(!words.contains("an"));
        assert_eq!(words.len(), 3);
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(similarity("alpha beta gamma", "alpha beta gamma"), 1.0);
        assert_eq!(similarity("alpha beta", "gamma delta"), 0.0);
        assert!((similarity("alpha beta gamma delta", "alpha beta gamma") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_content_hash_distinguishes() {
        assert_eq!(content_hash("same text"), content_hash("same text"));
        assert_ne!(content_hash("same text"), content_hash("same texT"));
    }
}
