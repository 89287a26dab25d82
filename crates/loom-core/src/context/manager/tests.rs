//! Tests for context manager

use crate::context::config::ContextManagerConfig;
use crate::context::manager::ContextManager;
use crate::context::window::{
    Aggressiveness, ContextWindowPolicy, ModelWindowTable, WindowReserve,
};
use crate::llm::{Message, MessageRole};

const MODEL: &str = "test-model";

/// Message of `words + 1` words; `lorem ` filler keeps it in the natural band
fn filler(role: MessageRole, index: usize, words: usize) -> Message {
    Message::new(role, format!("{:03} {}", index, "lorem ".repeat(words)))
}

/// Alternating user/assistant conversation of ~100-token messages
fn conversation(count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            filler(role, i, 69)
        })
        .collect()
}

fn policy_with(window: usize, max: usize, threshold: usize) -> ContextWindowPolicy {
    let mut table = ModelWindowTable::empty(window);
    table.reserves.push(WindowReserve {
        context_window: window,
        max_allowed_size: max,
        recommended_truncation_threshold: threshold,
    });
    ContextWindowPolicy::new(table)
}

fn manager_with(policy: ContextWindowPolicy) -> ContextManager {
    ContextManager::new(MODEL).with_policy(policy)
}

fn file_read(path: &str, words: std::ops::Range<usize>) -> Message {
    let body = words
        .map(|i| format!("token{}", i))
        .collect::<Vec<_>>()
        .join(" ");
    Message::user(format!("✓ read_file({})\n{}", path, body))
}

#[test]
fn test_filler_is_one_hundred_tokens() {
    let manager = ContextManager::new(MODEL);
    assert_eq!(manager.estimate_tokens(&conversation(1)), 100);
}

#[test]
fn test_empty_input_returns_zeroed_result() {
    let result = ContextManager::new(MODEL).manage_context(&[], Aggressiveness::Moderate);
    assert!(result.messages.is_empty());
    assert!(!result.was_modified);
    assert_eq!(result.stats.total_tokens, 0);
    assert_eq!(result.stats.tokens_saved, 0);
}

#[test]
fn test_small_conversation_untouched() {
    let messages = conversation(6);
    let result = ContextManager::new(MODEL).manage_context(&messages, Aggressiveness::Moderate);
    assert!(!result.was_modified);
    assert_eq!(result.messages.len(), 6);
    assert_eq!(result.stats.total_tokens, 600);
    assert_eq!(result.stats.truncated_messages, 0);
    for (out, input) in result.messages.iter().zip(&messages) {
        assert_eq!(out.text(), input.text());
    }
}

#[test]
fn test_input_slice_is_not_mutated() {
    let messages = conversation(4);
    let _ = ContextManager::new(MODEL).manage_context(&messages, Aggressiveness::Moderate);
    assert!(messages.iter().all(|m| m.tokens.is_none()));
}

#[test]
fn test_preserved_prefix_end() {
    let manager = ContextManager::new(MODEL);
    let mut messages = vec![Message::system("rules")];
    messages.extend(conversation(5));
    assert_eq!(manager.preserved_prefix_end(&messages), 3);
    assert_eq!(manager.preserved_prefix_end(&conversation(1)), 1);
}

#[test]
fn test_duplicate_file_read_replaced_with_reference() {
    let messages = vec![
        Message::user("Please check the library"),
        Message::assistant("Reading it now"),
        file_read("src/lib.rs", 0..60),
        Message::assistant("Looks fine, reading again to confirm"),
        // one word differs: similarity 59/61
        file_read("src/lib.rs", 1..61),
    ];

    let result = ContextManager::new(MODEL).manage_context(&messages, Aggressiveness::Moderate);
    assert!(result.was_modified);
    assert_eq!(result.messages.len(), 5);
    assert_eq!(result.messages[2].text(), messages[2].text());

    let notice = result.messages[4].text();
    assert!(notice.starts_with("[DUPLICATE FILE READ OPTIMIZED]"));
    assert!(notice.contains("message 2"));
    assert!(result.stats.tokens_saved > 0);
}

#[test]
fn test_changed_file_read_is_kept() {
    let messages = vec![
        Message::user("Please check the library"),
        Message::assistant("Reading it now"),
        file_read("src/lib.rs", 0..60),
        Message::assistant("I edited it, reading again"),
        file_read("src/lib.rs", 100..160),
    ];

    let result = ContextManager::new(MODEL).manage_context(&messages, Aggressiveness::Moderate);
    assert!(!result.was_modified);
    assert_eq!(result.messages[2].text(), messages[2].text());
    assert_eq!(result.messages[4].text(), messages[4].text());
}

#[test]
fn test_duplicate_file_read_of_prefix_content() {
    let messages = vec![
        file_read("a.rs", 0..60),
        Message::assistant("ok"),
        Message::user("again please"),
        Message::assistant("sure"),
        file_read("a.rs", 0..60),
    ];

    let result = ContextManager::new(MODEL).manage_context(&messages, Aggressiveness::Moderate);
    assert_eq!(result.messages[0].text(), messages[0].text());
    assert!(result.messages[4].text().contains("message 0"));
}

#[test]
fn test_duplicate_long_content_dropped() {
    let long = format!("Please remember: {}", "alpha beta gamma ".repeat(20));
    let messages = vec![
        Message::user("start"),
        Message::assistant("ok"),
        Message::user(long.clone()),
        Message::assistant("noted"),
        Message::user(long),
    ];

    let result = ContextManager::new(MODEL).manage_context(&messages, Aggressiveness::Moderate);
    assert!(result.was_modified);
    assert_eq!(result.messages.len(), 4);
    assert_eq!(result.stats.truncated_messages, 1);
    assert_eq!(result.messages[3].text(), "noted");
}

#[test]
fn test_short_duplicates_are_kept() {
    let messages = vec![
        Message::user("start"),
        Message::assistant("ok"),
        Message::user("continue"),
        Message::assistant("ok"),
        Message::user("continue"),
    ];
    let result = ContextManager::new(MODEL).manage_context(&messages, Aggressiveness::Moderate);
    assert_eq!(result.messages.len(), 5);
}

#[test]
fn test_long_plain_message_head_truncated() {
    let messages = vec![
        Message::user("start"),
        Message::assistant("ok"),
        Message::assistant("lorem ipsum ".repeat(250)),
    ];

    let result = ContextManager::new(MODEL).manage_context(&messages, Aggressiveness::Moderate);
    let text = result.messages[2].text();
    assert!(text.contains("[CONTENT TRUNCATED: 2200 characters omitted]"));
    assert!(result.stats.tokens_saved > 0);
}

#[test]
fn test_long_tool_result_keeps_status_line() {
    let output: String = (0..100).map(|i| format!("compiling crate_{:03}\n", i)).collect();
    let messages = vec![
        Message::user("build it"),
        Message::assistant("<run_command>{\"command\":\"cargo build\"}</run_command>"),
        Message::user(format!("✓ run_command(cargo build)\n{}", output)),
    ];

    let result = ContextManager::new(MODEL).manage_context(&messages, Aggressiveness::Moderate);
    let text = result.messages[2].text();
    assert!(text.starts_with("✓ run_command(cargo build)\ncompiling crate_000"));
    assert!(text.contains("characters compressed"));
    assert!(text.trim_end().ends_with("compiling crate_099"));
}

#[test]
fn test_long_prefix_message_not_compressed() {
    let messages = vec![
        Message::user("lorem ipsum ".repeat(250)),
        Message::assistant("ok"),
    ];
    let result = ContextManager::new(MODEL).manage_context(&messages, Aggressiveness::Moderate);
    assert!(!result.was_modified);
    assert_eq!(result.messages[0].text(), messages[0].text());
}

#[test]
fn test_half_truncation() {
    let manager = manager_with(policy_with(10_000, 9_000, 4_000));
    let messages = conversation(70);

    let result = manager.manage_context(&messages, Aggressiveness::Moderate);
    assert!(result.was_modified);
    assert_eq!(result.stats.truncated_messages, 34);
    assert_eq!(result.messages.len(), 36);
    assert_eq!(result.stats.tokens_saved, 3_400);
    // pairs are not split: the first survivor is a user message, no notice
    assert_eq!(result.messages[2].text(), messages[36].text());
}

#[test]
fn test_last_two_truncation_annotates_assistant() {
    let manager = manager_with(policy_with(10_000, 9_000, 6_000));
    let messages = conversation(71);

    let result = manager.manage_context(&messages, Aggressiveness::Moderate);
    assert_eq!(result.messages.len(), 4);
    let annotated = result.messages[2].text();
    assert_eq!(result.messages[2].role, MessageRole::Assistant);
    assert!(annotated.starts_with("[CONTEXT TRUNCATED] 67 previous messages removed"));
    assert!(annotated.ends_with(&*messages[69].text()));
    assert_eq!(result.messages[3].text(), messages[70].text());
}

#[test]
fn test_aggressiveness_changes_trigger_point() {
    let manager = manager_with(policy_with(10_000, 9_000, 6_000));
    let messages = conversation(50);

    let moderate = manager.manage_context(&messages, Aggressiveness::Moderate);
    assert!(!moderate.was_modified);

    let conservative = manager.manage_context(&messages, Aggressiveness::Conservative);
    assert!(conservative.was_modified);
    assert_eq!(conservative.messages.len(), 26);
}

#[test]
fn test_emergency_truncation_floor_is_stable() {
    let manager = manager_with(ContextWindowPolicy::new(ModelWindowTable::empty(1_000)))
        .with_config(ContextManagerConfig::default().with_max_message_length(100_000));

    let mut messages = vec![Message::system("You are a helpful assistant.")];
    messages.extend((0..20).map(|i| {
        let role = if i % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        filler(role, i, 209)
    }));

    let first = manager.manage_context(&messages, Aggressiveness::Moderate);
    assert_eq!(first.messages.len(), 5);
    assert!(first.messages[0].is_system());
    assert_eq!(first.messages[1].text(), messages[1].text());
    assert_eq!(first.messages[2].text(), messages[2].text());
    assert!(first.messages[3]
        .text()
        .starts_with("[EMERGENCY CONTEXT TRUNCATION] 4 earlier messages removed"));
    assert_eq!(first.messages[4].text(), messages[20].text());

    let second = manager.manage_context(&first.messages, Aggressiveness::Moderate);
    assert_eq!(second.messages.len(), 5);
    assert!(!second.was_modified);
}

#[test]
fn test_first_pair_preserved_for_all_lengths() {
    let manager = manager_with(ContextWindowPolicy::new(ModelWindowTable::empty(1_000)));
    for count in 2..40 {
        let messages = conversation(count);
        let result = manager.manage_context(&messages, Aggressiveness::Aggressive);
        assert!(result.messages.len() >= 2, "count {}", count);
        assert_eq!(result.messages[0].text(), messages[0].text(), "count {}", count);
        assert_eq!(result.messages[1].text(), messages[1].text(), "count {}", count);
        assert_eq!(
            result.stats.tokens_saved,
            manager.estimate_tokens(&messages) - result.stats.total_tokens
        );
    }
}

#[test]
fn test_mid_conversation_system_messages_survive() {
    let manager = manager_with(policy_with(10_000, 9_000, 4_000));
    let mut messages = conversation(70);
    messages.insert(30, Message::system("Mode switched to review"));

    let result = manager.manage_context(&messages, Aggressiveness::Moderate);
    assert!(result
        .messages
        .iter()
        .any(|m| m.is_system() && m.text() == "Mode switched to review"));
}

#[test]
fn test_usage_stats() {
    let manager = manager_with(policy_with(10_000, 9_000, 6_000));
    let stats = manager.usage_stats(&conversation(63));
    assert_eq!(stats.current_tokens, 6_300);
    assert_eq!(stats.context_window, 10_000);
    assert!(stats.is_approaching_limit);
    assert!(!stats.is_over_limit);
    assert_eq!(stats.tokens_until_limit(), 2_700);
    assert_eq!(stats.tokens_until_threshold(), 0);
}

#[test]
fn test_compress_context_summarizes_middle() {
    let manager = ContextManager::new(MODEL);
    let mut messages = conversation(14);
    messages[5] = Message::assistant("<read_file>{\"path\":\"src/main.rs\"}</read_file>");
    messages[7] = Message::assistant("Let me search for the error in the handler");

    let result = manager.compress_context(&messages);
    assert_eq!(result.messages.len(), 5);
    assert_eq!(result.messages[0].text(), messages[0].text());
    assert_eq!(result.messages[1].text(), messages[1].text());
    assert_eq!(result.messages[4].text(), messages[13].text());

    let summary = result.messages[2].text();
    assert!(result.messages[2].is_system());
    assert!(summary.starts_with("[CONVERSATION SUMMARY] 10 earlier messages compressed (5 user, 5 assistant)"));
    assert!(summary.contains("Tool calls: 1."));
    assert!(summary.contains("file operations"));
    assert!(summary.contains("code search"));
    assert!(summary.contains("debugging"));
    assert_eq!(result.stats.truncated_messages, 9);
}

#[test]
fn test_compress_context_drops_consecutive_near_duplicates() {
    let manager = ContextManager::new(MODEL);
    let messages = vec![
        Message::user("Run the test suite please"),
        Message::assistant("Running the whole test suite now"),
        Message::assistant("Running the whole test suite now again"),
        Message::user("thanks"),
    ];

    let result = manager.compress_context(&messages);
    assert_eq!(result.messages.len(), 3);
    assert_eq!(result.messages[2].text(), "thanks");
}

#[test]
fn test_compress_context_extracts_tool_result_key_lines() {
    let manager = ContextManager::new(MODEL);
    let mut output = String::from("✓ run_command(cargo test)\n");
    for i in 0..40 {
        output.push_str(&format!("test module_{}::case ... ok\n", i));
    }
    output.push_str("error: test failed, to rerun pass `--lib`\n");

    let messages = vec![Message::user("test it"), Message::user(output)];
    let result = manager.compress_context(&messages);

    let text = result.messages[1].text();
    assert_eq!(
        text,
        "✓ run_command(cargo test)\nerror: test failed, to rerun pass `--lib`"
    );
    assert!(result.stats.tokens_saved > 0);
}
