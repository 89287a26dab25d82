//! Usage and cost statistics

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use colored::*;
use loom_core::cost::{UsageStats, format_cost};
use loom_core::{JsonFileStore, LoomConfig, TokenTracker};

use crate::console::CliConsole;

pub fn run(
    config: &LoomConfig,
    store: Option<PathBuf>,
    session: Option<&str>,
    cleanup: bool,
) -> Result<()> {
    let path = store
        .or_else(|| config.usage.store_path.clone())
        .unwrap_or_else(JsonFileStore::default_path);
    let console = CliConsole::new(true);
    if !path.exists() {
        console.warn(&format!("No usage store at {}", path.display()));
        return Ok(());
    }

    let store = Arc::new(JsonFileStore::open(&path)?);
    let mut tracker = TokenTracker::from_config(store, &config.rate_limit, &config.usage);
    if let Some(session) = session {
        tracker = tracker.with_session_id(session);
    }

    if cleanup {
        let removed = tracker.cleanup_old_records()?;
        console.success(&format!("Removed {removed} expired records"));
    }

    console.print_header(&format!("Usage: {}", path.display()));
    if session.is_some() {
        let stats = tracker.current_session_stats()?;
        print_stats(&console, &format!("Session {}", tracker.session_id()), &stats);
    }
    print_stats(&console, "Last 24 hours", &tracker.overall_stats()?);

    for (provider, stats) in tracker.stats_by_provider()? {
        print_stats(&console, &format!("Provider {provider}"), &stats);
    }

    let history = tracker.history()?;
    let total: f64 = history.iter().map(|record| record.cost).sum();
    println!();
    console.field("Records", history.len());
    console.field("Total cost", format_cost(total).bold());
    Ok(())
}

fn print_stats(console: &CliConsole, title: &str, stats: &UsageStats) {
    println!();
    println!("{}", title.cyan().bold());
    console.field("Requests", stats.request_count);
    console.field("Sessions", stats.session_count);
    console.field("Input tokens", stats.input_tokens);
    console.field("Output tokens", stats.output_tokens);
    console.field("Avg tokens/request", format!("{:.0}", stats.average_tokens_per_request));
    console.field("Cost", stats.format_cost());
}
