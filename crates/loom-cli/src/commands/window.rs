//! Context window inspection

use anyhow::Result;
use colored::*;
use loom_core::{Aggressiveness, ContextWindowPolicy, LoomConfig, TruncationStrategy};

use crate::console::CliConsole;

pub fn run(
    config: &LoomConfig,
    model: &str,
    tokens: Option<usize>,
    aggressiveness: Option<&str>,
) -> Result<()> {
    let aggressiveness = match aggressiveness {
        Some(value) => value.parse::<Aggressiveness>()?,
        None => config.context.aggressiveness,
    };
    let policy = ContextWindowPolicy::default();
    let info = policy.window_info(model);

    let console = CliConsole::new(true);
    console.print_header(&format!("Context Window: {model}"));
    console.field("Context window", info.context_window);
    console.field("Max allowed size", info.max_allowed_size);
    console.field("Truncation threshold", info.recommended_truncation_threshold);
    console.field(
        &format!("Threshold ({aggressiveness})"),
        policy.scaled_threshold(model, aggressiveness),
    );

    let Some(tokens) = tokens else {
        return Ok(());
    };

    let usage = if info.max_allowed_size == 0 {
        0.0
    } else {
        tokens as f64 / info.max_allowed_size as f64 * 100.0
    };
    let strategy = policy.truncation_strategy(tokens, model);
    let truncate = policy.should_truncate_proactively(tokens, model, aggressiveness);

    println!();
    console.field("Tokens", tokens);
    console.field("Usage", format!("{usage:.1}%"));
    console.field(
        "Proactive truncation",
        if truncate { "yes".yellow() } else { "no".green() },
    );
    let strategy_label = format!("{strategy:?}");
    console.field(
        "Strategy",
        match strategy {
            TruncationStrategy::None => strategy_label.green(),
            TruncationStrategy::Quarter => strategy_label.red(),
            _ => strategy_label.yellow(),
        },
    );
    Ok(())
}
