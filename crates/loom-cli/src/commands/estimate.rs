//! Token estimate of a file

use std::path::Path;

use anyhow::Result;
use loom_core::TokenEstimator;

use super::read_input;
use crate::console::CliConsole;

pub fn run(input: &Path) -> Result<()> {
    let text = read_input(input)?;
    let estimator = TokenEstimator::new();
    let density = estimator.classify(&text);

    let console = CliConsole::new(true);
    console.print_header("Token Estimate");
    console.field("Characters", text.chars().count());
    console.field("Density", density);
    console.field("Chars per token", density.chars_per_token());
    console.field("Estimated tokens", estimator.estimate(&text));
    Ok(())
}
