//! Tool-call parsing of a saved model response

use std::path::Path;

use anyhow::{Context, Result, bail};
use loom_core::{LoomConfig, ToolCallParser, ToolDefinition};

use super::read_input;
use crate::console::CliConsole;

pub fn run(config: &LoomConfig, input: &Path, tools: &Path) -> Result<()> {
    let catalog = std::fs::read_to_string(tools)
        .with_context(|| format!("Failed to read tool catalog {}", tools.display()))?;
    let catalog: Vec<ToolDefinition> =
        serde_json::from_str(&catalog).context("Tool catalog must be a JSON array of tools")?;
    let raw = read_input(input)?;

    let mut parser = ToolCallParser::new(catalog).with_max_mistakes(config.parser.max_mistakes);
    match parser.parse_response(&raw) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(err) => {
            let console = CliConsole::new(true);
            console.error(&format!("{} ({})", err, err.kind().code()));
            println!("{}", err.corrective_message());
            bail!("model output violates the tool-call protocol")
        }
    }
}
