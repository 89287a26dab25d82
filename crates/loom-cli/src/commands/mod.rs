//! Subcommand handlers

pub mod config;
pub mod estimate;
pub mod parse;
pub mod usage;
pub mod window;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a file, or stdin when the path is `-`
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
