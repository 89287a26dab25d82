//! Configuration management commands

use std::path::Path;

use anyhow::{Context, Result, bail};
use loom_core::LoomConfig;
use loom_core::config::{default_config_path, render_config};

use crate::args::ConfigAction;
use crate::console::CliConsole;

pub async fn run(action: ConfigAction, config: &LoomConfig, path: Option<&Path>) -> Result<()> {
    let default_path = default_config_path();
    let path = path.unwrap_or(&default_path);
    match action {
        ConfigAction::Show => show(config, path),
        ConfigAction::Init { force } => init(path, force).await,
    }
}

/// Print the effective configuration in the file's own format
fn show(config: &LoomConfig, path: &Path) -> Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration");
    if path.exists() {
        console.success(&format!("Loaded configuration from: {}", path.display()));
    } else {
        console.warn(&format!("Configuration file not found: {}", path.display()));
        console.info("Using default configuration with environment overrides");
    }

    println!();
    println!("{}", render_config(config, path)?);
    Ok(())
}

async fn init(path: &Path, force: bool) -> Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration Initialization");

    if path.exists() && !force {
        console.info("Use --force to overwrite");
        bail!("Configuration file already exists: {}", path.display());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = render_config(&LoomConfig::default(), path)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    console.success(&format!("Created configuration file: {}", path.display()));
    Ok(())
}
