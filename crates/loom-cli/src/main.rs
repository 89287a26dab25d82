//! Loom CLI
//!
//! Inspection commands around the loom-core library: token estimates,
//! context window policy, tool-call parsing and usage statistics.

mod args;
mod commands;
mod console;
mod logging;

use anyhow::Result;
use clap::Parser;
use loom_core::LoomConfig;

use args::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        console::CliConsole::new(true).error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = LoomConfig::load(cli.config_file.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    logging::init(&config.logging, cli.verbose);
    tracing::debug!(
        config_file = ?cli.config_file,
        aggressiveness = %config.context.aggressiveness,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Estimate { input } => commands::estimate::run(&input),
        Commands::Window {
            model,
            tokens,
            aggressiveness,
        } => commands::window::run(&config, &model, tokens, aggressiveness.as_deref()),
        Commands::Parse { input, tools } => commands::parse::run(&config, &input, &tools),
        Commands::Usage {
            store,
            session,
            cleanup,
        } => commands::usage::run(&config, store, session.as_deref(), cleanup),
        Commands::Config { action } => {
            commands::config::run(action, &config, cli.config_file.as_deref()).await
        }
    }
}
