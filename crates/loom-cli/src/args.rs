//! CLI argument definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use loom_core::config::LogFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "loom")]
#[command(about = "Loom - context window, usage and tool-call inspection for LLM assistants")]
#[command(
    long_about = r#"Loom - context window, usage and tool-call inspection for LLM assistants

USAGE:
  loom estimate notes.md               # Estimate tokens of a file
  loom window claude-sonnet-4 -t 150000  # Window sizes and truncation strategy
  loom parse reply.txt --tools tools.json  # Parse tool calls out of model output
  loom usage ~/.local/share/loom/usage.json  # Usage and cost statistics
  loom config init                     # Create a config file"#
)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "LOOM_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate the token count of a file or stdin
    Estimate {
        /// File to read, or `-` for stdin
        input: PathBuf,
    },

    /// Show context window sizes for a model
    Window {
        /// Model id, e.g. claude-sonnet-4-20250514
        model: String,

        /// Current conversation size to evaluate
        #[arg(long, short)]
        tokens: Option<usize>,

        /// conservative, moderate or aggressive
        #[arg(long, short)]
        aggressiveness: Option<String>,
    },

    /// Parse tool calls out of a model response
    Parse {
        /// File holding the raw model output, or `-` for stdin
        input: PathBuf,

        /// JSON file with the tool catalog
        #[arg(long)]
        tools: PathBuf,
    },

    /// Show usage and cost statistics from a usage store
    Usage {
        /// Usage store file (defaults to the configured store)
        store: Option<PathBuf>,

        /// Show statistics for one session
        #[arg(long)]
        session: Option<String>,

        /// Remove records older than the retention period first
        #[arg(long)]
        cleanup: bool,
    },

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Display the effective configuration
    Show,

    /// Create a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_command() {
        let cli = Cli::try_parse_from(["loom", "window", "gpt-4o", "--tokens", "90000", "-a", "aggressive"])
            .unwrap();
        match cli.command {
            Commands::Window {
                model,
                tokens,
                aggressiveness,
            } => {
                assert_eq!(model, "gpt-4o");
                assert_eq!(tokens, Some(90000));
                assert_eq!(aggressiveness.as_deref(), Some("aggressive"));
            }
            _ => panic!("expected window command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["loom", "config", "show", "--verbose", "--log-format", "json"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.log_format, Some(LogFormatArg::Json)));
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
