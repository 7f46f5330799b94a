//! CLI argument definitions and parsing structures

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// blackbox - operator tooling for decision-failure narratives
#[derive(Parser, Debug)]
#[command(name = "blackbox")]
#[command(about = "Inspect configuration and exercise the generation cascade")]
#[command(long_about = r#"
blackbox drives interactive case studies of famous decision failures. The
operator commands here inspect the effective configuration and push single
prompts through the model tier cascade.

EXAMPLES:
  # Show effective configuration and where each value came from
  blackbox config

  # Same, as JSON
  blackbox config --json

  # Generate text, falling back to a fixed message if every tier fails
  blackbox generate "Summarise the Madoff case in one line" --fallback "No summary"

  # List the built-in cases
  blackbox cases

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  The config file is discovered by searching upward from CWD for .blackbox/config.toml
  Use --config or BLACKBOX_CONFIG to name an explicit file
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Environment variable holding the API key
    #[arg(long, global = true)]
    pub credential_env: Option<String>,

    /// Per-attempt timeout in seconds
    #[arg(long, global = true)]
    pub attempt_timeout: Option<u64>,

    /// Text shown when generation fails and the request names no fallback
    #[arg(long, global = true)]
    pub default_fallback: Option<String>,

    /// Log format: compact or json
    #[arg(long, global = true, value_parser = ["compact", "json"])]
    pub log_format: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show effective configuration with source attribution
    ///
    /// EXAMPLES:
    ///   blackbox config
    ///   blackbox --config ./ci.toml config --json
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one prompt through the model tier cascade
    ///
    /// Always prints displayable text: the generated text on success, the
    /// fallback otherwise. The exit code tells the two apart.
    ///
    /// EXAMPLES:
    ///   blackbox generate "Challenge my decision to invest"
    ///   blackbox generate "..." --fallback "Try again later" --json
    Generate {
        /// Prompt text
        prompt: String,

        /// Text to show if no tier produces text
        #[arg(long)]
        fallback: Option<String>,

        /// Output the full result, including diagnostics, as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the built-in cases
    Cases {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Build the clap command for documentation and completion generation.
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
