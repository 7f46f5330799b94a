//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration, installs logging,
//! creates the tokio runtime and dispatches to the command handlers. It owns
//! all error output.

use anyhow::Result;
use clap::Parser;

use blackbox_utils::error::BlackboxError;
use blackbox_utils::logging::{LogFormat, init_tracing};

use super::args::{Cli, Commands};
use super::commands;
use crate::{CliArgs, Config, ExitCode};

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` for any non-zero outcome after printing whatever
/// the user needs to see. main.rs only maps the code to the process exit.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        credential_env: cli.credential_env.clone(),
        attempt_timeout_secs: cli.attempt_timeout,
        default_fallback: cli.default_fallback.clone(),
        verbose: cli.verbose.then_some(true),
        log_format: cli.log_format.clone(),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = BlackboxError::from(err);
            eprintln!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    let format = match config.logging.format.as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Compact,
    };
    if let Err(e) = init_tracing(config.logging.verbose, format) {
        eprintln!("✗ Failed to initialize logging: {e}");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Config { json } => commands::execute_config_command(&config, json),
            Commands::Generate {
                prompt,
                fallback,
                json,
            } => commands::execute_generate_command(&config, &prompt, fallback.as_deref(), json).await,
            Commands::Cases { json } => commands::execute_cases_command(json),
        }
    });

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(error) => {
            if let Some(blackbox_error) = error.downcast_ref::<BlackboxError>() {
                eprintln!("{}", blackbox_error.display_for_user());
                Err(blackbox_error.to_exit_code())
            } else {
                let redacted = blackbox_error_redaction::redact_error_message(&error.to_string());
                eprintln!("✗ Unexpected error: {redacted}");
                eprintln!("\n  Run with --verbose for more detailed output");
                Err(ExitCode::INTERNAL)
            }
        }
    }
}
