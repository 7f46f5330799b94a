//! CLI command implementations.
//!
//! Handlers return the exit code for outcomes that still produced output
//! (a fallback, a blocked prompt) and an error for everything else.

mod cases;
mod config;
mod generate;
mod json_emit;

pub use cases::execute_cases_command;
pub use config::execute_config_command;
pub use generate::{exit_code_for, execute_generate_command};
