//! JSON emit helpers for CLI output

use anyhow::{Context, Result};
use serde::Serialize;

/// Pretty-printed JSON, keys in declaration order.
pub fn emit_json<T: Serialize>(output: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(output).with_context(|| format!("Failed to emit {what} JSON"))
}
