use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use super::json_emit::emit_json;
use crate::{Config, ExitCode};

#[derive(Serialize)]
struct Setting {
    value: String,
    source: String,
}

#[derive(Serialize)]
struct ConfigOutput {
    config_path: Option<String>,
    settings: BTreeMap<String, Setting>,
}

/// Print the effective configuration and where each value came from.
pub fn execute_config_command(config: &Config, json: bool) -> Result<ExitCode> {
    let effective = config.effective_config();

    if json {
        let output = ConfigOutput {
            config_path: config.config_path.as_ref().map(ToString::to_string),
            settings: effective
                .into_iter()
                .map(|(key, (value, source))| (key, Setting { value, source }))
                .collect(),
        };
        println!("{}", emit_json(&output, "config")?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Effective configuration:");
    match &config.config_path {
        Some(path) => println!("  (loaded from {path})"),
        None => println!("  (no config file found; using defaults)"),
    }
    println!();
    let width = effective.keys().map(String::len).max().unwrap_or(0);
    for (key, (value, source)) in &effective {
        println!("  {key:<width$} = {value} [{source}]");
    }
    Ok(ExitCode::SUCCESS)
}
