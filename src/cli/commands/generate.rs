use anyhow::Result;
use tracing::debug;

use blackbox_llm::{
    CancellationFlag, Credential, ErrorKind, GenerationOrchestrator, GenerationResult,
};
use blackbox_utils::error::BlackboxError;

use super::json_emit::emit_json;
use crate::{Config, ExitCode};

/// Exit code for a finished generation call.
#[must_use]
pub fn exit_code_for(result: &GenerationResult) -> ExitCode {
    match result.error_kind() {
        None => ExitCode::SUCCESS,
        Some(ErrorKind::SafetyBlocked(_)) => ExitCode::CONTENT_BLOCKED,
        Some(ErrorKind::Auth) => ExitCode::CLI_ARGS,
        Some(ErrorKind::Transport | ErrorKind::AllTiersExhausted | ErrorKind::Cancelled) => {
            ExitCode::GENERATION_FAILURE
        }
    }
}

/// Run one prompt through the cascade and print displayable text.
///
/// Ctrl-C cancels between tier attempts.
pub async fn execute_generate_command(
    config: &Config,
    prompt: &str,
    fallback: Option<&str>,
    json: bool,
) -> Result<ExitCode> {
    let orchestrator = GenerationOrchestrator::from_config(config).map_err(BlackboxError::from)?;
    let credential =
        Credential::from_env(&config.generation.credential_env).map_err(BlackboxError::from)?;
    let ready = orchestrator
        .initialize(Some(credential.expose()))
        .map_err(BlackboxError::from)?;
    debug!(active_tier = %ready.active_tier, skipped = ?ready.skipped, "Generation ready");

    let mut request = orchestrator.request(prompt).map_err(BlackboxError::from)?;
    if let Some(fallback) = fallback {
        request = request.with_fallback(fallback);
    }

    let cancel = CancellationFlag::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let result = orchestrator.generate_with_cancel(&request, &cancel).await;
    watcher.abort();

    if json {
        println!("{}", emit_json(&result, "generation")?);
    } else {
        println!("{}", result.display_text());
        if let Some(kind) = result.error_kind() {
            eprintln!("✗ Generation failed ({kind}); the text above is the fallback");
        }
    }
    Ok(exit_code_for(&result))
}
