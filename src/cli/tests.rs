//! CLI tests module
//!
//! Argument parsing and exit-code mapping.

use std::sync::Arc;

use clap::Parser;
use serde_json::json;

use blackbox_llm::test_support::{ScriptedFactory, ScriptedReply};
use blackbox_llm::{GenerationOrchestrator, GenerationRequest, ModelTierRegistry};

use super::*;
use crate::ExitCode;

#[test]
fn test_parse_generate_with_globals() {
    let cli = Cli::try_parse_from([
        "blackbox",
        "generate",
        "Challenge me",
        "--fallback",
        "later",
        "--json",
        "--verbose",
        "--attempt-timeout",
        "15",
    ])
    .unwrap();

    assert!(cli.verbose);
    assert_eq!(cli.attempt_timeout, Some(15));
    match cli.command {
        Commands::Generate {
            prompt,
            fallback,
            json,
        } => {
            assert_eq!(prompt, "Challenge me");
            assert_eq!(fallback.as_deref(), Some("later"));
            assert!(json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_rejects_unknown_log_format() {
    let err = Cli::try_parse_from(["blackbox", "--log-format", "yaml", "config"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
}

#[test]
fn test_generate_requires_prompt() {
    assert!(Cli::try_parse_from(["blackbox", "generate"]).is_err());
}

#[test]
fn test_build_cli_is_consistent() {
    build_cli().debug_assert();
}

async fn result_for(reply: ScriptedReply) -> blackbox_llm::GenerationResult {
    let factory = ScriptedFactory::new()
        .with_reply("gemini-1.5-pro-latest", reply)
        .with_quota("gemini-1.5-flash-latest")
        .with_quota("gemini-1.5-flash-8b");
    let orchestrator = GenerationOrchestrator::new(ModelTierRegistry::default(), Arc::new(factory));
    orchestrator.initialize(Some("test-key")).unwrap();
    orchestrator
        .generate(&GenerationRequest::new("prompt").unwrap())
        .await
}

#[tokio::test]
async fn test_exit_code_for_outcomes() {
    let success = result_for(ScriptedReply::text("fine")).await;
    assert_eq!(exit_code_for(&success), ExitCode::SUCCESS);

    let blocked = result_for(ScriptedReply::Json(
        json!({"promptFeedback": {"blockReason": "SAFETY"}}),
    ))
    .await;
    assert_eq!(exit_code_for(&blocked), ExitCode::CONTENT_BLOCKED);

    let exhausted = result_for(ScriptedReply::quota()).await;
    assert_eq!(exit_code_for(&exhausted), ExitCode::GENERATION_FAILURE);
}

#[tokio::test]
async fn test_exit_code_for_uninitialized_orchestrator() {
    let orchestrator =
        GenerationOrchestrator::new(ModelTierRegistry::default(), Arc::new(ScriptedFactory::new()));

    let result = orchestrator
        .generate(&GenerationRequest::new("prompt").unwrap())
        .await;

    assert_eq!(exit_code_for(&result), ExitCode::CLI_ARGS);
}
