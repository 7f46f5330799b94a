//! Session coordinator scenarios with scripted generation backends.

use std::sync::Arc;

use serde_json::json;

use blackbox::prompts::{CHALLENGE_FALLBACK, TOOL_FALLBACK};
use blackbox::{BlackboxError, NarrativeError, SessionCoordinator};
use blackbox_llm::test_support::{ScriptedFactory, ScriptedReply};
use blackbox_llm::{ErrorKind, GenerationOrchestrator, ModelTierRegistry};
use blackbox_narrative::{InMemoryContentProvider, ViewKind, keys};

const PRO: &str = "gemini-1.5-pro-latest";
const FLASH: &str = "gemini-1.5-flash-latest";
const FLASH_8B: &str = "gemini-1.5-flash-8b";

fn session_with(factory: ScriptedFactory) -> (SessionCoordinator, Arc<ScriptedFactory>) {
    let factory = Arc::new(factory);
    let orchestrator = GenerationOrchestrator::new(ModelTierRegistry::default(), factory.clone());
    orchestrator.initialize(Some("test-key")).unwrap();
    let session = SessionCoordinator::new(
        Arc::new(InMemoryContentProvider::builtin().unwrap()),
        Arc::new(orchestrator),
    );
    (session, factory)
}

#[test]
fn walk_lehman_to_the_last_act() {
    // Setup
    let (mut session, _) = session_with(ScriptedFactory::new());
    session.start_case("lehman").unwrap();

    // Execute
    let cues: Vec<_> = (0..3).map(|_| session.next_act().unwrap()).collect();
    let overflow = session.next_act();

    // Verify
    assert_eq!(session.machine().act(), 4);
    assert!(cues.iter().all(Option::is_some));
    assert_eq!(
        cues[2].as_ref().map(|cue| cue.subtitle),
        Some("Act Four: Armed with Wisdom")
    );
    assert!(matches!(overflow, Err(NarrativeError::Boundary { .. })));
    assert!(session.current_text().is_some());
}

#[test]
fn unknown_case_leaves_session_on_selection() {
    let (mut session, _) = session_with(ScriptedFactory::new());

    let err = session.start_case("enron").unwrap_err();

    assert_eq!(err, NarrativeError::UnknownCase("enron".to_string()));
    assert_eq!(session.machine().view(), ViewKind::Selection);
    assert!(session.case().is_none());
}

#[test]
fn answers_are_keyed_by_act_and_stage() {
    let (mut session, _) = session_with(ScriptedFactory::new());
    session.start_case("ltcm").unwrap();

    let first = session.answer_current_stage(json!("Trust the model")).unwrap();
    let second = session.answer_current_stage(json!("Size down")).unwrap();
    session.next_act().unwrap();
    let third = session.answer_current_stage(json!(42)).unwrap();

    assert_eq!(first, "act1_stage0_answer");
    assert_eq!(second, "act1_stage1_answer");
    assert_eq!(third, "act2_stage0_answer");
    assert_eq!(session.machine().sub_stage(), 1);
    assert_eq!(
        session.machine().get_context(&second),
        Some(&json!("Size down"))
    );
}

#[tokio::test]
async fn challenge_falls_back_when_premium_is_out_of_quota() {
    // Setup
    let (mut session, factory) = session_with(
        ScriptedFactory::new()
            .with_quota(PRO)
            .with_text(FLASH, "Would you still invest without the name on the door?")
            .with_text(FLASH_8B, "unused"),
    );
    session.start_case("madoff").unwrap();
    session
        .record_answer(keys::ACT1_CHOICE, json!("Invest immediately"))
        .unwrap();

    // Execute
    let result = session.generate_challenge().await.unwrap();

    // Verify
    assert_eq!(result.tier(), Some(FLASH));
    assert_eq!(factory.calls(), vec![PRO.to_string(), FLASH.to_string()]);
    assert_eq!(
        session.machine().get_context(keys::ACT1_CHALLENGE),
        Some(&json!("Would you still invest without the name on the door?"))
    );
    assert!(session.machine().is_modal_visible());
}

#[tokio::test]
async fn exhausted_cascade_stores_challenge_fallback() {
    let (mut session, _) = session_with(
        ScriptedFactory::new()
            .with_quota(PRO)
            .with_quota(FLASH)
            .with_quota(FLASH_8B),
    );
    session.start_case("madoff").unwrap();

    let result = session.generate_challenge().await.unwrap();

    assert_eq!(result.error_kind(), Some(&ErrorKind::AllTiersExhausted));
    assert_eq!(result.display_text(), CHALLENGE_FALLBACK);
    assert_eq!(
        session.machine().get_context(keys::ACT1_CHALLENGE),
        Some(&json!(CHALLENGE_FALLBACK))
    );
}

#[tokio::test]
async fn tool_generation_unlocks_tool_even_on_block() {
    let (mut session, factory) = session_with(ScriptedFactory::new().with_reply(
        PRO,
        ScriptedReply::Json(json!({"promptFeedback": {"blockReason": "SAFETY"}})),
    ));
    session.start_case("lehman").unwrap();
    session.record_answer(keys::USER_NAME, json!("Ada")).unwrap();

    let result = session.generate_tool().await.unwrap();

    assert!(matches!(result.error_kind(), Some(ErrorKind::SafetyBlocked(_))));
    assert_eq!(factory.calls().len(), 1);
    assert!(session.machine().is_tool_unlocked());
    assert_eq!(
        session.machine().get_context(keys::PERSONAL_TOOL),
        Some(&json!(TOOL_FALLBACK))
    );
}

#[tokio::test]
async fn generation_requires_an_open_case() {
    let (mut session, factory) = session_with(ScriptedFactory::new().with_text(PRO, "unused"));

    let err = session.generate_tool().await.unwrap_err();

    assert!(matches!(
        err,
        BlackboxError::Narrative(NarrativeError::NotInActView {
            operation: "generate_tool"
        })
    ));
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn back_to_selection_discards_generated_text() {
    let (mut session, _) = session_with(ScriptedFactory::new().with_text(PRO, "Your tool"));
    session.start_case("ltcm").unwrap();
    session.generate_tool().await.unwrap();
    assert!(session.toggle_debug());

    session.back_to_selection();

    assert!(session.machine().context().is_empty());
    assert!(!session.machine().is_tool_unlocked());
    assert!(session.machine().is_debug());
    assert!(session.current_options().is_empty());
    assert_eq!(session.available_cases(), vec!["lehman", "ltcm", "madoff"]);
}
