//! One user's session: narrative state, case content and generation.
//!
//! The coordinator is what a presentation layer talks to. It loads case
//! content, drives the [`NarrativeStateMachine`] and stores generated text in
//! the session context so it survives re-rendering.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use blackbox_llm::{CancellationFlag, GenerationOrchestrator, GenerationResult};
use blackbox_narrative::{
    CaseContent, ContentProvider, NarrativeError, NarrativeStateMachine, StateSummary,
    TransitionCue, ViewKind, keys, transition_cue,
};
use blackbox_utils::error::BlackboxError;

use crate::prompts::{self, Prompt};

pub struct SessionCoordinator {
    machine: NarrativeStateMachine,
    content: Arc<dyn ContentProvider>,
    orchestrator: Arc<GenerationOrchestrator>,
    case: Option<CaseContent>,
}

impl SessionCoordinator {
    /// The orchestrator may be shared across sessions.
    #[must_use]
    pub fn new(content: Arc<dyn ContentProvider>, orchestrator: Arc<GenerationOrchestrator>) -> Self {
        Self {
            machine: NarrativeStateMachine::new(),
            content,
            orchestrator,
            case: None,
        }
    }

    /// Load `case_id` and open it at act 1.
    ///
    /// # Errors
    ///
    /// `UnknownCase` if the provider has no such case, `InvalidCase` if its
    /// content cannot be opened. The session is unchanged on error.
    pub fn start_case(&mut self, case_id: &str) -> Result<&CaseContent, NarrativeError> {
        let content = self.content.load_case(case_id)?;
        self.machine.select_case(&content.case_id, content.total_acts)?;
        Ok(&*self.case.insert(content))
    }

    /// Advance one act, returning the interstitial to show, if any.
    ///
    /// # Errors
    ///
    /// `NotInActView` without a case, `Boundary` at the last act.
    pub fn next_act(&mut self) -> Result<Option<TransitionCue>, NarrativeError> {
        let total = self.total_acts("advance_act")?;
        let from = self.machine.act();
        self.machine.advance_act(total)?;
        self.machine.hide_modal();
        Ok(transition_cue(from, self.machine.act()))
    }

    /// # Errors
    ///
    /// `NotInActView` without a case, `Boundary` at act 1.
    pub fn previous_act(&mut self) -> Result<(), NarrativeError> {
        self.machine.previous_act()?;
        self.machine.hide_modal();
        Ok(())
    }

    pub fn back_to_selection(&mut self) {
        self.machine.reset_to_selection();
        self.case = None;
    }

    /// Store a user answer under `key`.
    ///
    /// # Errors
    ///
    /// `NotInActView` without a case, `Boundary` for a blank key.
    pub fn record_answer(&mut self, key: &str, value: Value) -> Result<(), NarrativeError> {
        self.machine.update_context(key, value)
    }

    /// Store an answer for the current sub-stage and move to the next one.
    ///
    /// # Errors
    ///
    /// As [`SessionCoordinator::record_answer`], or `Boundary` if the
    /// sub-stage counter is exhausted (the answer is then not stored).
    pub fn answer_current_stage(&mut self, value: Value) -> Result<String, NarrativeError> {
        if self.machine.sub_stage() == u32::MAX {
            return Err(NarrativeError::Boundary {
                operation: "advance_sub_stage",
                detail: "sub-stage counter is exhausted".to_string(),
            });
        }
        let key = keys::answer(self.machine.act(), self.machine.sub_stage());
        self.machine.update_context(&key, value)?;
        self.machine.advance_sub_stage()?;
        Ok(key)
    }

    /// Generate the act-1 challenge and store it under `act1_challenge`.
    ///
    /// Generation failures are not errors: the stored text is then the
    /// challenge fallback.
    ///
    /// # Errors
    ///
    /// `NotInActView` without a case.
    pub async fn generate_challenge(&mut self) -> Result<GenerationResult, BlackboxError> {
        self.generate_challenge_with_cancel(&CancellationFlag::new()).await
    }

    /// [`SessionCoordinator::generate_challenge`] with caller-controlled cancellation.
    ///
    /// # Errors
    ///
    /// `NotInActView` without a case.
    pub async fn generate_challenge_with_cancel(
        &mut self,
        cancel: &CancellationFlag,
    ) -> Result<GenerationResult, BlackboxError> {
        self.require_case("generate_challenge")?;
        let prompt = prompts::challenge_question(self.machine.context());
        let result = self.run(prompt, cancel).await?;
        self.machine
            .update_context(keys::ACT1_CHALLENGE, Value::from(result.display_text()))?;
        self.machine.show_modal();
        Ok(result)
    }

    /// Generate the personal decision tool, store it under `personal_tool`
    /// and unlock the tool.
    ///
    /// # Errors
    ///
    /// `NotInActView` without a case.
    pub async fn generate_tool(&mut self) -> Result<GenerationResult, BlackboxError> {
        self.require_case("generate_tool")?;
        let prompt = prompts::personalized_tool(self.machine.context());
        let result = self.run(prompt, &CancellationFlag::new()).await?;
        self.machine
            .update_context(keys::PERSONAL_TOOL, Value::from(result.display_text()))?;
        self.machine.unlock_tool()?;
        Ok(result)
    }

    async fn run(
        &self,
        prompt: Prompt,
        cancel: &CancellationFlag,
    ) -> Result<GenerationResult, BlackboxError> {
        let request = self.orchestrator.request(prompt.text)?.with_fallback(prompt.fallback);
        let result = self.orchestrator.generate_with_cancel(&request, cancel).await;
        info!(
            case_id = self.machine.case_id().unwrap_or("-"),
            act = self.machine.act(),
            success = result.is_success(),
            "Generation finished"
        );
        Ok(result)
    }

    fn require_case(&self, operation: &'static str) -> Result<(), NarrativeError> {
        if self.machine.view() == ViewKind::ActView {
            Ok(())
        } else {
            debug!(operation, "No case open");
            Err(NarrativeError::NotInActView { operation })
        }
    }

    fn total_acts(&self, operation: &'static str) -> Result<u32, NarrativeError> {
        self.require_case(operation)?;
        self.case
            .as_ref()
            .map(|case| case.total_acts)
            .or(self.machine.total_acts())
            .ok_or(NarrativeError::NotInActView { operation })
    }

    pub fn toggle_debug(&mut self) -> bool {
        self.machine.toggle_debug()
    }

    pub fn hide_modal(&mut self) {
        self.machine.hide_modal();
    }

    #[must_use]
    pub fn machine(&self) -> &NarrativeStateMachine {
        &self.machine
    }

    #[must_use]
    pub fn case(&self) -> Option<&CaseContent> {
        self.case.as_ref()
    }

    /// Text of the current act, if the case provides one.
    #[must_use]
    pub fn current_text(&self) -> Option<&str> {
        self.case.as_ref()?.text_for(self.machine.act())
    }

    #[must_use]
    pub fn current_options(&self) -> &[String] {
        self.case
            .as_ref()
            .map(|case| case.options_for(self.machine.act()))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn available_cases(&self) -> Vec<String> {
        self.content.case_ids()
    }

    #[must_use]
    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn summary(&self) -> StateSummary {
        self.machine.summary()
    }
}
