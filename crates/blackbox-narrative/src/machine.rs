use serde_json::Value;
use tracing::{debug, info, warn};

use blackbox_utils::error::NarrativeError;
use blackbox_utils::logging::transition_span;

use crate::context::{SessionContext, keys};
use crate::state::{NarrativeState, StateSummary, ViewKind};

/// Owns the narrative position and the session context.
///
/// Transitions check every precondition first and only then mutate, so an
/// `Err` always leaves the machine untouched.
#[derive(Debug, Clone, Default)]
pub struct NarrativeStateMachine {
    state: NarrativeState,
    context: SessionContext,
    total_acts: Option<u32>,
}

impl NarrativeStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn rejected<T>(&self, error: NarrativeError) -> Result<T, NarrativeError> {
        warn!(
            case_id = self.state.case_id.as_deref().unwrap_or("-"),
            act = self.state.act,
            sub_stage = self.state.sub_stage,
            error = %error,
            "Transition rejected"
        );
        Err(error)
    }

    fn require_act_view(&self, operation: &'static str) -> Result<(), NarrativeError> {
        if self.state.view == ViewKind::ActView {
            Ok(())
        } else {
            self.rejected(NarrativeError::NotInActView { operation })
        }
    }

    /// Open `case_id` at act 1 with a fresh context.
    ///
    /// # Errors
    ///
    /// `InvalidCase` for a blank id or `total_acts == 0`.
    pub fn select_case(&mut self, case_id: &str, total_acts: u32) -> Result<(), NarrativeError> {
        let _span = transition_span("select_case", Some(case_id)).entered();
        if case_id.trim().is_empty() {
            return self.rejected(NarrativeError::InvalidCase {
                case_id: case_id.to_string(),
                reason: "case id must not be blank".to_string(),
            });
        }
        if total_acts == 0 {
            return self.rejected(NarrativeError::InvalidCase {
                case_id: case_id.to_string(),
                reason: "a case needs at least one act".to_string(),
            });
        }

        self.state.view = ViewKind::ActView;
        self.state.case_id = Some(case_id.to_string());
        self.state.act = 1;
        self.state.sub_stage = 0;
        self.context = SessionContext::seeded(case_id);
        self.total_acts = Some(total_acts);
        info!(case_id, total_acts, "Case selected");
        Ok(())
    }

    /// Move to the next act.
    ///
    /// The last act is the smaller of `total_acts` and the count given to
    /// [`NarrativeStateMachine::select_case`].
    ///
    /// # Errors
    ///
    /// `NotInActView` on the selection screen, `Boundary` at the last act.
    pub fn advance_act(&mut self, total_acts: u32) -> Result<(), NarrativeError> {
        let _span = transition_span("advance_act", self.state.case_id.as_deref()).entered();
        self.require_act_view("advance_act")?;
        let last = self
            .total_acts
            .map_or(total_acts, |selected| selected.min(total_acts));
        if self.state.act >= last {
            return self.rejected(NarrativeError::Boundary {
                operation: "advance_act",
                detail: format!("already at the last act ({} of {last})", self.state.act),
            });
        }

        self.state.act += 1;
        self.state.sub_stage = 0;
        info!(act = self.state.act, total_acts = last, "Advanced to next act");
        Ok(())
    }

    /// Move to the previous act.
    ///
    /// # Errors
    ///
    /// `NotInActView` on the selection screen, `Boundary` at act 1.
    pub fn previous_act(&mut self) -> Result<(), NarrativeError> {
        let _span = transition_span("previous_act", self.state.case_id.as_deref()).entered();
        self.require_act_view("previous_act")?;
        if self.state.act <= 1 {
            return self.rejected(NarrativeError::Boundary {
                operation: "previous_act",
                detail: "already at the first act".to_string(),
            });
        }

        self.state.act -= 1;
        self.state.sub_stage = 0;
        info!(act = self.state.act, "Returned to previous act");
        Ok(())
    }

    /// # Errors
    ///
    /// `Boundary` for a negative stage or one beyond `u32::MAX`.
    pub fn set_sub_stage(&mut self, stage: i64) -> Result<(), NarrativeError> {
        let Ok(stage) = u32::try_from(stage) else {
            return self.rejected(NarrativeError::Boundary {
                operation: "set_sub_stage",
                detail: format!("sub-stage {stage} is out of range"),
            });
        };
        self.state.sub_stage = stage;
        debug!(sub_stage = stage, "Sub-stage set");
        Ok(())
    }

    /// # Errors
    ///
    /// `Boundary` if the counter would overflow.
    pub fn advance_sub_stage(&mut self) -> Result<(), NarrativeError> {
        let Some(next) = self.state.sub_stage.checked_add(1) else {
            return self.rejected(NarrativeError::Boundary {
                operation: "advance_sub_stage",
                detail: "sub-stage counter is exhausted".to_string(),
            });
        };
        self.state.sub_stage = next;
        debug!(sub_stage = next, "Sub-stage advanced");
        Ok(())
    }

    /// Back to the selection screen; UI flags survive, the context does not.
    pub fn reset_to_selection(&mut self) {
        let _span = transition_span("reset_to_selection", self.state.case_id.as_deref()).entered();
        let flags = self.state.flags;
        self.state = NarrativeState {
            flags,
            ..NarrativeState::default()
        };
        self.context = SessionContext::new();
        self.total_acts = None;
        info!("Returned to case selection");
    }

    /// Record `value` under `key` in the current case's context.
    ///
    /// # Errors
    ///
    /// `NotInActView` on the selection screen, `Boundary` for a blank key.
    pub fn update_context(&mut self, key: &str, value: Value) -> Result<(), NarrativeError> {
        self.require_act_view("update_context")?;
        if key.trim().is_empty() {
            return self.rejected(NarrativeError::Boundary {
                operation: "update_context",
                detail: "context keys must not be blank".to_string(),
            });
        }
        debug!(key, "Context updated");
        self.context.insert(key, value);
        Ok(())
    }

    /// Mark the personal tool as unlocked for this case run.
    ///
    /// # Errors
    ///
    /// `NotInActView` on the selection screen.
    pub fn unlock_tool(&mut self) -> Result<(), NarrativeError> {
        self.update_context(keys::TOOL_UNLOCKED, Value::Bool(true))
    }

    /// Flip the debug panel, returning the new value.
    pub fn toggle_debug(&mut self) -> bool {
        self.set_debug(!self.state.flags.debug_visible);
        self.state.flags.debug_visible
    }

    pub fn set_debug(&mut self, visible: bool) {
        self.state.flags.debug_visible = visible;
        info!(debug_visible = visible, "Debug panel toggled");
    }

    pub fn show_modal(&mut self) {
        self.state.flags.modal_visible = true;
    }

    pub fn hide_modal(&mut self) {
        self.state.flags.modal_visible = false;
    }

    #[must_use]
    pub fn state(&self) -> &NarrativeState {
        &self.state
    }

    #[must_use]
    pub fn view(&self) -> ViewKind {
        self.state.view
    }

    #[must_use]
    pub fn case_id(&self) -> Option<&str> {
        self.state.case_id.as_deref()
    }

    #[must_use]
    pub fn act(&self) -> u32 {
        self.state.act
    }

    #[must_use]
    pub fn sub_stage(&self) -> u32 {
        self.state.sub_stage
    }

    /// Act count given when the current case was selected.
    #[must_use]
    pub fn total_acts(&self) -> Option<u32> {
        self.total_acts
    }

    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Owned copy of the context, safe to hand to prompt builders.
    #[must_use]
    pub fn context_snapshot(&self) -> SessionContext {
        self.context.clone()
    }

    #[must_use]
    pub fn get_context(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    #[must_use]
    pub fn get_context_or(&self, key: &str, default: Value) -> Value {
        self.context.get_or(key, default)
    }

    #[must_use]
    pub fn is_tool_unlocked(&self) -> bool {
        self.context
            .get(keys::TOOL_UNLOCKED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.state.flags.debug_visible
    }

    #[must_use]
    pub fn is_modal_visible(&self) -> bool {
        self.state.flags.modal_visible
    }

    #[must_use]
    pub fn summary(&self) -> StateSummary {
        StateSummary {
            view: self.state.view,
            case_id: self.state.case_id.clone(),
            act: self.state.act,
            total_acts: self.total_acts,
            sub_stage: self.state.sub_stage,
            context_keys: self.context.keys().map(str::to_string).collect(),
            tool_unlocked: self.is_tool_unlocked(),
            debug_visible: self.state.flags.debug_visible,
            modal_visible: self.state.flags.modal_visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_machine_starts_at_selection() {
        let machine = NarrativeStateMachine::new();
        assert_eq!(machine.view(), ViewKind::Selection);
        assert_eq!(machine.case_id(), None);
        assert_eq!(machine.act(), 1);
        assert_eq!(machine.sub_stage(), 0);
        assert!(machine.context().is_empty());
    }

    #[test]
    fn test_select_case_seeds_fresh_context() {
        // Arrange
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("madoff", 4).unwrap();
        machine.update_context("user_name", json!("Ada")).unwrap();
        machine.advance_act(4).unwrap();

        // Act
        machine.select_case("ltcm", 4).unwrap();

        // Assert
        assert_eq!(machine.case_id(), Some("ltcm"));
        assert_eq!(machine.act(), 1);
        assert_eq!(machine.context().len(), 1);
        assert_eq!(machine.get_context("case_id"), Some(&json!("ltcm")));
        assert_eq!(machine.get_context("user_name"), None);
    }

    #[test]
    fn test_select_case_rejects_invalid_input() {
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("lehman", 4).unwrap();
        let before = machine.clone();

        let err = machine.select_case("  ", 4).unwrap_err();
        assert!(matches!(err, NarrativeError::InvalidCase { .. }));
        let err = machine.select_case("enron", 0).unwrap_err();
        assert!(matches!(err, NarrativeError::InvalidCase { .. }));

        assert_eq!(machine.state(), before.state());
        assert_eq!(machine.context(), before.context());
    }

    #[test]
    fn test_lehman_walkthrough_stops_at_last_act() {
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("lehman", 4).unwrap();
        for _ in 0..3 {
            machine.advance_act(4).unwrap();
        }
        assert_eq!(machine.act(), 4);

        let err = machine.advance_act(4).unwrap_err();

        assert!(err.is_boundary());
        assert_eq!(machine.act(), 4);
    }

    #[test]
    fn test_advance_act_respects_selected_case_total() {
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("lehman", 4).unwrap();
        for _ in 0..3 {
            machine.advance_act(4).unwrap();
        }
        let before = machine.state().clone();

        let err = machine.advance_act(10).unwrap_err();

        assert!(err.is_boundary());
        assert_eq!(machine.state(), &before);
        assert_eq!(machine.total_acts(), Some(4));
    }

    #[test]
    fn test_advance_act_with_smaller_total_stops_early() {
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("ltcm", 4).unwrap();
        machine.advance_act(2).unwrap();

        assert!(machine.advance_act(2).unwrap_err().is_boundary());
        assert_eq!(machine.act(), 2);
    }

    #[test]
    fn test_previous_act_at_first_act_is_boundary() {
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("madoff", 4).unwrap();
        machine.set_sub_stage(2).unwrap();
        let before = machine.state().clone();

        let err = machine.previous_act().unwrap_err();

        assert!(matches!(
            err,
            NarrativeError::Boundary {
                operation: "previous_act",
                ..
            }
        ));
        assert_eq!(machine.state(), &before);
    }

    #[test]
    fn test_act_change_resets_sub_stage() {
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("ltcm", 3).unwrap();
        machine.advance_sub_stage().unwrap();
        machine.advance_sub_stage().unwrap();
        assert_eq!(machine.sub_stage(), 2);

        machine.advance_act(3).unwrap();
        assert_eq!(machine.sub_stage(), 0);

        machine.set_sub_stage(5).unwrap();
        machine.previous_act().unwrap();
        assert_eq!(machine.sub_stage(), 0);
    }

    #[test]
    fn test_negative_sub_stage_rejected() {
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("ltcm", 3).unwrap();
        machine.set_sub_stage(1).unwrap();

        let err = machine.set_sub_stage(-1).unwrap_err();

        assert!(err.is_boundary());
        assert_eq!(machine.sub_stage(), 1);
    }

    #[test]
    fn test_transitions_require_act_view() {
        let mut machine = NarrativeStateMachine::new();

        assert!(matches!(
            machine.advance_act(4),
            Err(NarrativeError::NotInActView { operation: "advance_act" })
        ));
        assert!(matches!(
            machine.previous_act(),
            Err(NarrativeError::NotInActView { .. })
        ));
        assert!(matches!(
            machine.update_context("k", json!(1)),
            Err(NarrativeError::NotInActView { .. })
        ));
        assert!(machine.unlock_tool().is_err());
        assert!(machine.context().is_empty());
    }

    #[test]
    fn test_reset_preserves_flags_and_clears_context() {
        let mut machine = NarrativeStateMachine::new();
        machine.set_debug(true);
        machine.show_modal();
        machine.select_case("lehman", 4).unwrap();
        machine.unlock_tool().unwrap();
        machine.advance_act(4).unwrap();

        machine.reset_to_selection();

        assert_eq!(machine.view(), ViewKind::Selection);
        assert_eq!(machine.case_id(), None);
        assert_eq!(machine.act(), 1);
        assert!(machine.context().is_empty());
        assert!(!machine.is_tool_unlocked());
        assert!(machine.is_debug());
        assert!(machine.is_modal_visible());
        assert_eq!(machine.total_acts(), None);
    }

    #[test]
    fn test_flags_survive_case_switch() {
        let mut machine = NarrativeStateMachine::new();
        assert!(machine.toggle_debug());
        machine.select_case("madoff", 4).unwrap();
        machine.select_case("ltcm", 4).unwrap();
        assert!(machine.is_debug());
        assert!(!machine.toggle_debug());
        machine.show_modal();
        machine.hide_modal();
        assert!(!machine.is_modal_visible());
    }

    #[test]
    fn test_summary_reflects_state() {
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("madoff", 4).unwrap();
        machine.update_context("act1_choice", json!("Invest")).unwrap();
        machine.unlock_tool().unwrap();

        let summary = machine.summary();

        assert_eq!(summary.view, ViewKind::ActView);
        assert_eq!(summary.case_id.as_deref(), Some("madoff"));
        assert_eq!(summary.total_acts, Some(4));
        assert_eq!(
            summary.context_keys,
            vec!["case_id", "act1_choice", "tool_unlocked"]
        );
        assert!(summary.tool_unlocked);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["view"], "act_view");
    }

    #[test]
    fn test_get_context_or_and_snapshot_independence() {
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("madoff", 4).unwrap();
        let snapshot = machine.context_snapshot();
        machine.update_context("user_name", json!("Grace")).unwrap();

        assert!(!snapshot.contains("user_name"));
        assert_eq!(machine.get_context_or("user_name", json!("anon")), json!("Grace"));
        assert_eq!(machine.get_context_or("missing", json!("anon")), json!("anon"));
    }
}
