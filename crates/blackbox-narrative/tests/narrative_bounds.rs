//! Property and scenario tests for narrative transitions.

use proptest::prelude::*;
use serde_json::json;

use blackbox_narrative::{
    ContentProvider, InMemoryContentProvider, NarrativeError, NarrativeStateMachine, ViewKind,
};

#[derive(Debug, Clone)]
enum Op {
    Select(u32),
    Advance,
    AdvanceWith(u32),
    Previous,
    SetSubStage(i64),
    AdvanceSubStage,
    Reset,
    Record(String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..6).prop_map(Op::Select),
        Just(Op::Advance),
        (0u32..10).prop_map(Op::AdvanceWith),
        Just(Op::Previous),
        (-3i64..5).prop_map(Op::SetSubStage),
        Just(Op::AdvanceSubStage),
        Just(Op::Reset),
        "[a-z]{0,4}".prop_map(Op::Record),
    ]
}

proptest! {
    #[test]
    fn prop_act_stays_within_case_bounds(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut machine = NarrativeStateMachine::new();

        for op in ops {
            let before = machine.clone();
            let result = match op {
                Op::Select(total) => machine.select_case("case", total),
                Op::Advance => {
                    let total = machine.total_acts().unwrap_or(1);
                    machine.advance_act(total)
                }
                Op::AdvanceWith(total) => machine.advance_act(total),
                Op::Previous => machine.previous_act(),
                Op::SetSubStage(stage) => machine.set_sub_stage(stage),
                Op::AdvanceSubStage => machine.advance_sub_stage(),
                Op::Reset => {
                    machine.reset_to_selection();
                    Ok(())
                }
                Op::Record(key) => machine.update_context(&key, json!(true)),
            };

            if result.is_err() {
                prop_assert_eq!(machine.state(), before.state());
                prop_assert_eq!(machine.context(), before.context());
            }

            prop_assert!(machine.act() >= 1);
            if let Some(total) = machine.total_acts() {
                prop_assert!(machine.act() <= total);
            }
            prop_assert_eq!(machine.case_id().is_some(), machine.view() == ViewKind::ActView);
        }
    }
}

#[test]
fn larger_total_does_not_extend_the_selected_case() {
    let provider = InMemoryContentProvider::builtin().unwrap();
    let case = provider.load_case("lehman").unwrap();
    let mut machine = NarrativeStateMachine::new();
    machine.select_case(&case.case_id, case.total_acts).unwrap();

    let advanced = (0..10).filter(|_| machine.advance_act(10).is_ok()).count();

    assert_eq!(advanced, 3);
    assert_eq!(machine.act(), case.total_acts);
}

#[test]
fn lehman_case_cannot_go_past_act_four() {
    // Setup
    let provider = InMemoryContentProvider::builtin().unwrap();
    let case = provider.load_case("lehman").unwrap();
    let mut machine = NarrativeStateMachine::new();
    machine.select_case(&case.case_id, case.total_acts).unwrap();

    // Execute
    for _ in 0..3 {
        machine.advance_act(case.total_acts).unwrap();
    }
    let overflow = machine.advance_act(case.total_acts);

    // Verify
    assert_eq!(machine.act(), 4);
    assert!(matches!(
        overflow,
        Err(NarrativeError::Boundary {
            operation: "advance_act",
            ..
        })
    ));
}

#[test]
fn previous_act_at_start_leaves_state_alone() {
    let mut machine = NarrativeStateMachine::new();
    machine.select_case("madoff", 4).unwrap();
    let before = machine.summary();

    let err = machine.previous_act().unwrap_err();

    assert!(err.is_boundary());
    assert_eq!(machine.summary(), before);
}

#[test]
fn reset_clears_context_but_keeps_flags() {
    // Setup
    let mut machine = NarrativeStateMachine::new();
    machine.select_case("ltcm", 4).unwrap();
    machine.update_context("user_name", json!("Ada")).unwrap();
    machine.unlock_tool().unwrap();
    machine.set_debug(true);
    machine.show_modal();

    // Execute
    machine.reset_to_selection();

    // Verify
    assert!(machine.context_snapshot().is_empty());
    assert_eq!(machine.view(), ViewKind::Selection);
    assert!(machine.is_debug());
    assert!(machine.is_modal_visible());
}
