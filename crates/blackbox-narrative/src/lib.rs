//! Narrative progression for blackbox.
//!
//! A [`NarrativeStateMachine`] moves one user between case selection and the
//! acts of a case. Every transition is validated before anything changes, so
//! a rejected transition leaves the state exactly as it was. Answers and
//! generated artifacts accumulate in a [`SessionContext`] that lives for one
//! case run.

pub mod content;
pub mod context;
pub mod machine;
pub mod state;
pub mod transitions;

pub use blackbox_utils::error::NarrativeError;
pub use content::{CaseContent, ContentProvider, InMemoryContentProvider};
pub use context::{SessionContext, keys};
pub use machine::NarrativeStateMachine;
pub use state::{NarrativeState, StateSummary, UiFlags, ViewKind};
pub use transitions::{TransitionCue, transition_cue};
