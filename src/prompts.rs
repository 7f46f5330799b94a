//! Prompt builders for the generated parts of a case.
//!
//! Each builder reads what it needs from a [`SessionContext`] and substitutes
//! a neutral placeholder for anything the user has not provided yet, so a
//! prompt can always be built.

use blackbox_narrative::{SessionContext, keys};

/// Shown instead of a generated challenge when generation fails.
pub const CHALLENGE_FALLBACK: &str = "Are you sure your judgement rests on facts rather than hope?";

/// Shown instead of a generated decision tool when generation fails.
pub const TOOL_FALLBACK: &str = "Sorry, your personal tool could not be generated right now.";

/// A prompt paired with the text to show if generation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub fallback: &'static str,
}

fn case_name(context: &SessionContext) -> &str {
    context.get_str(keys::CASE_ID).unwrap_or("this")
}

fn value_or<'a>(context: &'a SessionContext, key: &str, placeholder: &'a str) -> &'a str {
    context
        .get_str(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(placeholder)
}

/// One-sentence challenge to the decision made in act 1.
#[must_use]
pub fn challenge_question(context: &SessionContext) -> Prompt {
    let choice = value_or(context, keys::ACT1_CHOICE, "a judgement call");
    Prompt {
        text: format!(
            "You are a sharp Wall Street hedge fund manager. A client looked at the '{case}' \
             opportunity and decided: \"{choice}\". Challenge that decision in one short, \
             pointed sentence that goes straight to its weakest assumption.",
            case = case_name(context),
        ),
        fallback: CHALLENGE_FALLBACK,
    }
}

/// Personal decision tool built from the user's name, principle and act-1 choice.
#[must_use]
pub fn personalized_tool(context: &SessionContext) -> Prompt {
    let name = value_or(context, keys::USER_NAME, "the user");
    let principle = value_or(context, keys::USER_PRINCIPLE, "not provided");
    let choice = value_or(context, keys::ACT1_CHOICE, "not recorded");
    Prompt {
        text: format!(
            "You are a world-class cognitive scientist. A decision maker named \"{name}\" has \
             just studied the '{case}' case. Their core principle is: \"{principle}\". Their \
             decision in act one was: \"{choice}\". Create a personal decision tool that guards \
             them against the bias this case exposes. It must include one piece of advice aimed \
             specifically at their principle. Format the answer in Markdown.",
            case = case_name(context),
        ),
        fallback: TOOL_FALLBACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackbox_narrative::NarrativeStateMachine;
    use serde_json::json;

    fn context_with(entries: &[(&str, &str)]) -> SessionContext {
        let mut machine = NarrativeStateMachine::new();
        machine.select_case("madoff", 4).unwrap();
        for (key, value) in entries {
            machine.update_context(key, json!(value)).unwrap();
        }
        machine.context_snapshot()
    }

    #[test]
    fn test_challenge_embeds_choice() {
        let context = context_with(&[(keys::ACT1_CHOICE, "Invest immediately")]);

        let prompt = challenge_question(&context);

        assert!(prompt.text.contains("\"Invest immediately\""));
        assert!(prompt.text.contains("'madoff'"));
        assert_eq!(prompt.fallback, CHALLENGE_FALLBACK);
    }

    #[test]
    fn test_tool_uses_placeholders_for_missing_values() {
        let context = context_with(&[(keys::USER_NAME, "  ")]);

        let prompt = personalized_tool(&context);

        assert!(prompt.text.contains("named \"the user\""));
        assert!(prompt.text.contains("\"not provided\""));
        assert!(prompt.text.contains("\"not recorded\""));
        assert!(prompt.text.contains("Markdown"));
        assert_eq!(prompt.fallback, TOOL_FALLBACK);
    }

    #[test]
    fn test_prompts_build_from_empty_context() {
        let context = SessionContext::new();
        assert!(challenge_question(&context).text.contains("'this'"));
        assert!(!personalized_tool(&context).text.is_empty());
    }
}
