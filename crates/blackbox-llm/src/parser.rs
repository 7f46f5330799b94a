//! Extraction of usable text from `generateContent` replies.
//!
//! Replies arrive in several shapes: a flattened `{"text": ...}` produced by
//! SDK wrappers, the full candidate structure, or a bare prompt-feedback block
//! when the prompt itself was refused. Keys are accepted in camelCase and
//! snake_case. [`parse`] is total: every JSON value maps to an outcome.

use serde_json::{Map, Value};

/// Interpretation of one raw reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Text(String),
    /// Refused on policy grounds; carries the provider's reason.
    SafetyBlocked(String),
    /// Well-formed but without any text.
    Empty,
    Malformed(String),
}

const SAFETY_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

const NORMAL_FINISH_REASONS: &[&str] = &["STOP", "MAX_TOKENS", "FINISH_REASON_UNSPECIFIED"];

/// Classify a raw reply. First matching rule wins:
///
/// 1. non-blank top-level `text`
/// 2. text fragments of the first candidate, concatenated
/// 3. `promptFeedback.blockReason`
/// 4. the first candidate's `finishReason`
/// 5. otherwise `Empty`
///
/// A structural surprise in one rule does not stop the later rules; it
/// yields `Malformed` only when no rule matched at all.
///
/// ```rust
/// use blackbox_llm::parser::{GenerationOutcome, parse};
/// use serde_json::json;
///
/// let reply = json!({"candidates": [{"content": {"parts": [{"text": "Hi"}, {"text": "!"}]}}]});
/// assert_eq!(parse(&reply), GenerationOutcome::Text("Hi!".to_string()));
///
/// let blocked = json!({"promptFeedback": {"blockReason": "SAFETY"}});
/// assert_eq!(parse(&blocked), GenerationOutcome::SafetyBlocked("SAFETY".to_string()));
/// ```
#[must_use]
pub fn parse(raw: &Value) -> GenerationOutcome {
    let Some(reply) = raw.as_object() else {
        return GenerationOutcome::Malformed(format!(
            "expected a JSON object, got {}",
            type_name(raw)
        ));
    };
    let mut surprise = None;

    if let Some(text) = noted(top_level_text(reply), &mut surprise) {
        return GenerationOutcome::Text(text);
    }

    let candidate = noted(first_candidate(reply), &mut surprise);

    if let Some(candidate) = candidate
        && let Some(text) = noted(candidate_text(candidate), &mut surprise)
    {
        return GenerationOutcome::Text(text);
    }

    if let Some(reason) = noted(block_reason(reply), &mut surprise) {
        return GenerationOutcome::SafetyBlocked(reason);
    }

    if let Some(candidate) = candidate
        && let Some(outcome) = noted(finish_reason_outcome(candidate), &mut surprise)
    {
        return outcome;
    }

    surprise.map_or(GenerationOutcome::Empty, GenerationOutcome::Malformed)
}

/// Treat a failed rule as "no match", keeping the first failure's detail.
fn noted<T>(result: Result<Option<T>, String>, surprise: &mut Option<String>) -> Option<T> {
    match result {
        Ok(found) => found,
        Err(detail) => {
            if surprise.is_none() {
                *surprise = Some(detail);
            }
            None
        }
    }
}

/// Look up `camel` or `snake`, treating `null` as absent.
fn field<'a>(object: &'a Map<String, Value>, camel: &str, snake: &str) -> Option<&'a Value> {
    object
        .get(camel)
        .or_else(|| object.get(snake))
        .filter(|value| !value.is_null())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn top_level_text(reply: &Map<String, Value>) -> Result<Option<String>, String> {
    match reply.get("text").filter(|v| !v.is_null()) {
        None => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(format!("`text` is {}, expected a string", type_name(other))),
    }
}

fn first_candidate(reply: &Map<String, Value>) -> Result<Option<&Map<String, Value>>, String> {
    let Some(candidates) = reply.get("candidates").filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let candidates = candidates
        .as_array()
        .ok_or_else(|| format!("`candidates` is {}, expected an array", type_name(candidates)))?;
    match candidates.first() {
        None => Ok(None),
        Some(Value::Object(candidate)) => Ok(Some(candidate)),
        Some(other) => Err(format!("candidate is {}, expected an object", type_name(other))),
    }
}

fn candidate_text(candidate: &Map<String, Value>) -> Result<Option<String>, String> {
    let Some(content) = candidate.get("content").filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let content = content
        .as_object()
        .ok_or_else(|| format!("`content` is {}, expected an object", type_name(content)))?;
    let Some(parts) = content.get("parts").filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let parts = parts
        .as_array()
        .ok_or_else(|| format!("`parts` is {}, expected an array", type_name(parts)))?;

    let mut fragments = Vec::with_capacity(parts.len());
    for part in parts {
        let part = part
            .as_object()
            .ok_or_else(|| format!("part is {}, expected an object", type_name(part)))?;
        // Parts without text (function calls, inline data) contribute nothing
        match part.get("text").filter(|v| !v.is_null()) {
            None => {}
            Some(Value::String(text)) => fragments.push(text.as_str()),
            Some(other) => {
                return Err(format!("part `text` is {}, expected a string", type_name(other)));
            }
        }
    }

    if fragments.iter().any(|fragment| !fragment.trim().is_empty()) {
        Ok(Some(fragments.concat()))
    } else {
        Ok(None)
    }
}

fn block_reason(reply: &Map<String, Value>) -> Result<Option<String>, String> {
    let Some(feedback) = field(reply, "promptFeedback", "prompt_feedback") else {
        return Ok(None);
    };
    let feedback = feedback.as_object().ok_or_else(|| {
        format!("`promptFeedback` is {}, expected an object", type_name(feedback))
    })?;
    match field(feedback, "blockReason", "block_reason") {
        None => Ok(None),
        Some(Value::String(reason)) => Ok(Some(reason.clone())),
        Some(other) => Err(format!(
            "`blockReason` is {}, expected a string",
            type_name(other)
        )),
    }
}

fn finish_reason_outcome(
    candidate: &Map<String, Value>,
) -> Result<Option<GenerationOutcome>, String> {
    let reason = match field(candidate, "finishReason", "finish_reason") {
        None => return Ok(None),
        Some(Value::String(reason)) => reason,
        Some(other) => {
            return Err(format!(
                "`finishReason` is {}, expected a string",
                type_name(other)
            ));
        }
    };

    let normalized = reason.trim().to_ascii_uppercase();
    if SAFETY_FINISH_REASONS.contains(&normalized.as_str()) {
        Ok(Some(GenerationOutcome::SafetyBlocked(reason.clone())))
    } else if NORMAL_FINISH_REASONS.contains(&normalized.as_str()) || normalized.is_empty() {
        Ok(None)
    } else {
        Ok(Some(GenerationOutcome::Malformed(format!(
            "generation stopped with finish reason {reason}"
        ))))
    }
}
