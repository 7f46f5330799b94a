use serde::Serialize;
use serde_json::{Map, Value};

/// Well-known context keys.
pub mod keys {
    pub const CASE_ID: &str = "case_id";
    pub const TOOL_UNLOCKED: &str = "tool_unlocked";
    pub const USER_NAME: &str = "user_name";
    pub const USER_PRINCIPLE: &str = "user_principle";
    /// The option the user picked in act 1.
    pub const ACT1_CHOICE: &str = "act1_choice";
    pub const ACT1_CHALLENGE: &str = "act1_challenge";
    pub const PERSONAL_TOOL: &str = "personal_tool";

    /// Key for the answer given at `sub_stage` of `act`.
    #[must_use]
    pub fn answer(act: u32, sub_stage: u32) -> String {
        format!("act{act}_stage{sub_stage}_answer")
    }
}

/// Insertion-ordered key/value record of one case run.
///
/// Keys are only added or overwritten; the whole context is replaced when a
/// new case starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SessionContext {
    entries: Map<String, Value>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh context holding only the case id.
    #[must_use]
    pub fn seeded(case_id: &str) -> Self {
        let mut context = Self::new();
        context.insert(keys::CASE_ID, Value::from(case_id));
        context
    }

    /// Insert or overwrite, returning the previous value.
    pub(crate) fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Owned copy of every entry, for prompt building and display.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        self.entries.clone()
    }
}
