//! Case content and where it comes from.
//!
//! The state machine only needs a case id and an act count; everything a
//! presentation layer shows for an act lives in [`CaseContent`].

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use blackbox_utils::error::NarrativeError;

/// Text and choices for one case, keyed by act number (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseContent {
    pub case_id: String,
    pub title: String,
    pub total_acts: u32,
    pub act_text: BTreeMap<u32, String>,
    pub options_by_act: BTreeMap<u32, Vec<String>>,
}

impl CaseContent {
    /// # Errors
    ///
    /// `InvalidCase` for a blank id or `total_acts == 0`.
    pub fn new(
        case_id: impl Into<String>,
        title: impl Into<String>,
        total_acts: u32,
    ) -> Result<Self, NarrativeError> {
        let case_id = case_id.into();
        if case_id.trim().is_empty() {
            return Err(NarrativeError::InvalidCase {
                case_id,
                reason: "case id must not be blank".to_string(),
            });
        }
        if total_acts == 0 {
            return Err(NarrativeError::InvalidCase {
                case_id,
                reason: "a case needs at least one act".to_string(),
            });
        }
        Ok(Self {
            case_id,
            title: title.into(),
            total_acts,
            act_text: BTreeMap::new(),
            options_by_act: BTreeMap::new(),
        })
    }

    fn check_act(&self, act: u32) -> Result<(), NarrativeError> {
        if (1..=self.total_acts).contains(&act) {
            Ok(())
        } else {
            Err(NarrativeError::InvalidCase {
                case_id: self.case_id.clone(),
                reason: format!("act {act} is outside 1..={}", self.total_acts),
            })
        }
    }

    /// # Errors
    ///
    /// `InvalidCase` if `act` is outside `1..=total_acts`.
    pub fn with_act(mut self, act: u32, text: impl Into<String>) -> Result<Self, NarrativeError> {
        self.check_act(act)?;
        self.act_text.insert(act, text.into());
        Ok(self)
    }

    /// # Errors
    ///
    /// `InvalidCase` if `act` is outside `1..=total_acts`.
    pub fn with_options<I, S>(mut self, act: u32, options: I) -> Result<Self, NarrativeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_act(act)?;
        self.options_by_act
            .insert(act, options.into_iter().map(Into::into).collect());
        Ok(self)
    }

    #[must_use]
    pub fn text_for(&self, act: u32) -> Option<&str> {
        self.act_text.get(&act).map(String::as_str)
    }

    /// Choices offered in `act`; empty when the act has none.
    #[must_use]
    pub fn options_for(&self, act: u32) -> &[String] {
        self.options_by_act
            .get(&act)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Source of case content.
pub trait ContentProvider: Send + Sync {
    /// # Errors
    ///
    /// `UnknownCase` when no case has this id.
    fn load_case(&self, case_id: &str) -> Result<CaseContent, NarrativeError>;

    /// Every id this provider can load, sorted.
    fn case_ids(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryContentProvider {
    cases: HashMap<String, CaseContent>,
}

impl InMemoryContentProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a case.
    pub fn insert(&mut self, content: CaseContent) -> Option<CaseContent> {
        self.cases.insert(content.case_id.clone(), content)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// The three stock cases, four acts each.
    ///
    /// # Errors
    ///
    /// Only if the built-in content is itself inconsistent.
    pub fn builtin() -> Result<Self, NarrativeError> {
        let mut provider = Self::new();

        provider.insert(
            CaseContent::new("madoff", "The Madoff Illusion", 4)?
                .with_act(1, "A legendary fund manager offers you a seat in a fund that has never had a losing year.")?
                .with_options(1, ["Invest immediately", "Ask for audited statements", "Walk away"])?
                .with_act(2, "December 2008. The fund was a Ponzi scheme and $65 billion in paper wealth is gone.")?
                .with_act(3, "Reputation stood in for evidence. This is the halo effect at work.")?
                .with_act(4, "Write the principle you will use the next time authority asks for your trust.")?,
        );
        provider.insert(
            CaseContent::new("lehman", "Lehman's Last Weekend", 4)?
                .with_act(1, "You run risk at a leveraged bank. Housing prices have never fallen nationwide.")?
                .with_options(1, ["Keep the leverage", "Cut exposure by half", "Hedge and wait"])?
                .with_act(2, "September 2008. No buyer appears and the bank files for bankruptcy.")?
                .with_act(3, "Past stability was mistaken for proof of future stability.")?
                .with_act(4, "Build a check that forces you to price the scenario nobody believes in.")?,
        );
        provider.insert(
            CaseContent::new("ltcm", "The Genius Who Failed", 4)?
                .with_act(1, "Nobel laureates show you a model that says the spread must converge.")?
                .with_options(1, ["Trust the model", "Size down", "Demand a stress test"])?
                .with_act(2, "August 1998. Russia defaults and the spreads widen instead.")?
                .with_act(3, "Credentials and precision made the model feel safer than it was.")?
                .with_act(4, "Decide how you will separate a model's confidence from your own.")?,
        );

        Ok(provider)
    }
}

impl ContentProvider for InMemoryContentProvider {
    fn load_case(&self, case_id: &str) -> Result<CaseContent, NarrativeError> {
        self.cases
            .get(case_id)
            .cloned()
            .ok_or_else(|| NarrativeError::UnknownCase(case_id.to_string()))
    }

    fn case_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.cases.keys().cloned().collect();
        ids.sort();
        ids
    }
}
