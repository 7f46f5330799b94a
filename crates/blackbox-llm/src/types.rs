//! Request, result and diagnostic types shared by the cascade and its backends.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use strum::IntoEnumIterator;

use blackbox_config::{Config, CostClass, TierConfig};
use blackbox_utils::error::GenerationError;

/// Shown when neither the request nor the orchestrator carries usable fallback text.
pub const BUILTIN_FALLBACK_TEXT: &str = "This content is temporarily unavailable.";

/// One configured model: identifier, priority rank and cost class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelTier {
    id: String,
    rank: u32,
    cost: CostClass,
}

impl ModelTier {
    #[must_use]
    pub fn new(id: impl Into<String>, rank: u32, cost: CostClass) -> Self {
        Self {
            id: id.into(),
            rank,
            cost,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lower ranks are preferred.
    #[must_use]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    #[must_use]
    pub fn cost(&self) -> CostClass {
        self.cost
    }
}

impl From<&TierConfig> for ModelTier {
    fn from(tier: &TierConfig) -> Self {
        Self::new(tier.id.clone(), tier.rank, tier.cost)
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.cost)
    }
}

/// Sampling parameters sent with every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: blackbox_config::DEFAULT_TEMPERATURE,
            top_p: blackbox_config::DEFAULT_TOP_P,
            top_k: blackbox_config::DEFAULT_TOP_K,
            max_output_tokens: blackbox_config::DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl GenerationParams {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            temperature: config.generation.temperature,
            top_p: config.generation.top_p,
            top_k: config.generation.top_k,
            max_output_tokens: config.generation.max_output_tokens,
        }
    }
}

/// Harm categories the provider filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::EnumIter)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

/// Provider-side blocking threshold for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: &'static str,
}

/// Safety settings attached to every request.
///
/// The narratives quote fraud, collapse and panic verbatim, so every category
/// is sent with `BLOCK_NONE`. Blocks the provider applies anyway still surface
/// as `SafetyBlocked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SafetyPolicy {
    settings: Vec<SafetySetting>,
}

impl SafetyPolicy {
    #[must_use]
    pub fn permit_all() -> Self {
        Self {
            settings: HarmCategory::iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &[SafetySetting] {
        &self.settings
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self::permit_all()
    }
}

/// A validated generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    params: GenerationParams,
    safety: SafetyPolicy,
    fallback: Option<String>,
}

impl GenerationRequest {
    /// Build a request with default parameters.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::InvalidRequest` for a blank prompt.
    pub fn new(prompt: impl Into<String>) -> Result<Self, GenerationError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        Ok(Self {
            prompt,
            params: GenerationParams::default(),
            safety: SafetyPolicy::permit_all(),
            fallback: None,
        })
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Text to display if generation fails. Blank values are ignored.
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        let fallback = fallback.into();
        self.fallback = (!fallback.trim().is_empty()).then_some(fallback);
        self
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    #[must_use]
    pub fn safety(&self) -> &SafetyPolicy {
        &self.safety
    }

    #[must_use]
    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }
}

/// Why a generation call ended without text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ErrorKind {
    /// No usable credential, or the orchestrator was never initialized.
    Auth,
    /// The provider refused the prompt; carries the provider's reason.
    SafetyBlocked(String),
    /// A non-quota failure stopped the cascade.
    Transport,
    /// Every tier was tried and none produced text.
    AllTiersExhausted,
    /// The caller cancelled between attempts.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => f.write_str("auth"),
            Self::SafetyBlocked(reason) => write!(f, "safety_blocked({reason})"),
            Self::Transport => f.write_str("transport"),
            Self::AllTiersExhausted => f.write_str("all_tiers_exhausted"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationStatus {
    Success { text: String, tier: String },
    Failure { kind: ErrorKind, message: String },
}

/// What happened on one tier attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    SafetyBlocked,
    Empty,
    Malformed,
    QuotaExhausted,
    Transport,
    /// The tier's client could not be constructed; nothing was sent.
    Skipped,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub tier: String,
    pub outcome: AttemptOutcome,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

/// Fixed diagnostic record attached to every result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationDiagnostics {
    pub started_at: DateTime<Utc>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub attempts: Vec<AttemptRecord>,
}

impl GenerationDiagnostics {
    pub(crate) fn start() -> Self {
        Self {
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            attempts: Vec::new(),
        }
    }

    /// Tier ids in the order they were attempted.
    #[must_use]
    pub fn attempted_tiers(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.tier.as_str()).collect()
    }
}

/// Outcome of one `generate` call. Always displayable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    #[serde(flatten)]
    status: GenerationStatus,
    fallback: String,
    diagnostics: GenerationDiagnostics,
}

impl GenerationResult {
    pub(crate) fn success(
        text: String,
        tier: String,
        fallback: String,
        diagnostics: GenerationDiagnostics,
    ) -> Self {
        Self {
            status: GenerationStatus::Success { text, tier },
            fallback,
            diagnostics,
        }
    }

    pub(crate) fn failure(
        kind: ErrorKind,
        message: String,
        fallback: String,
        diagnostics: GenerationDiagnostics,
    ) -> Self {
        Self {
            status: GenerationStatus::Failure { kind, message },
            fallback,
            diagnostics,
        }
    }

    /// Generated text on success, the fallback otherwise.
    #[must_use]
    pub fn display_text(&self) -> &str {
        match &self.status {
            GenerationStatus::Success { text, .. } => text,
            GenerationStatus::Failure { .. } => &self.fallback,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, GenerationStatus::Success { .. })
    }

    #[must_use]
    pub fn status(&self) -> &GenerationStatus {
        &self.status
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.status {
            GenerationStatus::Success { text, .. } => Some(text),
            GenerationStatus::Failure { .. } => None,
        }
    }

    /// Tier that produced the text.
    #[must_use]
    pub fn tier(&self) -> Option<&str> {
        match &self.status {
            GenerationStatus::Success { tier, .. } => Some(tier),
            GenerationStatus::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<&ErrorKind> {
        match &self.status {
            GenerationStatus::Success { .. } => None,
            GenerationStatus::Failure { kind, .. } => Some(kind),
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match &self.status {
            GenerationStatus::Success { .. } => None,
            GenerationStatus::Failure { message, .. } => Some(message),
        }
    }

    #[must_use]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    #[must_use]
    pub fn diagnostics(&self) -> &GenerationDiagnostics {
        &self.diagnostics
    }
}

/// API key for the generation service. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// # Errors
    ///
    /// Returns `GenerationError::ProviderAuth` for a blank key.
    pub fn new(key: impl Into<String>) -> Result<Self, GenerationError> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(GenerationError::ProviderAuth(
                "API key is empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Read the key from environment variable `var`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::ProviderAuth` when the variable is unset or blank.
    pub fn from_env(var: &str) -> Result<Self, GenerationError> {
        let value = std::env::var(var).map_err(|_| {
            GenerationError::ProviderAuth(format!(
                "API key not found in environment variable '{var}'"
            ))
        })?;
        Self::new(value).map_err(|_| {
            GenerationError::ProviderAuth(format!("environment variable '{var}' is empty"))
        })
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential")
            .field(&blackbox_error_redaction::mask_secret(&self.0))
            .finish()
    }
}

/// Cooperative cancellation, observed between tier attempts.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
