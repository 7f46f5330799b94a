use std::collections::HashMap;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::ConfigSource;

/// Environment variable that holds the API key unless overridden.
pub const DEFAULT_CREDENTIAL_ENV: &str = "GEMINI_API_KEY";

/// Gemini REST endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 60;

/// Case-insensitive regexes that mark a failure as quota exhaustion.
pub const DEFAULT_QUOTA_SIGNATURES: &[&str] = &[
    r"\b429\b",
    "quota",
    "rate limit",
    "rate_limit",
    "resource_exhausted",
    "resource has been exhausted",
];

/// Text shown in place of generated content when no tier produced any.
pub const DEFAULT_FALLBACK_TEXT: &str = "The analysis engine is unavailable right now. \
Continue with the case notes and come back to this step later.";

pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_TOP_K: u32 = 40;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// Relative cost of calling a tier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CostClass {
    Cheap,
    Standard,
    Premium,
}

/// One `[[generation.tiers]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    /// Provider model identifier, e.g. `gemini-1.5-flash-latest`.
    pub id: String,
    /// Lower is tried first.
    pub rank: u32,
    pub cost: CostClass,
}

impl TierConfig {
    #[must_use]
    pub fn new(id: impl Into<String>, rank: u32, cost: CostClass) -> Self {
        Self {
            id: id.into(),
            rank,
            cost,
        }
    }
}

/// The three Gemini tiers the application ships with, best first.
#[must_use]
pub fn default_tiers() -> Vec<TierConfig> {
    vec![
        TierConfig::new("gemini-1.5-pro-latest", 0, CostClass::Premium),
        TierConfig::new("gemini-1.5-flash-latest", 1, CostClass::Standard),
        TierConfig::new("gemini-1.5-flash-8b", 2, CostClass::Cheap),
    ]
}

/// Resolved `[generation]` settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationConfig {
    pub credential_env: String,
    pub base_url: String,
    pub attempt_timeout_secs: u64,
    /// Count per-attempt timeouts as quota exhaustion (cascade) instead of transport (stop).
    pub timeouts_are_quota: bool,
    pub quota_signatures: Vec<String>,
    pub default_fallback: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub tiers: Vec<TierConfig>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            credential_env: DEFAULT_CREDENTIAL_ENV.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
            timeouts_are_quota: false,
            quota_signatures: DEFAULT_QUOTA_SIGNATURES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            default_fallback: DEFAULT_FALLBACK_TEXT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            tiers: default_tiers(),
        }
    }
}

/// Resolved `[logging]` settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LoggingConfig {
    pub verbose: bool,
    /// `compact` or `json`.
    pub format: Option<String>,
}

/// Effective configuration after layering.
#[derive(Debug, Clone)]
pub struct Config {
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
    pub source_attribution: HashMap<String, ConfigSource>,
    /// File that contributed values, if any.
    pub config_path: Option<Utf8PathBuf>,
}

/// Keys tracked in `source_attribution`.
pub(crate) const TRACKED_KEYS: &[&str] = &[
    "credential_env",
    "base_url",
    "attempt_timeout_secs",
    "timeouts_are_quota",
    "quota_signatures",
    "default_fallback",
    "temperature",
    "top_p",
    "top_k",
    "max_output_tokens",
    "tiers",
    "verbose",
    "log_format",
];

pub(crate) fn default_attribution() -> HashMap<String, ConfigSource> {
    TRACKED_KEYS
        .iter()
        .map(|key| ((*key).to_string(), ConfigSource::Default))
        .collect()
}

/// TOML file layout. Every field is optional so partial files layer over defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlConfig {
    pub generation: Option<GenerationSection>,
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GenerationSection {
    pub credential_env: Option<String>,
    pub base_url: Option<String>,
    pub attempt_timeout_secs: Option<u64>,
    pub timeouts_are_quota: Option<bool>,
    pub quota_signatures: Option<Vec<String>>,
    pub default_fallback: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
    pub tiers: Option<Vec<TierConfig>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LoggingSection {
    pub verbose: Option<bool>,
    pub format: Option<String>,
}
