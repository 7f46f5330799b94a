//! The single classification step between a backend error and the cascade.

use regex::{Regex, RegexBuilder};

use blackbox_config::{Config, DEFAULT_QUOTA_SIGNATURES};
use blackbox_utils::error::GenerationError;

/// How the cascade treats a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailureClass {
    /// Capacity exhausted on this tier; try the next one.
    QuotaSignature,
    /// The service could not be reached or answered with an error.
    Transport,
    /// Anything else. Treated like `Transport` by the cascade.
    Unknown,
}

/// Decides whether an error means "this tier is out of quota".
///
/// A `ProviderQuota` error always is. Other transport-level errors are when
/// their text matches one of the configured signatures (case-insensitive).
/// Timeouts count only when `timeouts_are_quota` is set.
#[derive(Debug, Clone)]
pub struct QuotaSignatureMatcher {
    signatures: Vec<Regex>,
    timeouts_are_quota: bool,
}

impl QuotaSignatureMatcher {
    /// # Errors
    ///
    /// Returns `GenerationError::Misconfiguration` if a signature is not a valid pattern.
    pub fn new<S: AsRef<str>>(
        signatures: &[S],
        timeouts_are_quota: bool,
    ) -> Result<Self, GenerationError> {
        let signatures = signatures
            .iter()
            .map(|signature| {
                compile(signature.as_ref()).map_err(|e| {
                    GenerationError::Misconfiguration(format!(
                        "invalid quota signature '{}': {e}",
                        signature.as_ref()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            signatures,
            timeouts_are_quota,
        })
    }

    /// # Errors
    ///
    /// See [`QuotaSignatureMatcher::new`].
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        Self::new(
            &config.generation.quota_signatures,
            config.generation.timeouts_are_quota,
        )
    }

    /// True if any signature occurs in `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.signatures.iter().any(|signature| signature.is_match(text))
    }

    #[must_use]
    pub fn classify(&self, error: &GenerationError) -> FailureClass {
        match error {
            GenerationError::ProviderQuota(_) => FailureClass::QuotaSignature,
            GenerationError::Timeout { .. } if self.timeouts_are_quota => {
                FailureClass::QuotaSignature
            }
            GenerationError::Timeout { .. } => FailureClass::Transport,
            GenerationError::Transport(message) | GenerationError::ProviderOutage(message) => {
                if self.matches(message) {
                    FailureClass::QuotaSignature
                } else {
                    FailureClass::Transport
                }
            }
            other => {
                if self.matches(&other.to_string()) {
                    FailureClass::QuotaSignature
                } else {
                    FailureClass::Unknown
                }
            }
        }
    }
}

fn compile(signature: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(signature).case_insensitive(true).build()
}

impl Default for QuotaSignatureMatcher {
    /// The built-in signatures, compiled the same way as configured ones.
    fn default() -> Self {
        let signatures = DEFAULT_QUOTA_SIGNATURES
            .iter()
            .filter_map(|signature| compile(signature).ok())
            .collect();
        Self {
            signatures,
            timeouts_are_quota: false,
        }
    }
}
