//! Quota-aware tier cascade.
//!
//! [`GenerationOrchestrator`] owns the active tier client and a "preferred
//! tier" hint. Every call walks the tiers starting at the hint, moves on only
//! when a tier is out of quota or answers without usable text, and always
//! returns a displayable [`GenerationResult`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{Instrument, debug, error, info, warn};

use blackbox_config::Config;
use blackbox_error_redaction::redact_error_message_for_logging;
use blackbox_utils::error::GenerationError;
use blackbox_utils::logging::generation_span;

use crate::backend::{BackendFactory, GenerationBackend};
use crate::classify::{FailureClass, QuotaSignatureMatcher};
use crate::gemini_backend::GeminiBackendFactory;
use crate::parser::{GenerationOutcome, parse};
use crate::registry::ModelTierRegistry;
use crate::types::{
    AttemptOutcome, AttemptRecord, BUILTIN_FALLBACK_TEXT, CancellationFlag, Credential, ErrorKind,
    GenerationDiagnostics, GenerationParams, GenerationRequest, GenerationResult, ModelTier,
};

/// Returned by a successful [`GenerationOrchestrator::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ready {
    /// Tier whose client was constructed first.
    pub active_tier: String,
    /// Better-ranked tiers that could not be constructed.
    pub skipped: Vec<String>,
}

struct ActiveClient {
    tier_id: String,
    backend: Arc<dyn GenerationBackend>,
}

#[derive(Default)]
struct TierState {
    credential: Option<Credential>,
    active: Option<ActiveClient>,
    preferred: Option<String>,
}

pub struct GenerationOrchestrator {
    registry: ModelTierRegistry,
    factory: Arc<dyn BackendFactory>,
    matcher: QuotaSignatureMatcher,
    attempt_timeout: Duration,
    default_fallback: String,
    params: GenerationParams,
    state: Mutex<TierState>,
}

impl GenerationOrchestrator {
    /// Orchestrator with default matcher, timeout and fallback.
    #[must_use]
    pub fn new(registry: ModelTierRegistry, factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            registry,
            factory,
            matcher: QuotaSignatureMatcher::default(),
            attempt_timeout: Duration::from_secs(blackbox_config::DEFAULT_ATTEMPT_TIMEOUT_SECS),
            default_fallback: blackbox_config::DEFAULT_FALLBACK_TEXT.to_string(),
            params: GenerationParams::default(),
            state: Mutex::new(TierState::default()),
        }
    }

    /// Gemini-backed orchestrator built from `[generation]`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Misconfiguration` for an unusable tier list or
    /// quota signature.
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        Self::from_config_with_factory(config, Arc::new(GeminiBackendFactory::from_config(config)))
    }

    /// Like [`GenerationOrchestrator::from_config`] with a caller-supplied factory.
    ///
    /// # Errors
    ///
    /// See [`GenerationOrchestrator::from_config`].
    pub fn from_config_with_factory(
        config: &Config,
        factory: Arc<dyn BackendFactory>,
    ) -> Result<Self, GenerationError> {
        Ok(Self::new(ModelTierRegistry::from_config(config)?, factory)
            .with_matcher(QuotaSignatureMatcher::from_config(config)?)
            .with_attempt_timeout(config.attempt_timeout())
            .with_default_fallback(config.generation.default_fallback.clone())
            .with_params(GenerationParams::from_config(config)))
    }

    #[must_use]
    pub fn with_matcher(mut self, matcher: QuotaSignatureMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_default_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.default_fallback = fallback.into();
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Accept a credential and construct the first usable tier client.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::ProviderAuth` when the credential is missing or
    /// blank, or when no tier client could be constructed.
    pub fn initialize(&self, credential: Option<&str>) -> Result<Ready, GenerationError> {
        let credential = match credential {
            Some(key) => Credential::new(key)?,
            None => {
                return Err(GenerationError::ProviderAuth(
                    "no API key was provided".to_string(),
                ));
            }
        };

        let mut skipped = Vec::new();
        let mut last_error = None;
        for tier in self.registry.ordered() {
            match self.factory.create(tier, &credential) {
                Ok(backend) => {
                    let mut state = self.lock_state();
                    state.credential = Some(credential);
                    state.active = Some(ActiveClient {
                        tier_id: tier.id().to_string(),
                        backend,
                    });
                    state.preferred = Some(tier.id().to_string());
                    info!(tier = tier.id(), skipped = skipped.len(), "Generation backend ready");
                    return Ok(Ready {
                        active_tier: tier.id().to_string(),
                        skipped,
                    });
                }
                Err(e) => {
                    let reason = redact_error_message_for_logging(&e.to_string());
                    warn!(tier = tier.id(), error = %reason, "Tier client construction failed");
                    skipped.push(tier.id().to_string());
                    last_error = Some(reason);
                }
            }
        }

        Err(GenerationError::ProviderAuth(format!(
            "no model tier could be initialized: {}",
            last_error.unwrap_or_default()
        )))
    }

    /// Build a request carrying the configured sampling parameters.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::InvalidRequest` for a blank prompt.
    pub fn request(&self, prompt: impl Into<String>) -> Result<GenerationRequest, GenerationError> {
        Ok(GenerationRequest::new(prompt)?.with_params(self.params))
    }

    /// Run `request` through the cascade. Never fails.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        self.generate_with_cancel(request, &CancellationFlag::new())
            .await
    }

    /// Run `request` through the cascade, checking `cancel` before each attempt.
    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationFlag,
    ) -> GenerationResult {
        let (credential, preferred) = {
            let state = self.lock_state();
            (state.credential.clone(), state.preferred.clone())
        };
        let start_tier = preferred
            .clone()
            .unwrap_or_else(|| self.registry.default_tier().id().to_string());
        let span = generation_span(request.prompt().chars().count(), &start_tier);

        self.run_cascade(request, cancel, credential, preferred)
            .instrument(span)
            .await
    }

    async fn run_cascade(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationFlag,
        credential: Option<Credential>,
        preferred: Option<String>,
    ) -> GenerationResult {
        let started = Instant::now();
        let mut diagnostics = GenerationDiagnostics::start();
        let fallback = self.resolve_fallback(request);

        let Some(credential) = credential else {
            warn!("Generation requested before a credential was accepted");
            return Self::finish_failure(
                ErrorKind::Auth,
                "generation backend is not initialized".to_string(),
                fallback,
                diagnostics,
                started,
            );
        };

        let mut last_problem = String::new();
        for tier in self.registry.ordered_from(preferred.as_deref()) {
            if cancel.is_cancelled() {
                info!(next_tier = tier.id(), "Generation cancelled");
                return Self::finish_failure(
                    ErrorKind::Cancelled,
                    format!("cancelled before trying {}", tier.id()),
                    fallback,
                    diagnostics,
                    started,
                );
            }

            let attempt_started = Instant::now();
            let backend = match self.client_for(tier, &credential) {
                Ok(backend) => backend,
                Err(e) => {
                    let reason = redact_error_message_for_logging(&e.to_string());
                    warn!(tier = tier.id(), error = %reason, "Skipping tier, client construction failed");
                    Self::record(&mut diagnostics, tier, AttemptOutcome::Skipped, attempt_started);
                    last_problem = format!("{}: {reason}", tier.id());
                    continue;
                }
            };

            let reply = tokio::time::timeout(self.attempt_timeout, backend.generate_content(request))
                .await
                .unwrap_or(Err(GenerationError::Timeout {
                    duration: self.attempt_timeout,
                }));

            match reply {
                Ok(raw) => match parse(&raw) {
                    GenerationOutcome::Text(text) => {
                        Self::record(&mut diagnostics, tier, AttemptOutcome::Success, attempt_started);
                        self.lock_state().preferred = Some(tier.id().to_string());
                        info!(
                            tier = tier.id(),
                            attempts = diagnostics.attempts.len(),
                            "Generation succeeded"
                        );
                        diagnostics.elapsed = started.elapsed();
                        return GenerationResult::success(
                            text,
                            tier.id().to_string(),
                            fallback,
                            diagnostics,
                        );
                    }
                    GenerationOutcome::SafetyBlocked(reason) => {
                        Self::record(
                            &mut diagnostics,
                            tier,
                            AttemptOutcome::SafetyBlocked,
                            attempt_started,
                        );
                        warn!(tier = tier.id(), reason = %reason, "Prompt blocked by safety policy");
                        return Self::finish_failure(
                            ErrorKind::SafetyBlocked(reason.clone()),
                            format!("{} refused the prompt: {reason}", tier.id()),
                            fallback,
                            diagnostics,
                            started,
                        );
                    }
                    GenerationOutcome::Empty => {
                        Self::record(&mut diagnostics, tier, AttemptOutcome::Empty, attempt_started);
                        warn!(tier = tier.id(), "Empty reply, trying next tier");
                        last_problem = format!("{} returned no text", tier.id());
                    }
                    GenerationOutcome::Malformed(detail) => {
                        Self::record(&mut diagnostics, tier, AttemptOutcome::Malformed, attempt_started);
                        warn!(tier = tier.id(), detail = %detail, "Unreadable reply, trying next tier");
                        last_problem = format!("{} returned an unreadable reply: {detail}", tier.id());
                    }
                },
                Err(e) => {
                    let reason = redact_error_message_for_logging(&e.to_string());
                    match self.matcher.classify(&e) {
                        FailureClass::QuotaSignature => {
                            Self::record(
                                &mut diagnostics,
                                tier,
                                AttemptOutcome::QuotaExhausted,
                                attempt_started,
                            );
                            warn!(tier = tier.id(), error = %reason, "Tier out of quota, trying next tier");
                            last_problem = format!("{}: {reason}", tier.id());
                        }
                        class @ (FailureClass::Transport | FailureClass::Unknown) => {
                            Self::record(
                                &mut diagnostics,
                                tier,
                                AttemptOutcome::Transport,
                                attempt_started,
                            );
                            error!(tier = tier.id(), class = %class, error = %reason, "Generation failed");
                            return Self::finish_failure(
                                ErrorKind::Transport,
                                format!("{}: {reason}", tier.id()),
                                fallback,
                                diagnostics,
                                started,
                            );
                        }
                    }
                }
            }

            debug!(tier = tier.id(), "Attempt finished without text");
        }

        warn!(tiers = self.registry.len(), last = %last_problem, "All tiers exhausted");
        Self::finish_failure(
            ErrorKind::AllTiersExhausted,
            format!(
                "no tier produced text (tried {}); last problem: {last_problem}",
                diagnostics.attempted_tiers().join(", ")
            ),
            fallback,
            diagnostics,
            started,
        )
    }

    /// Client for `tier`, constructing and activating one if needed.
    fn client_for(
        &self,
        tier: &ModelTier,
        credential: &Credential,
    ) -> Result<Arc<dyn GenerationBackend>, GenerationError> {
        let mut state = self.lock_state();
        if let Some(active) = &state.active
            && active.tier_id == tier.id()
        {
            return Ok(Arc::clone(&active.backend));
        }

        let backend = self.factory.create(tier, credential)?;
        debug!(tier = tier.id(), "Switched active tier client");
        state.active = Some(ActiveClient {
            tier_id: tier.id().to_string(),
            backend: Arc::clone(&backend),
        });
        Ok(backend)
    }

    fn record(
        diagnostics: &mut GenerationDiagnostics,
        tier: &ModelTier,
        outcome: AttemptOutcome,
        attempt_started: Instant,
    ) {
        let elapsed = attempt_started.elapsed();
        debug!(
            tier = tier.id(),
            outcome = %outcome,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Tier attempt"
        );
        diagnostics.attempts.push(AttemptRecord {
            tier: tier.id().to_string(),
            outcome,
            elapsed,
        });
    }

    fn finish_failure(
        kind: ErrorKind,
        message: String,
        fallback: String,
        mut diagnostics: GenerationDiagnostics,
        started: Instant,
    ) -> GenerationResult {
        diagnostics.elapsed = started.elapsed();
        GenerationResult::failure(kind, message, fallback, diagnostics)
    }

    /// First non-blank of: request fallback, orchestrator default, built-in text.
    fn resolve_fallback(&self, request: &GenerationRequest) -> String {
        request
            .fallback()
            .filter(|text| !text.trim().is_empty())
            .or_else(|| Some(self.default_fallback.as_str()).filter(|t| !t.trim().is_empty()))
            .unwrap_or(BUILTIN_FALLBACK_TEXT)
            .to_string()
    }

    fn lock_state(&self) -> MutexGuard<'_, TierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tier the next call starts with, once initialized.
    #[must_use]
    pub fn preferred_tier(&self) -> Option<String> {
        self.lock_state().preferred.clone()
    }

    /// Tier whose client is currently constructed.
    #[must_use]
    pub fn active_tier(&self) -> Option<String> {
        self.lock_state()
            .active
            .as_ref()
            .map(|active| active.tier_id.clone())
    }

    /// Point the hint back at the best-ranked tier.
    pub fn reset_preferred_tier(&self) {
        let default_id = self.registry.default_tier().id().to_string();
        debug!(tier = %default_id, "Preferred tier reset");
        self.lock_state().preferred = Some(default_id);
    }

    #[must_use]
    pub fn registry(&self) -> &ModelTierRegistry {
        &self.registry
    }

    /// True once a credential has been accepted.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lock_state().credential.is_some()
    }

    #[must_use]
    pub fn default_fallback(&self) -> &str {
        &self.default_fallback
    }
}
