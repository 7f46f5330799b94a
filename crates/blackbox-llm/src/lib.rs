//! Text generation for blackbox.
//!
//! A [`GenerationOrchestrator`] walks an ordered [`ModelTierRegistry`],
//! building tier clients through a [`BackendFactory`]. Replies are interpreted
//! by [`parser::parse`]; errors are classified once by a
//! [`QuotaSignatureMatcher`]. Only quota exhaustion and replies without text
//! move a request to the next tier. Every call returns a [`GenerationResult`]
//! that can be displayed as-is.

pub mod backend;
pub mod classify;
pub mod gemini_backend;
pub(crate) mod http_client;
pub mod orchestrator;
pub mod parser;
pub mod registry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use backend::{BackendFactory, GenerationBackend};
pub use blackbox_config::CostClass;
pub use blackbox_utils::error::GenerationError;
pub use classify::{FailureClass, QuotaSignatureMatcher};
pub use gemini_backend::{GeminiBackend, GeminiBackendFactory};
pub use orchestrator::{GenerationOrchestrator, Ready};
pub use parser::{GenerationOutcome, parse};
pub use registry::ModelTierRegistry;
pub use types::{
    AttemptOutcome, AttemptRecord, BUILTIN_FALLBACK_TEXT, CancellationFlag, Credential, ErrorKind,
    GenerationDiagnostics, GenerationParams, GenerationRequest, GenerationResult, GenerationStatus,
    HarmCategory, ModelTier, SafetyPolicy, SafetySetting,
};
