use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use blackbox_utils::error::GenerationError;

use crate::types::{Credential, GenerationRequest, ModelTier};

/// A client bound to one model tier.
///
/// Implementations perform exactly one external call per invocation and return
/// the reply body untouched; interpreting it is the parser's job.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Identifier of the tier this client talks to.
    fn tier_id(&self) -> &str;

    /// Send `request` once.
    ///
    /// # Errors
    ///
    /// - `ProviderAuth` for rejected credentials
    /// - `ProviderQuota` for rate limiting
    /// - `ProviderOutage` for server errors
    /// - `Timeout` when the client deadline elapses
    /// - `Transport` for everything else that prevented a reply
    async fn generate_content(&self, request: &GenerationRequest) -> Result<Value, GenerationError>;
}

/// Builds tier clients. Construction happens on initialization and whenever the
/// cascade switches tiers.
pub trait BackendFactory: Send + Sync {
    /// # Errors
    ///
    /// Any error means the tier is unusable right now; the cascade skips it.
    fn create(
        &self,
        tier: &ModelTier,
        credential: &Credential,
    ) -> Result<Arc<dyn GenerationBackend>, GenerationError>;
}
