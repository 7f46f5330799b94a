//! Gemini `generateContent` HTTP backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use blackbox_config::Config;
use blackbox_utils::error::GenerationError;

use crate::backend::{BackendFactory, GenerationBackend};
use crate::http_client::HttpClient;
use crate::types::{Credential, GenerationParams, GenerationRequest, ModelTier, SafetySetting};

const PROVIDER: &str = "gemini";

pub struct GeminiBackend {
    client: HttpClient,
    endpoint: String,
    model: String,
    credential: Credential,
    timeout: Duration,
}

impl GeminiBackend {
    /// # Errors
    ///
    /// Returns `GenerationError::Misconfiguration` if the model id cannot form a
    /// URL path segment or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        model: &str,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        if model.is_empty() || model.contains(['/', '?', '#']) || model.contains(char::is_whitespace)
        {
            return Err(GenerationError::Misconfiguration(format!(
                "'{model}' is not a usable Gemini model id"
            )));
        }
        let endpoint = format!(
            "{}/models/{model}:generateContent",
            base_url.trim_end_matches('/')
        );
        Ok(Self {
            client: HttpClient::shared()?,
            endpoint,
            model: model.to_string(),
            credential,
            timeout,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn tier_id(&self) -> &str {
        &self.model
    }

    async fn generate_content(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            temperature = request.params().temperature,
            max_output_tokens = request.params().max_output_tokens,
            "Invoking Gemini backend"
        );

        let body = GeminiRequest::from_request(request);
        let builder = self
            .client
            .inner()
            .post(&self.endpoint)
            .header("x-goog-api-key", self.credential.expose())
            .header("content-type", "application/json")
            .json(&body);

        self.client
            .execute_json(builder, self.timeout, PROVIDER)
            .await
    }
}

/// Builds [`GeminiBackend`]s against one endpoint.
#[derive(Debug, Clone)]
pub struct GeminiBackendFactory {
    base_url: String,
    timeout: Duration,
}

impl GeminiBackendFactory {
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.generation.base_url.clone(), config.attempt_timeout())
    }
}

impl BackendFactory for GeminiBackendFactory {
    fn create(
        &self,
        tier: &ModelTier,
        credential: &Credential,
    ) -> Result<Arc<dyn GenerationBackend>, GenerationError> {
        let backend = GeminiBackend::new(&self.base_url, tier.id(), credential.clone(), self.timeout)?;
        Ok(Arc::new(backend))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl From<&GenerationParams> for GeminiGenerationConfig {
    fn from(params: &GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            max_output_tokens: params.max_output_tokens,
        }
    }
}

impl<'a> GeminiRequest<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart {
                    text: request.prompt(),
                }],
            }],
            generation_config: request.params().into(),
            safety_settings: request.safety().settings(),
        }
    }
}
