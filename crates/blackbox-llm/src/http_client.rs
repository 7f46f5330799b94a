//! Shared HTTP client for the generation service.
//!
//! One `reqwest::Client` per process, reused by every tier backend. A request
//! is sent exactly once; moving on after a failure is the cascade's decision.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use blackbox_error_redaction::redact_error_message_for_logging;
use blackbox_utils::error::GenerationError;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body excerpt kept in an error message.
const BODY_EXCERPT_CHARS: usize = 512;

static SHARED_CLIENT: OnceCell<Arc<Client>> = OnceCell::new();

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Handle to the process-wide client, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Misconfiguration` if the client cannot be built.
    pub fn shared() -> Result<Self, GenerationError> {
        let client = SHARED_CLIENT.get_or_try_init(|| {
            Client::builder()
                .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(10)
                .build()
                .map(Arc::new)
                .map_err(|e| {
                    GenerationError::Misconfiguration(format!("Failed to build HTTP client: {e}"))
                })
        })?;
        Ok(Self {
            client: Arc::clone(client),
        })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Execute once and return the JSON body of a 2xx reply.
    ///
    /// - 401/403 → `ProviderAuth`
    /// - 429 → `ProviderQuota`
    /// - other 4xx → `Transport`, carrying a body excerpt
    /// - 5xx → `ProviderOutage`, carrying a body excerpt
    /// - client timeout → `Timeout`
    pub async fn execute_json(
        &self,
        request_builder: reqwest::RequestBuilder,
        timeout: Duration,
        provider_name: &str,
    ) -> Result<Value, GenerationError> {
        let request = request_builder
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(format!("Failed to build request: {e}")))?;

        debug!(
            provider = provider_name,
            timeout_secs = timeout.as_secs(),
            "Executing HTTP request"
        );

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| map_send_error(&e, timeout, provider_name))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let excerpt = body_excerpt(response).await;
            return Err(map_status_error(status, provider_name, &excerpt));
        }

        response.json::<Value>().await.map_err(|e| {
            GenerationError::Transport(format!(
                "{provider_name} returned an unreadable body: {}",
                redact_error_message_for_logging(&e.to_string())
            ))
        })
    }
}

fn map_send_error(error: &reqwest::Error, timeout: Duration, provider_name: &str) -> GenerationError {
    if error.is_timeout() {
        return GenerationError::Timeout { duration: timeout };
    }
    GenerationError::Transport(format!(
        "{provider_name} request failed: {}",
        redact_error_message_for_logging(&error.to_string())
    ))
}

async fn body_excerpt(response: Response) -> String {
    match response.text().await {
        Ok(body) => {
            let excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
            redact_error_message_for_logging(excerpt.trim())
        }
        Err(_) => String::new(),
    }
}

/// Map an error status to a `GenerationError`.
pub(crate) fn map_status_error(status: StatusCode, provider_name: &str, body: &str) -> GenerationError {
    let detail = if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::ProviderAuth(format!(
            "{provider_name} authentication failed: {status}{detail}"
        )),
        StatusCode::TOO_MANY_REQUESTS => GenerationError::ProviderQuota(format!(
            "{provider_name} rate limit exceeded: {status}{detail}"
        )),
        s if s.is_server_error() => GenerationError::ProviderOutage(format!(
            "{provider_name} returned server error: {status}{detail}"
        )),
        _ => GenerationError::Transport(format!(
            "{provider_name} returned client error: {status}{detail}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_client_is_reused() {
        let first = HttpClient::shared().unwrap();
        let second = HttpClient::shared().unwrap();
        assert!(Arc::ptr_eq(&first.client, &second.client));
    }

    #[test]
    fn test_map_401_and_403_to_provider_auth() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            match map_status_error(status, "gemini", "") {
                GenerationError::ProviderAuth(msg) => {
                    assert!(msg.contains("gemini"));
                    assert!(msg.contains(status.as_str()));
                }
                other => panic!("Expected ProviderAuth for {status}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_map_429_to_provider_quota() {
        let error = map_status_error(StatusCode::TOO_MANY_REQUESTS, "gemini", "");
        assert!(matches!(error, GenerationError::ProviderQuota(ref msg) if msg.contains("429")));
    }

    #[test]
    fn test_map_other_4xx_keeps_body() {
        let error = map_status_error(
            StatusCode::BAD_REQUEST,
            "gemini",
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#,
        );
        match error {
            GenerationError::Transport(msg) => {
                assert!(msg.contains("400"));
                assert!(msg.contains("RESOURCE_EXHAUSTED"));
            }
            other => panic!("Expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn test_map_5xx_to_outage() {
        let error = map_status_error(StatusCode::SERVICE_UNAVAILABLE, "gemini", "overloaded");
        assert!(matches!(error, GenerationError::ProviderOutage(ref msg) if msg.contains("overloaded")));
    }
}
