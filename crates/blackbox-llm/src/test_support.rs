//! Scripted backends for exercising the cascade without a network.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use blackbox_utils::error::GenerationError;

use crate::backend::{BackendFactory, GenerationBackend};
use crate::types::{Credential, GenerationRequest, ModelTier};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Returned as the raw reply body.
    Json(Value),
    Error(GenerationError),
    /// Never completes; used to trip the per-attempt timeout.
    Hang,
}

impl ScriptedReply {
    /// A well-formed candidate reply carrying `text`.
    pub fn text(text: &str) -> Self {
        Self::Json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        }))
    }

    pub fn quota() -> Self {
        Self::Error(GenerationError::ProviderQuota(
            "429 Too Many Requests: RESOURCE_EXHAUSTED".to_string(),
        ))
    }
}

#[derive(Default)]
struct Script {
    replies: HashMap<String, VecDeque<ScriptedReply>>,
    failing: HashSet<String>,
    calls: Vec<String>,
    constructions: Vec<String>,
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Factory whose backends replay per-tier scripts.
///
/// Each tier's replies are consumed front to back; the last one repeats.
/// Tiers without a script fail with a transport error.
#[derive(Default)]
pub struct ScriptedFactory {
    script: Arc<Mutex<Script>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(self, tier: &str, replies: Vec<ScriptedReply>) -> Self {
        lock(&self.script)
            .replies
            .insert(tier.to_string(), replies.into());
        self
    }

    pub fn with_reply(self, tier: &str, reply: ScriptedReply) -> Self {
        self.with_replies(tier, vec![reply])
    }

    pub fn with_text(self, tier: &str, text: &str) -> Self {
        self.with_reply(tier, ScriptedReply::text(text))
    }

    pub fn with_quota(self, tier: &str) -> Self {
        self.with_reply(tier, ScriptedReply::quota())
    }

    /// Constructing a client for `tier` fails.
    pub fn with_construction_failure(self, tier: &str) -> Self {
        lock(&self.script).failing.insert(tier.to_string());
        self
    }

    /// Tier ids in the order `generate_content` was called.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.script).calls.clone()
    }

    /// Tier ids in the order clients were constructed.
    pub fn constructions(&self) -> Vec<String> {
        lock(&self.script).constructions.clone()
    }
}

impl BackendFactory for ScriptedFactory {
    fn create(
        &self,
        tier: &ModelTier,
        _credential: &Credential,
    ) -> Result<Arc<dyn GenerationBackend>, GenerationError> {
        let mut script = lock(&self.script);
        if script.failing.contains(tier.id()) {
            return Err(GenerationError::Misconfiguration(format!(
                "scripted construction failure for {}",
                tier.id()
            )));
        }
        script.constructions.push(tier.id().to_string());
        Ok(Arc::new(ScriptedBackend {
            tier: tier.id().to_string(),
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedBackend {
    tier: String,
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    fn next_reply(&self) -> ScriptedReply {
        let mut script = lock(&self.script);
        script.calls.push(self.tier.clone());
        match script.replies.get_mut(&self.tier) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| ScriptedReply::Json(Value::Null)),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| ScriptedReply::Json(Value::Null)),
            None => ScriptedReply::Error(GenerationError::Transport(format!(
                "no scripted reply for {}",
                self.tier
            ))),
        }
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn tier_id(&self) -> &str {
        &self.tier
    }

    async fn generate_content(&self, _request: &GenerationRequest) -> Result<Value, GenerationError> {
        match self.next_reply() {
            ScriptedReply::Json(value) => Ok(value),
            ScriptedReply::Error(error) => Err(error),
            ScriptedReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GenerationError::Transport("scripted hang elapsed".to_string()))
            }
        }
    }
}
