//! Model backends.
//!
//! A single [`ModelClient`] capability with one implementation per
//! [`BackendKind`], and the [`ModelPool`] that turns raw completions into
//! [`GenerationResult`]s.
//!
//! [`GenerationResult`]: crate::domain::GenerationResult

pub mod azure;
pub mod error;
pub mod openai;
pub mod pool;
mod wire;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{BackendKind, GenerationParams, ModelSpec};
use crate::prompts::Prompt;

pub use azure::AzureOpenAiClient;
pub use error::{ProviderError, ProviderResult};
pub use openai::OpenAiCompatibleClient;
pub use pool::{Attempt, ModelPool, MAX_ROUNDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn from_prompt(prompt: &Prompt, params: &GenerationParams) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(prompt.system.clone()),
                ChatMessage::user(prompt.user.clone()),
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Why the backend stopped producing tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Token limit reached; the text is truncated.
    Length,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some(other) => FinishReason::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletion {
    pub text: String,
    pub finish_reason: FinishReason,
}

/// Uniform capability over heterogeneous chat backends.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> ProviderResult<ChatCompletion>;
}

/// Stands in for a client that could not be built, so the failure shows up
/// as a failed candidate at query time.
struct UnavailableClient {
    reason: String,
}

#[async_trait]
impl ModelClient for UnavailableClient {
    async fn complete(&self, _request: &ChatRequest) -> ProviderResult<ChatCompletion> {
        Err(ProviderError::ClientConfig(self.reason.clone()))
    }
}

/// Build the client matching a spec's backend kind.
pub fn client_for(spec: &ModelSpec, timeout: Duration) -> Arc<dyn ModelClient> {
    let built: ProviderResult<Arc<dyn ModelClient>> = match spec.kind {
        BackendKind::AzureOpenai => {
            AzureOpenAiClient::new(spec, timeout).map(|c| Arc::new(c) as Arc<dyn ModelClient>)
        }
        BackendKind::OpenaiCompatible => {
            OpenAiCompatibleClient::new(spec, timeout).map(|c| Arc::new(c) as Arc<dyn ModelClient>)
        }
    };
    built.unwrap_or_else(|err| {
        tracing::warn!(model = %spec.id, error = %err, "model client unavailable");
        Arc::new(UnavailableClient {
            reason: err.to_string(),
        })
    })
}
