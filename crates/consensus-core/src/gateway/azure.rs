//! Client for first-party Azure OpenAI deployments.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use super::error::{ProviderError, ProviderResult};
use super::wire::{post_chat, WireRequest};
use super::{ChatCompletion, ChatRequest, ModelClient};
use crate::domain::ModelSpec;

/// Fallback when a spec carries no API version.
pub const DEFAULT_API_VERSION: &str = "2024-08-01-preview";

/// Speaks the deployment-scoped chat completions route with an `api-key`
/// header. The deployment selects the model, so none is sent in the body.
pub struct AzureOpenAiClient {
    client: reqwest::Client,
    url: String,
}

impl AzureOpenAiClient {
    pub fn new(spec: &ModelSpec, timeout: Duration) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&spec.api_key)
            .map_err(|_| ProviderError::ClientConfig("invalid API key format".into()))?;
        headers.insert("api-key", key);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ProviderError::ClientConfig(format!("failed to create HTTP client: {e}"))
            })?;

        let api_version = spec.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION);
        Ok(Self {
            client,
            url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                spec.endpoint.trim_end_matches('/'),
                spec.deployment,
                api_version
            ),
        })
    }
}

#[async_trait]
impl ModelClient for AzureOpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> ProviderResult<ChatCompletion> {
        let body = WireRequest::new(request, None);
        post_chat(&self.client, &self.url, &body).await
    }
}
