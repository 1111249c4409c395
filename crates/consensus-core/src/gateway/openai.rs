//! Client for OpenAI-compatible chat completion gateways.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use super::error::{ProviderError, ProviderResult};
use super::wire::{post_chat, WireRequest};
use super::{ChatCompletion, ChatRequest, ModelClient};
use crate::domain::ModelSpec;

/// Speaks `POST {endpoint}/chat/completions` with bearer auth.
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(spec: &ModelSpec, timeout: Duration) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Bearer {}", spec.api_key))
            .map_err(|_| ProviderError::ClientConfig("invalid API key format".into()))?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ProviderError::ClientConfig(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", spec.endpoint.trim_end_matches('/')),
            model: spec.deployment.clone(),
        })
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &ChatRequest) -> ProviderResult<ChatCompletion> {
        let body = WireRequest::new(request, Some(&self.model));
        post_chat(&self.client, &self.url, &body).await
    }
}
