//! Chat completions wire format shared by both backend kinds.

use serde::{Deserialize, Serialize};

use super::error::{ProviderError, ProviderResult};
use super::{ChatCompletion, ChatMessage, ChatRequest, FinishReason};

const TOP_P: f32 = 0.95;

/// Error bodies are truncated to this many characters.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
pub(crate) struct WireRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl<'a> WireRequest<'a> {
    pub fn new(request: &'a ChatRequest, model: Option<&'a str>) -> Self {
        Self {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            top_p: TOP_P,
            max_tokens: request.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: Option<WireMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
}

/// POST a request body and decode the first choice.
pub(crate) async fn post_chat(
    client: &reqwest::Client,
    url: &str,
    body: &WireRequest<'_>,
) -> ProviderResult<ChatCompletion> {
    let response = client.post(url).json(body).send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: text.chars().take(MAX_ERROR_BODY).collect(),
        });
    }

    parse_completion(&text)
}

pub(crate) fn parse_completion(body: &str) -> ProviderResult<ChatCompletion> {
    let parsed: WireResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedBody(e.to_string()))?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or(ProviderError::EmptyCompletion)?;
    let text = choice
        .message
        .and_then(|m| m.content)
        .filter(|t| !t.trim().is_empty())
        .ok_or(ProviderError::EmptyCompletion)?;

    Ok(ChatCompletion {
        text,
        finish_reason: FinishReason::parse(choice.finish_reason.as_deref()),
    })
}
