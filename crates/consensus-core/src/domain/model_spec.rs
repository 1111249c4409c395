//! Static model roster entries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend family a model is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// First-party Azure OpenAI deployment.
    AzureOpenai,
    /// Any endpoint speaking the OpenAI chat completions protocol.
    OpenaiCompatible,
}

impl BackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "azure_openai" => Some(Self::AzureOpenai),
            "openai_compatible" => Some(Self::OpenaiCompatible),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AzureOpenai => "azure_openai",
            Self::OpenaiCompatible => "openai_compatible",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.15,
            max_tokens: 6000,
        }
    }
}

/// One configured model.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Display name; unique within a roster.
    pub id: String,
    pub kind: BackendKind,
    pub endpoint: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub deployment: String,
    pub api_version: Option<String>,
    pub params: GenerationParams,
}

impl ModelSpec {
    pub fn new(id: impl Into<String>, kind: BackendKind) -> Self {
        Self {
            id: id.into(),
            kind,
            endpoint: String::new(),
            api_key: String::new(),
            deployment: String::new(),
            api_version: None,
            params: GenerationParams::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = deployment.into();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }
}

// Keep credentials out of logs.
impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("params", &self.params)
            .finish()
    }
}
