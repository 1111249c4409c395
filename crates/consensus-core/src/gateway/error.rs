//! Error types for model backends.

use thiserror::Error;

/// Errors that can occur when calling a model backend.
///
/// The pool always folds these into a failed `GenerationResult`; they never
/// abort a batch.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, TLS or request-building failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response could not be decoded as a chat completion.
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// Response decoded but carried no choices or no text.
    #[error("backend returned an empty completion")]
    EmptyCompletion,

    #[error("generation timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    /// The client could not be constructed for this model.
    #[error("client configuration error: {0}")]
    ClientConfig(String),
}

impl ProviderError {
    /// Rate limits and server-side faults; used only for log levels.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Transport(_) | ProviderError::Timeout { .. } => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::MalformedBody(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Result type for backend calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
