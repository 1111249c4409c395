//! Domain-level error taxonomy for the consensus engine.

/// Configuration faults detected while building an [`EngineConfig`].
///
/// Each malformed value is its own variant so callers (and operators reading
/// logs) can tell "absent" apart from "present but wrong".
///
/// [`EngineConfig`]: crate::config::EngineConfig
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("MAX_REFINEMENT_ITERATIONS is not set")]
    MissingIterationCap,

    #[error("MAX_REFINEMENT_ITERATIONS must be an integer, got {value:?}")]
    NonIntegerIterationCap { value: String },

    #[error("MAX_REFINEMENT_ITERATIONS must be positive, got {value}")]
    NegativeIterationCap { value: i64 },

    #[error("MAX_REFINEMENT_ITERATIONS must be positive, got 0")]
    ZeroIterationCap,

    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidPositiveInteger { key: String, value: String },

    #[error("query timeout ({query_secs}s) is shorter than candidate timeout ({candidate_secs}s)")]
    QueryShorterThanCandidate { candidate_secs: u64, query_secs: u64 },

    #[error("invalid scoring weights: {0}")]
    InvalidWeights(String),

    #[error("model {index} is missing required setting {key}")]
    MissingModelSetting { index: usize, key: String },

    #[error("model {index} has unknown backend type {value:?}")]
    UnknownBackend { index: usize, value: String },

    #[error("model {index} has invalid {key}: {value:?}")]
    InvalidModelSetting {
        index: usize,
        key: String,
        value: String,
    },

    #[error("no models configured (expected MODEL_1_TYPE / MODEL_1_NAME ...)")]
    NoModels,

    #[error("{count} models configured, at most {max} are supported")]
    TooManyModels { count: usize, max: usize },

    #[error("duplicate model name {0:?}")]
    DuplicateModel(String),
}

/// Errors surfaced to the request layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no usable candidate: all {configured} configured model(s) failed")]
    AllCandidatesFailed { configured: usize },

    #[error("misconfiguration: {0}")]
    Misconfiguration(#[from] ConfigError),

    #[error("context retrieval failed: {0}")]
    Retrieval(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
