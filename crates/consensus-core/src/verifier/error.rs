//! Error types for the verifier adapter.

/// Faults that stop the static analyzer from producing output.
///
/// Never propagated past the adapter: each one becomes a
/// `verifier_unavailable` report.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("failed to create verification workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("verifier timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("verifier command is empty")]
    EmptyCommand,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type VerifierResult<T> = std::result::Result<T, VerifierError>;
