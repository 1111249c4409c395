//! Domain models for the consensus engine.
//!
//! Canonical definitions for the core entities:
//! - `Query` / `ContextBundle`: immutable request input
//! - `ModelSpec`: one configured backend model
//! - `DiagnosticReport`: verifier output for a code sample
//! - `Candidate`: one model's attempt lifecycle and its refinement trace

pub mod candidate;
pub mod diagnostic;
pub mod error;
pub mod model_spec;
pub mod query;

pub use candidate::{Candidate, CandidateStatus, FailureReason, GenerationResult, RefinementRecord};
pub use diagnostic::{DiagnosticReport, Issue, ReportOrigin, Severity};
pub use error::{ConfigError, EngineError, Result};
pub use model_spec::{BackendKind, GenerationParams, ModelSpec};
pub use query::{ContextBundle, Query, Snippet, SnippetKind};
