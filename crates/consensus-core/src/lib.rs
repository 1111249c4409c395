//! Consensus Core Library
//!
//! Queries several code-generating models for the same request, verifies
//! every candidate with a static analyzer, repairs defects in a bounded
//! refinement loop, and selects a deterministic winner.

pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod engine;
pub mod gateway;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod prompts;
pub mod ranker;
pub mod reporting;
pub mod scoring;
pub mod telemetry;
pub mod verifier;

pub use config::{EngineConfig, MAX_ACTIVE_MODELS};

pub use domain::{
    BackendKind, Candidate, CandidateStatus, ConfigError, ContextBundle, DiagnosticReport,
    EngineError, FailureReason, GenerationParams, GenerationResult, Issue, ModelSpec, Query,
    RefinementRecord, ReportOrigin, Result, Severity, Snippet, SnippetKind,
};

pub use dispatcher::{dispatch, DispatchConfig, DispatchOutcome};
pub use engine::{BestOfResponse, ConsensusEngine, ContextRetriever, StaticRetriever};
pub use gateway::{
    AzureOpenAiClient, ChatCompletion, ChatMessage, ChatRequest, FinishReason, ModelClient,
    ModelPool, OpenAiCompatibleClient, ProviderError,
};
pub use pipeline::{run_candidate, PipelineContext};
pub use ranker::{rank, select};
pub use reporting::{
    read_benchmark_artifact, write_benchmark_artifact, BenchmarkReport, CandidateReport,
};
pub use scoring::{score, ScoreBreakdown, ScoringWeights};
pub use telemetry::init_tracing;
pub use verifier::{BoundedVerifier, LintConfig, LintVerifier, Verifier};
