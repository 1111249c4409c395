//! Candidate aggregate: one model's full attempt for one query.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::diagnostic::DiagnosticReport;
use crate::scoring::ScoreBreakdown;

/// One model's raw output for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Extracted code (empty on failure).
    pub text: String,
    /// Wall-clock time of the generation call, continuation rounds included.
    pub duration_ms: u64,
    /// Length of `text` in characters.
    pub length: usize,
    pub success: bool,
    /// Number of backend round-trips used (continuations count).
    pub rounds: u32,
    /// The backend was still truncating when the round budget ran out.
    pub truncated: bool,
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn succeeded(text: String, duration: Duration, rounds: u32, truncated: bool) -> Self {
        let length = text.chars().count();
        Self {
            text,
            duration_ms: duration.as_millis() as u64,
            length,
            success: true,
            rounds,
            truncated,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, duration: Duration) -> Self {
        Self {
            text: String::new(),
            duration_ms: duration.as_millis() as u64,
            length: 0,
            success: false,
            rounds: 0,
            truncated: false,
            error: Some(error.into()),
        }
    }
}

/// Per-iteration refinement trace entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementRecord {
    /// 1-based iteration index.
    pub iteration: u32,
    pub errors_before: usize,
    pub errors_after: usize,
    pub improved: bool,
    /// The patch request itself failed; the previous code was kept.
    pub generation_failed: bool,
}

/// Terminal state of a candidate pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    /// Zero errors on the first verification.
    Clean,
    /// Errors fixed within the iteration budget.
    RefinedClean,
    /// Budget exhausted with errors remaining; the last attempt is kept.
    BestEffort,
    /// No usable text from the initial generation, or abandoned.
    Failed,
}

/// Why a candidate ended up `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    /// The backend could not produce usable text.
    Generation { message: String },
    /// The per-candidate or overall deadline elapsed first.
    Timeout { limit_ms: u64 },
    /// The pipeline task died unexpectedly.
    Aborted { message: String },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Generation { message } => write!(f, "generation failed: {message}"),
            FailureReason::Timeout { limit_ms } => write!(f, "timed out after {limit_ms}ms"),
            FailureReason::Aborted { message } => write!(f, "pipeline aborted: {message}"),
        }
    }
}

/// Aggregate root for one model across the full pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub model: String,
    /// Position in the configured roster; lower wins ties.
    pub priority: usize,
    pub generation: GenerationResult,
    pub report: Option<DiagnosticReport>,
    pub score: Option<ScoreBreakdown>,
    pub refinements: Vec<RefinementRecord>,
    pub status: CandidateStatus,
    pub failure: Option<FailureReason>,
}

impl Candidate {
    pub fn failed(
        model: impl Into<String>,
        priority: usize,
        generation: GenerationResult,
        reason: FailureReason,
    ) -> Self {
        Self {
            model: model.into(),
            priority,
            generation,
            report: None,
            score: None,
            refinements: Vec::new(),
            status: CandidateStatus::Failed,
            failure: Some(reason),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == CandidateStatus::Failed
    }

    pub fn error_count(&self) -> Option<usize> {
        self.report.as_ref().map(DiagnosticReport::error_count)
    }

    pub fn combined(&self) -> Option<f64> {
        self.score.as_ref().map(|s| s.combined)
    }

    pub fn code(&self) -> &str {
        &self.generation.text
    }
}
