//! Benchmark reports and their on-disk artifacts.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::dispatcher::DispatchOutcome;
use crate::domain::{
    Candidate, CandidateStatus, EngineError, Issue, Query, RefinementRecord, Result,
};
use crate::ranker;
use crate::scoring::{ScoreBreakdown, ScoringWeights};

const ARTIFACT_FILE: &str = "benchmark.json";
const DIGEST_FILE: &str = "benchmark.digest";

/// Full detail for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub model: String,
    /// 1-based position in the ranking; `None` for failed candidates.
    pub rank: Option<usize>,
    pub status: CandidateStatus,
    pub failure: Option<String>,
    pub code: String,
    pub duration_ms: u64,
    pub length: usize,
    pub rounds: u32,
    pub truncated: bool,
    pub score: Option<ScoreBreakdown>,
    pub error_count: Option<usize>,
    pub issues: Vec<Issue>,
    pub refinements: Vec<RefinementRecord>,
}

impl CandidateReport {
    fn from_candidate(candidate: &Candidate, rank: Option<usize>) -> Self {
        Self {
            model: candidate.model.clone(),
            rank,
            status: candidate.status,
            failure: candidate.failure.as_ref().map(|f| f.to_string()),
            code: candidate.generation.text.clone(),
            duration_ms: candidate.generation.duration_ms,
            length: candidate.generation.length,
            rounds: candidate.generation.rounds,
            truncated: candidate.generation.truncated,
            score: candidate.score,
            error_count: candidate.error_count(),
            issues: candidate
                .report
                .as_ref()
                .map(|r| r.issues().to_vec())
                .unwrap_or_default(),
            refinements: candidate.refinements.clone(),
        }
    }
}

/// Every candidate of one query, best first, failed ones last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub query_id: String,
    pub query: String,
    pub generated_at: DateTime<Utc>,
    pub models_configured: usize,
    pub models_terminal: usize,
    pub best_model: Option<String>,
    pub max_iterations: u32,
    pub weights: ScoringWeights,
    pub results: Vec<CandidateReport>,
}

impl BenchmarkReport {
    pub fn from_outcome(
        query: &Query,
        outcome: &DispatchOutcome,
        weights: ScoringWeights,
        max_iterations: u32,
    ) -> Self {
        let ranked = ranker::rank(&outcome.candidates);
        let mut results: Vec<CandidateReport> = ranked
            .iter()
            .enumerate()
            .map(|(i, c)| CandidateReport::from_candidate(c, Some(i + 1)))
            .collect();
        results.extend(
            outcome
                .candidates
                .iter()
                .filter(|c| c.is_failed())
                .map(|c| CandidateReport::from_candidate(c, None)),
        );

        Self {
            query_id: query.id.to_string(),
            query: query.text.clone(),
            generated_at: Utc::now(),
            models_configured: outcome.configured,
            models_terminal: outcome.terminal,
            best_model: ranked.first().map(|c| c.model.clone()),
            max_iterations,
            weights,
            results,
        }
    }

    pub fn winner(&self) -> Option<&CandidateReport> {
        self.results.first().filter(|r| r.rank == Some(1))
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Persist `<dir>/<query_id>/benchmark.json` and `<dir>/<query_id>/benchmark.digest`.
pub fn write_benchmark_artifact(report: &BenchmarkReport, dir: &Path) -> Result<PathBuf> {
    let query_dir = dir.join(&report.query_id);
    std::fs::create_dir_all(&query_dir)?;

    let artifact_path = query_dir.join(ARTIFACT_FILE);
    let json = serde_json::to_vec_pretty(report)?;
    std::fs::write(&artifact_path, &json)?;
    std::fs::write(query_dir.join(DIGEST_FILE), sha256_hex(&json).as_bytes())?;

    Ok(artifact_path)
}

/// Read and verify `<dir>/<query_id>/benchmark.json` integrity.
pub fn read_benchmark_artifact(query_id: &str, dir: &Path) -> Result<BenchmarkReport> {
    let query_dir = dir.join(query_id);
    let json = std::fs::read(query_dir.join(ARTIFACT_FILE))?;
    let expected = std::fs::read_to_string(query_dir.join(DIGEST_FILE))?;
    let actual = sha256_hex(&json);
    if expected.trim() != actual {
        return Err(EngineError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContextBundle, DiagnosticReport, FailureReason, GenerationResult};
    use std::time::Duration;

    fn outcome() -> DispatchOutcome {
        let good = Candidate {
            model: "good".into(),
            priority: 1,
            generation: GenerationResult::succeeded(
                "package main".into(),
                Duration::from_secs(2),
                1,
                false,
            ),
            report: Some(DiagnosticReport::clean()),
            score: Some(ScoreBreakdown {
                quality: 1.0,
                speed: 0.9,
                completeness: 0.1,
                combined: 0.81,
            }),
            refinements: Vec::new(),
            status: CandidateStatus::Clean,
            failure: None,
        };
        let down = Candidate::failed(
            "down",
            0,
            GenerationResult::failed("503", Duration::from_millis(5)),
            FailureReason::Generation {
                message: "503".into(),
            },
        );
        DispatchOutcome {
            candidates: vec![down, good],
            configured: 2,
            terminal: 2,
        }
    }

    fn report() -> BenchmarkReport {
        let query = Query::new("write main", ContextBundle::default());
        BenchmarkReport::from_outcome(&query, &outcome(), ScoringWeights::default(), 3)
    }

    #[test]
    fn test_failed_candidates_are_annotated_not_omitted() {
        let report = report();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.best_model.as_deref(), Some("good"));
        assert_eq!(report.winner().map(|w| w.model.as_str()), Some("good"));

        let down = &report.results[1];
        assert_eq!(down.status, CandidateStatus::Failed);
        assert!(down.rank.is_none());
        assert!(down.failure.as_deref().unwrap_or_default().contains("503"));
    }

    #[test]
    fn test_artifact_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = report();
        let path = write_benchmark_artifact(&report, dir.path()).expect("write");
        assert!(path.ends_with("benchmark.json"));

        let loaded =
            read_benchmark_artifact(&report.query_id, dir.path()).expect("read");
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_tampered_artifact_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = report();
        let path = write_benchmark_artifact(&report, dir.path()).expect("write");

        let mut json = std::fs::read_to_string(&path).expect("read json");
        json = json.replace("write main", "write evil");
        std::fs::write(&path, json).expect("tamper");

        let err =
            read_benchmark_artifact(&report.query_id, dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::DigestMismatch { .. }));
    }
}
