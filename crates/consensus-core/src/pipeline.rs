//! Per-model candidate pipeline: generate, verify, then refine until clean
//! or the iteration budget runs out.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::{
    Candidate, CandidateStatus, DiagnosticReport, FailureReason, GenerationResult, ModelSpec,
    Query, RefinementRecord,
};
use crate::gateway::{Attempt, ModelPool};
use crate::metrics::METRICS;
use crate::obs;
use crate::scoring::{score, ScoreBreakdown, ScoringWeights};
use crate::verifier::Verifier;

/// Shared, read-only collaborators for every candidate of a query.
#[derive(Clone)]
pub struct PipelineContext {
    pub pool: Arc<ModelPool>,
    pub verifier: Arc<dyn Verifier>,
    pub weights: ScoringWeights,
    /// Refinement budget; always > 0.
    pub max_iterations: u32,
}

fn rescore(
    generation: &GenerationResult,
    report: &DiagnosticReport,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    score(
        report,
        Duration::from_millis(generation.duration_ms),
        generation.length,
        weights,
    )
}

/// Drive one model's candidate to a terminal state.
///
/// Iterations are strictly sequential and bounded by `max_iterations`; an
/// iteration that fails to improve does not stop the loop.
pub async fn run_candidate(
    ctx: &PipelineContext,
    spec: &ModelSpec,
    priority: usize,
    query: &Query,
) -> Candidate {
    let mut generation = ctx.pool.generate(spec, query, Attempt::Initial).await;
    obs::emit_candidate_generated(
        &spec.id,
        generation.success,
        generation.duration_ms,
        generation.length,
    );
    if !generation.success {
        let message = generation.error.clone().unwrap_or_default();
        let candidate = Candidate::failed(
            spec.id.clone(),
            priority,
            generation,
            FailureReason::Generation { message },
        );
        obs::emit_candidate_finished(&spec.id, candidate.status, None);
        return candidate;
    }

    let mut report = ctx.verifier.verify(&generation.text).await;
    obs::emit_candidate_verified(
        &spec.id,
        report.error_count(),
        report.verifier_unavailable(),
    );

    let mut refinements: Vec<RefinementRecord> = Vec::new();

    for iteration in 1..=ctx.max_iterations {
        if report.is_clean() {
            break;
        }
        METRICS.inc_refinement_iterations();
        let errors_before = report.error_count();

        // The tool itself failed last pass: check the same code again
        // instead of asking the model to fix a verifier fault.
        if report.verifier_unavailable() {
            debug!(model = %spec.id, iteration, "re-running unavailable verifier");
            report = ctx.verifier.verify(&generation.text).await;
            let errors_after = report.error_count();
            obs::emit_refinement_iteration(&spec.id, iteration, errors_before, errors_after);
            refinements.push(RefinementRecord {
                iteration,
                errors_before,
                errors_after,
                improved: errors_after < errors_before,
                generation_failed: false,
            });
            continue;
        }

        let patch = ctx
            .pool
            .generate(
                spec,
                query,
                Attempt::Refine {
                    code: &generation.text,
                    report: &report,
                },
            )
            .await;

        if !patch.success {
            debug!(
                model = %spec.id,
                iteration,
                error = ?patch.error,
                "patch request failed, keeping current code"
            );
            obs::emit_refinement_iteration(&spec.id, iteration, errors_before, errors_before);
            refinements.push(RefinementRecord {
                iteration,
                errors_before,
                errors_after: errors_before,
                improved: false,
                generation_failed: true,
            });
            continue;
        }

        let patched_report = ctx.verifier.verify(&patch.text).await;
        let errors_after = patched_report.error_count();
        obs::emit_refinement_iteration(&spec.id, iteration, errors_before, errors_after);
        refinements.push(RefinementRecord {
            iteration,
            errors_before,
            errors_after,
            improved: errors_after < errors_before,
            generation_failed: false,
        });

        // Later attempts replace earlier ones even when they regress.
        generation = patch;
        report = patched_report;
    }

    // Any recorded iteration, re-verification included, means the candidate
    // was not clean on first inspection.
    let status = match (report.is_clean(), refinements.is_empty()) {
        (true, true) => CandidateStatus::Clean,
        (true, false) => CandidateStatus::RefinedClean,
        (false, _) => CandidateStatus::BestEffort,
    };
    let breakdown = rescore(&generation, &report, &ctx.weights);
    obs::emit_candidate_finished(&spec.id, status, Some(breakdown.combined));

    Candidate {
        model: spec.id.clone(),
        priority,
        generation,
        report: Some(report),
        score: Some(breakdown),
        refinements,
        status,
        failure: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackendKind, ContextBundle, Issue, ReportOrigin};
    use crate::gateway::{
        ChatCompletion, ChatRequest, FinishReason, ModelClient, ProviderError, ProviderResult,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns `v0`, `v1`, ... on successive calls.
    struct Versions {
        next: Mutex<u32>,
        fail_from: Option<u32>,
    }

    #[async_trait]
    impl ModelClient for Versions {
        async fn complete(&self, _request: &ChatRequest) -> ProviderResult<ChatCompletion> {
            let mut next = self.next.lock().unwrap();
            let n = *next;
            *next += 1;
            if self.fail_from.is_some_and(|f| n >= f) {
                return Err(ProviderError::Status {
                    status: 503,
                    body: "overloaded".into(),
                });
            }
            Ok(ChatCompletion {
                text: format!("package main // v{n}"),
                finish_reason: FinishReason::Stop,
            })
        }
    }

    /// Error count per version, looked up from the trailing `vN` marker.
    struct CountsByVersion(Vec<u32>);

    #[async_trait]
    impl Verifier for CountsByVersion {
        async fn verify(&self, code: &str) -> DiagnosticReport {
            let version: usize = code
                .rsplit('v')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            let errors = self.0.get(version).copied().unwrap_or(0);
            DiagnosticReport::new(
                (1..=errors).map(|l| Issue::error(Some(l), "broken")).collect(),
                ReportOrigin::Structured,
            )
        }
    }

    fn context(fail_from: Option<u32>, counts: Vec<u32>, max_iterations: u32) -> PipelineContext {
        let pool = ModelPool::new(Duration::from_secs(5)).with_client(
            "m",
            Arc::new(Versions {
                next: Mutex::new(0),
                fail_from,
            }),
        );
        PipelineContext {
            pool: Arc::new(pool),
            verifier: Arc::new(CountsByVersion(counts)),
            weights: ScoringWeights::default(),
            max_iterations,
        }
    }

    fn spec() -> ModelSpec {
        ModelSpec::new("m", BackendKind::OpenaiCompatible)
    }

    fn query() -> Query {
        Query::new("q", ContextBundle::default())
    }

    #[tokio::test]
    async fn test_clean_first_try() {
        let ctx = context(None, vec![0], 3);
        let candidate = run_candidate(&ctx, &spec(), 0, &query()).await;
        assert_eq!(candidate.status, CandidateStatus::Clean);
        assert!(candidate.refinements.is_empty());
        assert_eq!(candidate.score.map(|s| s.quality), Some(1.0));
    }

    #[tokio::test]
    async fn test_refined_to_clean() {
        let ctx = context(None, vec![5, 2, 0], 4);
        let candidate = run_candidate(&ctx, &spec(), 0, &query()).await;
        assert_eq!(candidate.status, CandidateStatus::RefinedClean);
        assert_eq!(candidate.refinements.len(), 2);
        assert_eq!(candidate.refinements[0].errors_before, 5);
        assert_eq!(candidate.refinements[0].errors_after, 2);
        assert!(candidate.refinements[1].improved);
        assert_eq!(candidate.code(), "package main // v2");
    }

    #[tokio::test]
    async fn test_never_improving_stops_at_budget() {
        let ctx = context(None, vec![5, 5, 6, 5], 3);
        let candidate = run_candidate(&ctx, &spec(), 0, &query()).await;
        assert_eq!(candidate.status, CandidateStatus::BestEffort);
        assert_eq!(candidate.refinements.len(), 3);
        assert_eq!(candidate.code(), "package main // v3");
        assert!(!candidate.refinements[1].improved);
        assert_eq!(candidate.error_count(), Some(5));
    }

    #[tokio::test]
    async fn test_failed_patch_keeps_previous_code() {
        let ctx = context(Some(1), vec![4], 2);
        let candidate = run_candidate(&ctx, &spec(), 0, &query()).await;
        assert_eq!(candidate.status, CandidateStatus::BestEffort);
        assert_eq!(candidate.code(), "package main // v0");
        assert!(candidate.refinements.iter().all(|r| r.generation_failed));
        assert_eq!(candidate.refinements.len(), 2);
    }

    #[tokio::test]
    async fn test_initial_failure_is_failed() {
        let ctx = context(Some(0), vec![0], 2);
        let candidate = run_candidate(&ctx, &spec(), 0, &query()).await;
        assert!(candidate.is_failed());
        assert!(candidate.score.is_none());
        assert!(matches!(
            candidate.failure,
            Some(FailureReason::Generation { .. })
        ));
    }

    /// Unavailable on the first call only.
    struct FlakyTool {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl Verifier for FlakyTool {
        async fn verify(&self, _code: &str) -> DiagnosticReport {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                DiagnosticReport::unavailable("go: module lookup disabled")
            } else {
                DiagnosticReport::clean()
            }
        }
    }

    #[tokio::test]
    async fn test_unavailable_verifier_is_retried_without_patch() {
        let mut ctx = context(None, vec![], 2);
        ctx.verifier = Arc::new(FlakyTool {
            calls: Mutex::new(0),
        });
        let candidate = run_candidate(&ctx, &spec(), 0, &query()).await;
        assert_eq!(candidate.status, CandidateStatus::RefinedClean);
        assert_eq!(candidate.refinements.len(), 1);
        assert!(!candidate.refinements[0].generation_failed);
        assert_eq!(candidate.refinements[0].errors_after, 0);
        assert_eq!(candidate.code(), "package main // v0");
    }
}
