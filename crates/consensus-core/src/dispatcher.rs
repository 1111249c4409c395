//! Fan-out of one query to every configured model.
//!
//! Each model gets its own task running a full candidate pipeline. A slow,
//! failing or panicking candidate never cancels its siblings; anything still
//! running at the overall deadline is aborted and reported as `Failed`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::Instrument;

use crate::domain::{Candidate, FailureReason, GenerationResult, ModelSpec, Query};
use crate::metrics::METRICS;
use crate::obs;
use crate::pipeline::{run_candidate, PipelineContext};

/// Limits for one dispatch.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Worker slots; the engine sizes this to the roster.
    pub max_concurrent: usize,
    pub candidate_timeout: Duration,
    pub query_timeout: Duration,
}

/// Every candidate, in roster order, plus how many reached a terminal
/// state on their own.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub candidates: Vec<Candidate>,
    pub configured: usize,
    /// Candidates whose pipeline finished (successfully or not) instead of
    /// being abandoned on a deadline or a crash.
    pub terminal: usize,
}

fn abandoned(
    spec: &ModelSpec,
    priority: usize,
    reason: FailureReason,
    elapsed: Duration,
) -> Candidate {
    METRICS.inc_candidates_abandoned();
    obs::emit_candidate_abandoned(&spec.id, &reason);
    Candidate::failed(
        spec.id.clone(),
        priority,
        GenerationResult::failed(reason.to_string(), elapsed),
        reason,
    )
}

/// Run one candidate pipeline per spec concurrently and collect them all.
pub async fn dispatch(
    ctx: &PipelineContext,
    query: Arc<Query>,
    specs: &[ModelSpec],
    config: &DispatchConfig,
) -> DispatchOutcome {
    let started = Instant::now();
    let deadline = started + config.query_timeout;
    let sem = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

    let mut tasks = Vec::with_capacity(specs.len());
    for (priority, spec) in specs.iter().enumerate() {
        let ctx = ctx.clone();
        let query = Arc::clone(&query);
        let spec = spec.clone();
        let sem = Arc::clone(&sem);
        let limit = config.candidate_timeout;
        let span = obs::candidate_span(&spec.id);

        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire_owned().await.ok();
                let begun = Instant::now();
                let pipeline = run_candidate(&ctx, &spec, priority, &query);
                match tokio::time::timeout(limit, pipeline).await {
                    Ok(candidate) => (candidate, true),
                    Err(_elapsed) => {
                        let reason = FailureReason::Timeout {
                            limit_ms: limit.as_millis() as u64,
                        };
                        (abandoned(&spec, priority, reason, begun.elapsed()), false)
                    }
                }
            }
            .instrument(span),
        );
        tasks.push(task);
    }

    let mut candidates = Vec::with_capacity(specs.len());
    let mut terminal = 0;
    for ((priority, spec), mut task) in specs.iter().enumerate().zip(tasks) {
        let candidate = match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(Ok((candidate, finished))) => {
                if finished {
                    terminal += 1;
                }
                candidate
            }
            Ok(Err(join_err)) => {
                let reason = FailureReason::Aborted {
                    message: join_err.to_string(),
                };
                abandoned(spec, priority, reason, started.elapsed())
            }
            Err(_deadline) => {
                task.abort();
                let reason = FailureReason::Timeout {
                    limit_ms: config.query_timeout.as_millis() as u64,
                };
                abandoned(spec, priority, reason, started.elapsed())
            }
        };
        candidates.push(candidate);
    }

    DispatchOutcome {
        candidates,
        configured: specs.len(),
        terminal,
    }
}
