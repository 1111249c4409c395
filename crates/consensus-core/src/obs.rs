//! Structured observability hooks for query lifecycle events.
//!
//! This module provides:
//! - Query- and candidate-scoped [`tracing::Span`]s for `.instrument()`
//! - Emission functions for key lifecycle events: query start, generation,
//!   verification, refinement, candidate finish, query finish
//!
//! Events are emitted at `info!` level; abandoned candidates at `warn!`.

use tracing::{info, warn};

use crate::domain::CandidateStatus;

pub fn query_span(query_id: &str) -> tracing::Span {
    tracing::info_span!("consensus.query", query_id = %query_id)
}

pub fn candidate_span(model: &str) -> tracing::Span {
    tracing::info_span!("consensus.candidate", model = %model)
}

pub fn emit_query_started(query_id: &str, models: usize, max_iterations: u32) {
    info!(
        event = "query.started",
        query_id = %query_id,
        models = models,
        max_iterations = max_iterations,
    );
}

pub fn emit_candidate_generated(model: &str, success: bool, duration_ms: u64, length: usize) {
    info!(
        event = "candidate.generated",
        model = %model,
        success = success,
        duration_ms = duration_ms,
        length = length,
    );
}

pub fn emit_candidate_verified(model: &str, error_count: usize, verifier_unavailable: bool) {
    info!(
        event = "candidate.verified",
        model = %model,
        error_count = error_count,
        verifier_unavailable = verifier_unavailable,
    );
}

pub fn emit_refinement_iteration(model: &str, iteration: u32, before: usize, after: usize) {
    info!(
        event = "candidate.refined",
        model = %model,
        iteration = iteration,
        errors_before = before,
        errors_after = after,
        improved = after < before,
    );
}

pub fn emit_candidate_finished(model: &str, status: CandidateStatus, combined: Option<f64>) {
    info!(
        event = "candidate.finished",
        model = %model,
        status = ?status,
        combined = combined.unwrap_or(0.0),
    );
}

/// Candidate abandoned because a deadline elapsed or its task died (warning level).
pub fn emit_candidate_abandoned(model: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "candidate.abandoned", model = %model, reason = %reason);
}

pub fn emit_query_finished(
    query_id: &str,
    configured: usize,
    terminal: usize,
    winner: Option<&str>,
    duration_ms: u64,
) {
    info!(
        event = "query.finished",
        query_id = %query_id,
        models_configured = configured,
        models_terminal = terminal,
        winner = winner.unwrap_or("none"),
        duration_ms = duration_ms,
    );
}
