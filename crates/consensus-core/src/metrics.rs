//! Global atomic counters for engine observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a query).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations, no locking.
pub struct Metrics {
    queries: AtomicU64,
    generation_calls: AtomicU64,
    generation_failures: AtomicU64,
    verifier_invocations: AtomicU64,
    verifier_failures: AtomicU64,
    refinement_iterations: AtomicU64,
    candidates_abandoned: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! counter {
    ($inc:ident, $get:ident, $field:ident) => {
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(metric = stringify!($field), "counter incremented");
        }

        pub fn $get(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            queries: AtomicU64::new(0),
            generation_calls: AtomicU64::new(0),
            generation_failures: AtomicU64::new(0),
            verifier_invocations: AtomicU64::new(0),
            verifier_failures: AtomicU64::new(0),
            refinement_iterations: AtomicU64::new(0),
            candidates_abandoned: AtomicU64::new(0),
        }
    }

    counter!(inc_queries, queries, queries);
    counter!(inc_generation_calls, generation_calls, generation_calls);
    counter!(inc_generation_failures, generation_failures, generation_failures);
    counter!(inc_verifier_invocations, verifier_invocations, verifier_invocations);
    counter!(inc_verifier_failures, verifier_failures, verifier_failures);
    counter!(inc_refinement_iterations, refinement_iterations, refinement_iterations);
    counter!(inc_candidates_abandoned, candidates_abandoned, candidates_abandoned);

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            queries = self.queries(),
            generation_calls = self.generation_calls(),
            generation_failures = self.generation_failures(),
            verifier_invocations = self.verifier_invocations(),
            verifier_failures = self.verifier_failures(),
            refinement_iterations = self.refinement_iterations(),
            candidates_abandoned = self.candidates_abandoned(),
        );
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.queries,
            &self.generation_calls,
            &self.generation_failures,
            &self.verifier_invocations,
            &self.verifier_failures,
            &self.refinement_iterations,
            &self.candidates_abandoned,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
