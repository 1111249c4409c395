//! Engine facade: best-of and benchmark modes over one dispatch.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::config::EngineConfig;
use crate::dispatcher::{dispatch, DispatchConfig, DispatchOutcome};
use crate::domain::{CandidateStatus, ContextBundle, Query, Result};
use crate::gateway::ModelPool;
use crate::metrics::METRICS;
use crate::obs;
use crate::pipeline::PipelineContext;
use crate::ranker;
use crate::reporting::BenchmarkReport;
use crate::verifier::{BoundedVerifier, LintConfig, LintVerifier, Verifier};

/// Source of prompt context for a query.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Implementations report failures as `EngineError::Retrieval`.
    async fn retrieve(&self, query: &str) -> Result<ContextBundle>;
}

/// Serves the same bundle for every query.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    bundle: ContextBundle,
}

impl StaticRetriever {
    pub fn new(bundle: ContextBundle) -> Self {
        Self { bundle }
    }
}

#[async_trait]
impl ContextRetriever for StaticRetriever {
    async fn retrieve(&self, _query: &str) -> Result<ContextBundle> {
        Ok(self.bundle.clone())
    }
}

/// Winner of a best-of run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestOfResponse {
    pub query_id: String,
    pub model: String,
    pub code: String,
    pub status: CandidateStatus,
    /// At least one refinement iteration ran for the winner.
    pub refined: bool,
    pub iterations: usize,
    pub error_count: usize,
    pub combined: f64,
    pub models_configured: usize,
    pub models_terminal: usize,
}

pub struct ConsensusEngine {
    config: EngineConfig,
    pool: Arc<ModelPool>,
    verifier: Arc<dyn Verifier>,
    retriever: Arc<dyn ContextRetriever>,
}

impl ConsensusEngine {
    /// Engine with real HTTP clients, the default lint verifier and no
    /// retrieval context.
    pub fn new(config: EngineConfig) -> Self {
        let pool = ModelPool::from_specs(&config.models, config.generation_timeout);
        let lint = LintVerifier::new(LintConfig::default().with_timeout(config.verifier_timeout));
        let verifier = BoundedVerifier::new(Arc::new(lint), config.verifier_concurrency);
        Self {
            pool: Arc::new(pool),
            verifier: Arc::new(verifier),
            retriever: Arc::new(StaticRetriever::default()),
            config,
        }
    }

    pub fn with_pool(mut self, pool: ModelPool) -> Self {
        self.pool = Arc::new(pool);
        self
    }

    /// Replace the verifier; the concurrency cap still applies.
    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = Arc::new(BoundedVerifier::new(verifier, self.config.verifier_concurrency));
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn ContextRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn run(&self, text: &str) -> Result<(Query, DispatchOutcome)> {
        let context = self.retriever.retrieve(text).await?;
        let query = Arc::new(Query::new(text, context));
        let query_id = query.id.to_string();
        METRICS.inc_queries();

        let ctx = PipelineContext {
            pool: Arc::clone(&self.pool),
            verifier: Arc::clone(&self.verifier),
            weights: self.config.weights,
            max_iterations: self.config.max_iterations,
        };
        let dispatch_config = DispatchConfig {
            max_concurrent: self.config.models.len(),
            candidate_timeout: self.config.candidate_timeout,
            query_timeout: self.config.query_timeout,
        };

        let started = Instant::now();
        obs::emit_query_started(&query_id, self.config.models.len(), self.config.max_iterations);
        let outcome = dispatch(&ctx, Arc::clone(&query), &self.config.models, &dispatch_config)
            .instrument(obs::query_span(&query_id))
            .await;

        let winner = ranker::rank(&outcome.candidates)
            .first()
            .map(|c| c.model.clone());
        obs::emit_query_finished(
            &query_id,
            outcome.configured,
            outcome.terminal,
            winner.as_deref(),
            started.elapsed().as_millis() as u64,
        );
        METRICS.flush();

        let query = Arc::try_unwrap(query)
            .unwrap_or_else(|shared| (*shared).clone());
        Ok((query, outcome))
    }

    /// Run every model, refine each candidate, and return only the winner.
    pub async fn best_of(&self, text: &str) -> Result<BestOfResponse> {
        let (query, outcome) = self.run(text).await?;
        let winner = ranker::select(&outcome.candidates)?;

        Ok(BestOfResponse {
            query_id: query.id.to_string(),
            model: winner.model.clone(),
            code: winner.generation.text.clone(),
            status: winner.status,
            refined: !winner.refinements.is_empty(),
            iterations: winner.refinements.len(),
            error_count: winner.error_count().unwrap_or_default(),
            combined: winner.combined().unwrap_or_default(),
            models_configured: outcome.configured,
            models_terminal: outcome.terminal,
        })
    }

    /// Same flow as [`best_of`](Self::best_of), but report every candidate.
    /// Candidate failures are annotated in the report, never returned as errors.
    pub async fn benchmark(&self, text: &str) -> Result<BenchmarkReport> {
        let (query, outcome) = self.run(text).await?;
        Ok(BenchmarkReport::from_outcome(
            &query,
            &outcome,
            self.config.weights,
            self.config.max_iterations,
        ))
    }
}
