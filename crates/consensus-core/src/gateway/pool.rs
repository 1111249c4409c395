//! Model client pool: one generation request in, one `GenerationResult` out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::error::ProviderError;
use super::{client_for, ChatRequest, FinishReason, ModelClient};
use crate::domain::{DiagnosticReport, GenerationResult, ModelSpec, Query};
use crate::metrics::METRICS;
use crate::prompts::{self, extract_code, REFINEMENT_TEMPERATURE};

/// Backend round-trips allowed per generation, continuations included.
pub const MAX_ROUNDS: u32 = 3;

/// What kind of generation is being requested.
#[derive(Debug, Clone, Copy)]
pub enum Attempt<'a> {
    /// Generate from scratch.
    Initial,
    /// Patch `code` so the issues in `report` go away.
    Refine {
        code: &'a str,
        report: &'a DiagnosticReport,
    },
}

/// Maps model ids to their clients.
pub struct ModelPool {
    clients: HashMap<String, Arc<dyn ModelClient>>,
    timeout: Duration,
}

impl ModelPool {
    /// Build one client per spec, selected by its backend kind.
    pub fn from_specs(specs: &[ModelSpec], timeout: Duration) -> Self {
        let clients = specs
            .iter()
            .map(|spec| (spec.id.clone(), client_for(spec, timeout)))
            .collect();
        Self { clients, timeout }
    }

    /// An empty pool; populate with [`ModelPool::with_client`].
    pub fn new(timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            timeout,
        }
    }

    /// Register (or replace) the client serving `model`.
    pub fn with_client(mut self, model: impl Into<String>, client: Arc<dyn ModelClient>) -> Self {
        self.clients.insert(model.into(), client);
        self
    }

    /// Run one generation. Never fails: backend faults come back as
    /// `success == false` with empty text.
    pub async fn generate(
        &self,
        spec: &ModelSpec,
        query: &Query,
        attempt: Attempt<'_>,
    ) -> GenerationResult {
        METRICS.inc_generation_calls();
        let start = Instant::now();

        let outcome = match self.clients.get(&spec.id) {
            Some(client) => {
                let run = self.run(client.as_ref(), spec, query, attempt);
                match tokio::time::timeout(self.timeout, run).await {
                    Ok(result) => result,
                    Err(_elapsed) => Err(ProviderError::Timeout {
                        limit_ms: self.timeout.as_millis() as u64,
                    }),
                }
            }
            None => Err(ProviderError::ClientConfig(format!(
                "no client registered for model {}",
                spec.id
            ))),
        };
        let duration = start.elapsed();

        match outcome {
            Ok((raw, rounds, truncated)) => {
                let code = extract_code(&raw);
                if code.is_empty() {
                    METRICS.inc_generation_failures();
                    warn!(model = %spec.id, "backend returned no usable code");
                    return GenerationResult::failed(
                        ProviderError::EmptyCompletion.to_string(),
                        duration,
                    );
                }
                if truncated {
                    warn!(
                        model = %spec.id,
                        rounds,
                        "output still truncated after continuation budget"
                    );
                }
                GenerationResult::succeeded(code, duration, rounds, truncated)
            }
            Err(err) => {
                METRICS.inc_generation_failures();
                if err.is_transient() {
                    warn!(model = %spec.id, error = %err, "generation failed (transient)");
                } else {
                    warn!(model = %spec.id, error = %err, "generation failed");
                }
                GenerationResult::failed(err.to_string(), duration)
            }
        }
    }

    /// Request, then keep asking for continuations while the backend stops
    /// on its token limit.
    async fn run(
        &self,
        client: &dyn ModelClient,
        spec: &ModelSpec,
        query: &Query,
        attempt: Attempt<'_>,
    ) -> Result<(String, u32, bool), ProviderError> {
        let (prompt, temperature) = match attempt {
            Attempt::Initial => (prompts::generation(query), spec.params.temperature),
            Attempt::Refine { code, report } => {
                (prompts::refinement(code, report), REFINEMENT_TEMPERATURE)
            }
        };
        let mut request =
            ChatRequest::from_prompt(&prompt, &spec.params).with_temperature(temperature);
        let mut full = String::new();

        for round in 1..=MAX_ROUNDS {
            let completion = client.complete(&request).await?;
            full.push_str(&completion.text);

            match completion.finish_reason {
                FinishReason::Length if round < MAX_ROUNDS => {
                    debug!(
                        model = %spec.id,
                        round,
                        chars = full.len(),
                        "truncated, requesting continuation"
                    );
                    request = ChatRequest::from_prompt(&prompts::continuation(&full), &spec.params)
                        .with_temperature(temperature);
                }
                FinishReason::Length => return Ok((full, round, true)),
                FinishReason::Stop => return Ok((full, round, false)),
                FinishReason::Other(reason) => {
                    debug!(model = %spec.id, %reason, "unexpected finish reason, keeping output");
                    return Ok((full, round, false));
                }
            }
        }

        Ok((full, MAX_ROUNDS, true))
    }
}
