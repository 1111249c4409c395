//! Engine configuration.
//!
//! Built once at startup from environment-style keys and passed explicitly
//! into the engine. Every fault is reported here, before any query runs.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::domain::{BackendKind, ConfigError, GenerationParams, ModelSpec};
use crate::scoring::ScoringWeights;

/// Highest `MODEL_{n}_*` index scanned.
pub const MODEL_SLOTS: usize = 5;

/// Upper bound on simultaneously active models.
pub const MAX_ACTIVE_MODELS: usize = 4;

pub const ITERATION_CAP_KEY: &str = "MAX_REFINEMENT_ITERATIONS";

const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_VERIFIER_TIMEOUT_SECS: u64 = 650;

/// Headroom between the candidate and query deadlines for collection.
const QUERY_SLACK_SECS: u64 = 60;

/// Worst-case wall time of one candidate: the initial generate and verify,
/// then one patch and re-verify per refinement iteration.
///
/// Unless configured explicitly, the candidate deadline equals this budget
/// and the query deadline adds [`QUERY_SLACK_SECS`] on top, so a slow linter
/// cannot push a healthy candidate past either deadline.
pub fn candidate_budget(generation: Duration, verifier: Duration, max_iterations: u32) -> Duration {
    (generation + verifier)
        .saturating_mul(max_iterations.saturating_add(1))
}

/// Retrieval collaborator keys, kept opaque.
const COLLABORATOR_KEYS: &[&str] = &[
    "AZURE_OPENAI_EMBEDDING_MODEL",
    "AZURE_OPENAI_EMBEDDING_DEPLOYMENT",
    "AZURE_OPENAI_EMBEDDING_API_KEY",
    "AZURE_OPENAI_EMBEDDING_ENDPOINT",
    "AZURE_OPENAI_EMBEDDING_API_VERSION",
    "QDRANT_ENABLED",
    "QDRANT_URL",
    "QDRANT_COLLECTION",
];

/// Immutable engine configuration.
#[derive(Clone)]
pub struct EngineConfig {
    /// Active roster in declaration order; position is ranking priority.
    pub models: Vec<ModelSpec>,
    /// Refinement iteration budget per candidate (always > 0).
    pub max_iterations: u32,
    /// Concurrent verifier invocations allowed across all candidates.
    pub verifier_concurrency: usize,
    pub generation_timeout: Duration,
    pub candidate_timeout: Duration,
    pub query_timeout: Duration,
    pub verifier_timeout: Duration,
    pub weights: ScoringWeights,
    /// Retrieval-layer settings, passed through untouched.
    pub collaborator: BTreeMap<String, String>,
}

impl EngineConfig {
    /// Build a configuration from an explicit roster, using defaults for
    /// everything else.
    pub fn new(models: Vec<ModelSpec>, max_iterations: u32) -> Result<Self, ConfigError> {
        validate_roster(&models)?;
        if max_iterations == 0 {
            return Err(ConfigError::ZeroIterationCap);
        }
        let generation_timeout = Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS);
        let verifier_timeout = Duration::from_secs(DEFAULT_VERIFIER_TIMEOUT_SECS);
        let candidate_timeout =
            candidate_budget(generation_timeout, verifier_timeout, max_iterations);
        Ok(Self {
            verifier_concurrency: models.len(),
            models,
            max_iterations,
            generation_timeout,
            candidate_timeout,
            query_timeout: candidate_timeout + Duration::from_secs(QUERY_SLACK_SECS),
            verifier_timeout,
            weights: ScoringWeights::default(),
            collaborator: BTreeMap::new(),
        })
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_iterations = parse_iteration_cap(get(ITERATION_CAP_KEY))?;

        let mut models = Vec::new();
        for index in 1..=MODEL_SLOTS {
            if let Some(spec) = parse_model(index, &get)? {
                models.push(spec);
            }
        }
        validate_roster(&models)?;

        let verifier_concurrency = match get("VERIFIER_CONCURRENCY") {
            Some(raw) => parse_positive("VERIFIER_CONCURRENCY", &raw)? as usize,
            None => models.len(),
        };

        let secs = |key: &str| -> Result<Option<Duration>, ConfigError> {
            get(key)
                .map(|raw| parse_positive(key, &raw).map(Duration::from_secs))
                .transpose()
        };

        let generation_timeout = secs("GENERATION_TIMEOUT_SECS")?
            .unwrap_or(Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS));
        let verifier_timeout = secs("VERIFIER_TIMEOUT_SECS")?
            .unwrap_or(Duration::from_secs(DEFAULT_VERIFIER_TIMEOUT_SECS));
        let budget = candidate_budget(generation_timeout, verifier_timeout, max_iterations);
        let candidate_timeout = secs("CANDIDATE_TIMEOUT_SECS")?.unwrap_or(budget);
        let query_timeout = secs("QUERY_TIMEOUT_SECS")?
            .unwrap_or(candidate_timeout + Duration::from_secs(QUERY_SLACK_SECS));

        if query_timeout < candidate_timeout {
            return Err(ConfigError::QueryShorterThanCandidate {
                candidate_secs: candidate_timeout.as_secs(),
                query_secs: query_timeout.as_secs(),
            });
        }
        if candidate_timeout < budget {
            warn!(
                candidate_secs = candidate_timeout.as_secs(),
                budget_secs = budget.as_secs(),
                "candidate timeout is below the worst-case generate/verify budget"
            );
        }

        let weight = |key: &str, default: f64| -> Result<f64, ConfigError> {
            match get(key) {
                Some(raw) => raw.parse::<f64>().map_err(|_| {
                    ConfigError::InvalidWeights(format!("{key} is not a number: {raw:?}"))
                }),
                None => Ok(default),
            }
        };
        let defaults = ScoringWeights::default();
        let weights = ScoringWeights::new(
            weight("SCORE_WEIGHT_QUALITY", defaults.quality)?,
            weight("SCORE_WEIGHT_SPEED", defaults.speed)?,
            weight("SCORE_WEIGHT_COMPLETENESS", defaults.completeness)?,
        )?;

        let collaborator = COLLABORATOR_KEYS
            .iter()
            .filter_map(|key| get(key).map(|v| (key.to_string(), v)))
            .collect();

        Ok(Self {
            models,
            max_iterations,
            verifier_concurrency,
            generation_timeout,
            candidate_timeout,
            query_timeout,
            verifier_timeout,
            weights,
            collaborator,
        })
    }

    pub fn with_timeouts(
        mut self,
        generation: Duration,
        candidate: Duration,
        query: Duration,
    ) -> Self {
        self.generation_timeout = generation;
        self.candidate_timeout = candidate;
        self.query_timeout = query;
        self
    }

    pub fn with_verifier_concurrency(mut self, permits: usize) -> Self {
        self.verifier_concurrency = permits.max(1);
        self
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }
}

// Collaborator values may hold credentials; only their keys are shown.
impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("models", &self.models)
            .field("max_iterations", &self.max_iterations)
            .field("verifier_concurrency", &self.verifier_concurrency)
            .field("generation_timeout", &self.generation_timeout)
            .field("candidate_timeout", &self.candidate_timeout)
            .field("query_timeout", &self.query_timeout)
            .field("verifier_timeout", &self.verifier_timeout)
            .field("weights", &self.weights)
            .field("collaborator", &self.collaborator.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn parse_iteration_cap(raw: Option<String>) -> Result<u32, ConfigError> {
    let raw = raw.ok_or(ConfigError::MissingIterationCap)?;
    let value: i64 = raw
        .parse()
        .map_err(|_| ConfigError::NonIntegerIterationCap { value: raw.clone() })?;
    if value < 0 {
        return Err(ConfigError::NegativeIterationCap { value });
    }
    if value == 0 {
        return Err(ConfigError::ZeroIterationCap);
    }
    u32::try_from(value).map_err(|_| ConfigError::InvalidPositiveInteger {
        key: ITERATION_CAP_KEY.to_string(),
        value: raw,
    })
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::InvalidPositiveInteger {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_model<G>(index: usize, get: &G) -> Result<Option<ModelSpec>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let key = |suffix: &str| format!("MODEL_{index}_{suffix}");
    let type_raw = get(&key("TYPE"));
    let name = get(&key("NAME"));
    if type_raw.is_none() && name.is_none() {
        return Ok(None);
    }

    let require = |suffix: &str| {
        let k = key(suffix);
        get(&k).ok_or(ConfigError::MissingModelSetting { index, key: k })
    };

    let type_raw = require("TYPE")?;
    let kind = BackendKind::parse(&type_raw).ok_or(ConfigError::UnknownBackend {
        index,
        value: type_raw,
    })?;

    let mut spec = ModelSpec::new(require("NAME")?, kind)
        .with_api_key(require("API_KEY")?)
        .with_endpoint(require("ENDPOINT")?.trim_end_matches('/').to_string())
        .with_deployment(require("DEPLOYMENT")?);

    match kind {
        BackendKind::AzureOpenai => spec = spec.with_api_version(require("API_VERSION")?),
        BackendKind::OpenaiCompatible => {
            if let Some(version) = get(&key("API_VERSION")) {
                spec = spec.with_api_version(version);
            }
        }
    }

    let mut params = GenerationParams::default();
    if let Some(raw) = get(&key("TEMPERATURE")) {
        params.temperature = raw
            .parse::<f32>()
            .ok()
            .filter(|t| t.is_finite() && (0.0..=2.0).contains(t))
            .ok_or_else(|| ConfigError::InvalidModelSetting {
                index,
                key: key("TEMPERATURE"),
                value: raw.clone(),
            })?;
    }
    if let Some(raw) = get(&key("MAX_TOKENS")) {
        params.max_tokens = raw
            .parse::<u32>()
            .ok()
            .filter(|t| *t > 0)
            .ok_or_else(|| ConfigError::InvalidModelSetting {
                index,
                key: key("MAX_TOKENS"),
                value: raw.clone(),
            })?;
    }
    spec.params = params;

    Ok(Some(spec))
}

fn validate_roster(models: &[ModelSpec]) -> Result<(), ConfigError> {
    if models.is_empty() {
        return Err(ConfigError::NoModels);
    }
    if models.len() > MAX_ACTIVE_MODELS {
        return Err(ConfigError::TooManyModels {
            count: models.len(),
            max: MAX_ACTIVE_MODELS,
        });
    }
    let mut seen = HashSet::new();
    for spec in models {
        if !seen.insert(spec.id.as_str()) {
            return Err(ConfigError::DuplicateModel(spec.id.clone()));
        }
    }
    Ok(())
}
