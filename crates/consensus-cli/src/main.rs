//! Consensus - multi-model code generation CLI
//!
//! The `consensus` command sends one request to every configured model,
//! verifies and repairs each candidate, and reports the result.
//!
//! ## Commands
//!
//! - `best-of`: Print the winning candidate's code
//! - `benchmark`: Print (and optionally persist) the report for every candidate
//! - `models`: Validate configuration and list the active roster

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

use consensus_core::{
    read_benchmark_artifact, write_benchmark_artifact, ConfigError, ConsensusEngine,
    ContextBundle, EngineConfig, EngineError, Snippet, StaticRetriever,
};

/// Configuration could not be loaded or validated.
const EXIT_MISCONFIGURED: u8 = 2;
/// Every model failed to produce a usable candidate.
const EXIT_NO_CANDIDATE: u8 = 3;

#[derive(Parser)]
#[command(name = "consensus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Multi-model consensus code generation with lint-driven repair",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every model and print only the winning code
    BestOf {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Run every model and print the full per-candidate report as JSON
    Benchmark {
        #[command(flatten)]
        request: RequestArgs,

        /// Also write a digest-verified artifact under this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate configuration and list the active roster
    Models,
}

#[derive(Args)]
struct RequestArgs {
    /// Natural-language request
    #[arg(short, long)]
    query: String,

    /// Complete reference files included in the prompt context
    #[arg(long = "reference")]
    references: Vec<PathBuf>,

    /// Partial snippets included in the prompt context
    #[arg(long = "snippet")]
    snippets: Vec<PathBuf>,
}

impl RequestArgs {
    fn context(&self) -> Result<ContextBundle> {
        let mut snippets = Vec::with_capacity(self.references.len() + self.snippets.len());
        for path in &self.references {
            snippets.push(Snippet::complete_file(read_text(path)?));
        }
        for path in &self.snippets {
            snippets.push(Snippet::chunk(read_text(path)?));
        }
        Ok(ContextBundle::new(snippets))
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file {:?}", path))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    consensus_core::init_tracing(cli.json, level);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    let config = EngineConfig::from_env()?;

    match command {
        Commands::BestOf { request } => cmd_best_of(config, &request).await,
        Commands::Benchmark { request, out } => {
            cmd_benchmark(config, &request, out.as_deref()).await
        }
        Commands::Models => cmd_models(&config),
    }
}

fn exit_status(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() {
        return EXIT_MISCONFIGURED;
    }
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::Misconfiguration(_)) => EXIT_MISCONFIGURED,
        Some(EngineError::AllCandidatesFailed { .. }) => EXIT_NO_CANDIDATE,
        _ => 1,
    }
}

fn engine(config: EngineConfig, request: &RequestArgs) -> Result<ConsensusEngine> {
    let context = request.context()?;
    Ok(ConsensusEngine::new(config).with_retriever(Arc::new(StaticRetriever::new(context))))
}

async fn cmd_best_of(config: EngineConfig, request: &RequestArgs) -> Result<()> {
    let engine = engine(config, request)?;
    let winner = engine.best_of(&request.query).await?;

    info!(
        query_id = %winner.query_id,
        model = %winner.model,
        status = ?winner.status,
        iterations = winner.iterations,
        errors = winner.error_count,
        combined = winner.combined,
        terminal = winner.models_terminal,
        configured = winner.models_configured,
        "best-of complete"
    );
    println!("{}", winner.code);
    Ok(())
}

async fn cmd_benchmark(
    config: EngineConfig,
    request: &RequestArgs,
    out: Option<&Path>,
) -> Result<()> {
    let engine = engine(config, request)?;
    let report = engine.benchmark(&request.query).await?;

    if let Some(dir) = out {
        let path = write_benchmark_artifact(&report, dir)
            .with_context(|| format!("Failed to write benchmark artifact under {:?}", dir))?;
        read_benchmark_artifact(&report.query_id, dir)
            .with_context(|| format!("Benchmark artifact failed verification: {:?}", path))?;
        info!(path = %path.display(), "benchmark artifact written");
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_models(config: &EngineConfig) -> Result<()> {
    println!("Max refinement iterations: {}", config.max_iterations);
    println!("Active models ({}):", config.models.len());
    for (priority, spec) in config.models.iter().enumerate() {
        println!(
            "  {}. {} [{}] deployment={} endpoint={}",
            priority + 1,
            spec.id,
            spec.kind.as_str(),
            spec.deployment,
            spec.endpoint
        );
    }
    Ok(())
}
