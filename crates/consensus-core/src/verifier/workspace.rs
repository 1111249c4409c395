//! Lint runs inside disposable workspaces.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::{VerifierError, VerifierResult};
use super::golangci::{parse_output, ToolOutput};
use super::Verifier;
use crate::domain::{DiagnosticReport, Issue, ReportOrigin};
use crate::metrics::METRICS;

/// How to lay out a workspace and what to run in it.
#[derive(Debug, Clone)]
pub struct LintConfig {
    /// Name of the source file written into the workspace.
    pub file_name: String,
    /// Commands run before linting. Their failures are logged and ignored;
    /// the lint run reports the consequences.
    pub setup: Vec<Vec<String>>,
    pub lint: Vec<String>,
    /// Budget for the whole invocation, setup included.
    pub timeout: Duration,
}

impl Default for LintConfig {
    fn default() -> Self {
        let argv = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            file_name: "main.go".to_string(),
            setup: vec![
                argv(&["go", "mod", "init", "validation"]),
                argv(&["go", "mod", "tidy"]),
            ],
            lint: argv(&[
                "golangci-lint",
                "run",
                "--out-format=json",
                "--timeout=600s",
                "./...",
            ]),
            timeout: Duration::from_secs(650),
        }
    }
}

impl LintConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Runs the configured linter in a fresh temporary directory per call.
///
/// The directory is owned by the call's future, so it is removed on every
/// exit path, cancellation included.
pub struct LintVerifier {
    config: LintConfig,
}

impl LintVerifier {
    pub fn new(config: LintConfig) -> Self {
        Self { config }
    }

    async fn run(&self, code: &str) -> VerifierResult<ToolOutput> {
        let deadline = Instant::now() + self.config.timeout;
        let workspace = tempfile::Builder::new()
            .prefix("consensus-verify-")
            .tempdir()
            .map_err(VerifierError::Workspace)?;
        tokio::fs::write(workspace.path().join(&self.config.file_name), code).await?;

        for command in &self.config.setup {
            let output =
                run_command(command, workspace.path(), deadline, self.config.timeout).await?;
            if !output.success() {
                debug!(
                    command = %command.join(" "),
                    stderr = %output.stderr.trim(),
                    "setup command failed"
                );
            }
        }

        run_command(&self.config.lint, workspace.path(), deadline, self.config.timeout).await
    }
}

#[async_trait]
impl Verifier for LintVerifier {
    async fn verify(&self, code: &str) -> DiagnosticReport {
        if code.trim().is_empty() {
            return DiagnosticReport::new(
                vec![Issue::error(None, "empty code")],
                ReportOrigin::Structured,
            );
        }

        METRICS.inc_verifier_invocations();
        let report = match self.run(code).await {
            Ok(output) => parse_output(&output),
            Err(err) => {
                warn!(error = %err, "verifier could not run");
                DiagnosticReport::unavailable(err.to_string())
            }
        };
        if report.verifier_unavailable() {
            METRICS.inc_verifier_failures();
        }
        report
    }
}

async fn run_command(
    argv: &[String],
    dir: &Path,
    deadline: Instant,
    budget: Duration,
) -> VerifierResult<ToolOutput> {
    let (program, args) = argv.split_first().ok_or(VerifierError::EmptyCommand)?;

    let child = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| VerifierError::Spawn {
            program: program.clone(),
            source,
        })?;

    let output = tokio::time::timeout_at(deadline, child.wait_with_output())
        .await
        .map_err(|_| VerifierError::Timeout {
            limit_ms: budget.as_millis() as u64,
        })??;

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
    })
}
