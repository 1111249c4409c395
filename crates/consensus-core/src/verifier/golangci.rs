//! golangci-lint output parsing.
//!
//! Structured JSON is preferred. When stdout is not JSON, compiler-style
//! `file:line:col: message` lines are recovered from the text streams.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::domain::{DiagnosticReport, Issue, ReportOrigin, Severity};

/// Captured output of one lint run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Deserialize)]
struct LintReport {
    #[serde(rename = "Issues", default)]
    issues: Option<Vec<LintIssue>>,
}

#[derive(Debug, Deserialize)]
struct LintIssue {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FromLinter", default)]
    from_linter: Option<String>,
    #[serde(rename = "Severity", default)]
    severity: Option<String>,
    #[serde(rename = "Pos", default)]
    pos: Option<LintPos>,
}

#[derive(Debug, Deserialize)]
struct LintPos {
    #[serde(rename = "Line", default)]
    line: u32,
}

fn compiler_line() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\./)?[^\s:]+:(\d+)(?::\d+)?:\s*(.+)$").ok())
        .as_ref()
}

/// Normalize one lint run into a report.
pub fn parse_output(output: &ToolOutput) -> DiagnosticReport {
    let stdout = output.stdout.trim();

    if matches!(stdout, "" | "null" | "{}") {
        if output.success() {
            return DiagnosticReport::clean();
        }
        return recover_or_unavailable(output);
    }

    match serde_json::from_str::<LintReport>(stdout) {
        Ok(report) => structured(report),
        Err(_) => recover_or_unavailable(output),
    }
}

fn structured(report: LintReport) -> DiagnosticReport {
    let mut issues = Vec::new();
    for raw in report.issues.unwrap_or_default() {
        let line = raw.pos.as_ref().map(|p| p.line).filter(|l| *l > 0);
        let severity = Severity::from_label(raw.severity.as_deref().unwrap_or_default());
        let linter = raw.from_linter.unwrap_or_else(|| "unknown".to_string());

        // A single issue may group several newline-separated messages.
        let mut emitted = false;
        for text in raw.text.lines().map(str::trim) {
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            issues.push(
                Issue::error(line, text)
                    .with_severity(severity)
                    .with_source(linter.clone()),
            );
            emitted = true;
        }
        if !emitted {
            issues.push(
                Issue::error(line, "unspecified lint issue")
                    .with_severity(severity)
                    .with_source(linter),
            );
        }
    }
    DiagnosticReport::new(issues, ReportOrigin::Structured)
}

/// Scan both streams for compiler lines; without any, a failed run means the
/// tool itself did not work.
fn recover_or_unavailable(output: &ToolOutput) -> DiagnosticReport {
    let issues = recover_compiler_lines(&output.stderr)
        .into_iter()
        .chain(recover_compiler_lines(&output.stdout))
        .collect::<Vec<_>>();

    if !issues.is_empty() {
        return DiagnosticReport::new(issues, ReportOrigin::Recovered);
    }
    if output.success() {
        return DiagnosticReport::new(Vec::new(), ReportOrigin::Recovered);
    }

    let detail = output
        .stderr
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .unwrap_or("no output");
    let status = output
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    DiagnosticReport::unavailable(format!("lint exited with status {status}: {detail}"))
}

fn recover_compiler_lines(text: &str) -> Vec<Issue> {
    let Some(re) = compiler_line() else {
        return Vec::new();
    };
    text.lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#'))
        .filter_map(|l| {
            let caps = re.captures(l)?;
            let line = caps.get(1)?.as_str().parse::<u32>().ok();
            let message = caps.get(2)?.as_str().trim();
            Some(Issue::error(line, message).with_source("compiler"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(stdout: &str, stderr: &str, code: i32) -> ToolOutput {
        ToolOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(code),
        }
    }

    #[test]
    fn test_empty_success_is_clean() {
        for stdout in ["", "null", "{}", "  \n"] {
            let report = parse_output(&out(stdout, "", 0));
            assert!(report.is_clean());
            assert_eq!(report.origin, ReportOrigin::Structured);
        }
    }

    #[test]
    fn test_structured_issues() {
        let json = r##"{"Issues":[
            {"Text":"# example\nundefined: foo\nx declared and not used","FromLinter":"typecheck","Severity":"","Pos":{"Line":7}},
            {"Text":"exported func Run should have comment","FromLinter":"revive","Severity":"warning","Pos":{"Line":2}}
        ]}"##;
        let report = parse_output(&out(json, "", 1));
        assert_eq!(report.origin, ReportOrigin::Structured);
        assert_eq!(report.issues().len(), 3);
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.issues()[0].render(), "Line 7: undefined: foo [typecheck]");
    }

    #[test]
    fn test_null_issues_is_clean() {
        let report = parse_output(&out(r#"{"Issues":null,"Report":{}}"#, "", 0));
        assert!(report.is_clean());
    }

    #[test]
    fn test_reparsing_is_idempotent() {
        let json = r#"{"Issues":[{"Text":"a\na","FromLinter":"govet","Pos":{"Line":1}}]}"#;
        let first = parse_output(&out(json, "", 1));
        let second = parse_output(&out(json, "", 1));
        assert_eq!(first, second);
        assert_eq!(first.error_count(), 1);
    }

    #[test]
    fn test_recovers_compiler_lines_from_stderr() {
        let stderr = "# validation\n./main.go:4:2: undefined: fmt\nmain.go:9:1: missing return\n";
        let report = parse_output(&out("level=error msg=\"typechecking failed\"", stderr, 3));
        assert_eq!(report.origin, ReportOrigin::Recovered);
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.issues()[0].line, Some(4));
    }

    #[test]
    fn test_unparseable_failure_is_unavailable() {
        let report = parse_output(&out("", "go: command not found\n", 127));
        assert!(report.verifier_unavailable());
        assert_eq!(report.error_count(), 1);
        assert!(report.issues()[0].message.contains("go: command not found"));
    }
}
