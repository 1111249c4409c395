//! Normalized static-analysis diagnostics for one code sample.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Severity level for an issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Map a linter-reported severity string. Linters that do not classify
    /// their findings leave the field empty, which counts as an error.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "warning" | "warn" => Severity::Warning,
            "info" | "information" | "hint" | "note" => Severity::Info,
            _ => Severity::Error,
        }
    }
}

/// A single normalized issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    /// Line number (1-indexed), when the tool reported one.
    pub line: Option<u32>,

    /// Human-readable message.
    pub message: String,

    pub severity: Severity,

    /// Linter or compiler stage that produced the issue.
    pub source: Option<String>,
}

impl Issue {
    pub fn error(line: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            severity: Severity::Error,
            source: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// One-line rendering used in refinement prompts and logs.
    pub fn render(&self) -> String {
        let line = self
            .line
            .map(|l| l.to_string())
            .unwrap_or_else(|| "?".to_string());
        match &self.source {
            Some(source) => format!("Line {line}: {} [{source}]", self.message),
            None => format!("Line {line}: {}", self.message),
        }
    }
}

/// How the report was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportOrigin {
    /// Parsed from the tool's machine-readable output.
    Structured,
    /// Tool produced no structured output; compiler lines were recovered
    /// from its text output.
    Recovered,
    /// The tool could not run at all.
    VerifierUnavailable,
}

/// Verifier output for one code sample.
///
/// Issues are deduplicated by `(line, message)` on construction, and
/// `error_count` always equals the number of error-severity issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticReport {
    issues: Vec<Issue>,
    error_count: usize,
    pub origin: ReportOrigin,
}

impl DiagnosticReport {
    /// Build a report, dropping repeated `(line, message)` pairs while
    /// keeping first-seen order.
    pub fn new(issues: Vec<Issue>, origin: ReportOrigin) -> Self {
        let mut seen: HashSet<(Option<u32>, String)> = HashSet::new();
        let issues: Vec<Issue> = issues
            .into_iter()
            .filter(|issue| seen.insert((issue.line, issue.message.clone())))
            .collect();
        let error_count = issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
            .count();
        Self {
            issues,
            error_count,
            origin,
        }
    }

    /// A report with no issues.
    pub fn clean() -> Self {
        Self::new(Vec::new(), ReportOrigin::Structured)
    }

    /// The tool itself could not run; the sample is treated as maximally
    /// defective for this pass.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(
            vec![Issue::error(None, reason).with_source("verifier")],
            ReportOrigin::VerifierUnavailable,
        )
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }

    pub fn verifier_unavailable(&self) -> bool {
        self.origin == ReportOrigin::VerifierUnavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_label() {
        assert_eq!(Severity::from_label(""), Severity::Error);
        assert_eq!(Severity::from_label("error"), Severity::Error);
        assert_eq!(Severity::from_label("Warning"), Severity::Warning);
        assert_eq!(Severity::from_label("info"), Severity::Info);
    }

    #[test]
    fn test_report_dedups_line_and_message() {
        let report = DiagnosticReport::new(
            vec![
                Issue::error(Some(3), "undefined: foo").with_source("typecheck"),
                Issue::error(Some(3), "undefined: foo").with_source("govet"),
                Issue::error(Some(4), "undefined: foo"),
            ],
            ReportOrigin::Structured,
        );
        assert_eq!(report.issues().len(), 2);
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.issues()[0].source.as_deref(), Some("typecheck"));
    }

    #[test]
    fn test_error_count_ignores_warnings() {
        let report = DiagnosticReport::new(
            vec![
                Issue::error(Some(1), "missing return"),
                Issue::error(Some(2), "exported func lacks comment")
                    .with_severity(Severity::Warning),
                Issue::error(Some(9), "consider simplifying").with_severity(Severity::Info),
            ],
            ReportOrigin::Structured,
        );
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors().count(), report.error_count());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_unavailable_report_is_defective() {
        let report = DiagnosticReport::unavailable("golangci-lint not found");
        assert_eq!(report.error_count(), 1);
        assert!(report.verifier_unavailable());
    }

    #[test]
    fn test_issue_render() {
        let issue = Issue::error(Some(12), "x declared and not used").with_source("typecheck");
        assert_eq!(issue.render(), "Line 12: x declared and not used [typecheck]");
        assert_eq!(Issue::error(None, "boom").render(), "Line ?: boom");
    }
}
