//! Prompt construction and code extraction.

use crate::domain::{DiagnosticReport, Query};

/// Issues listed in a refinement request.
pub const MAX_LISTED_ISSUES: usize = 10;

/// Sampling temperature for patch requests.
pub const REFINEMENT_TEMPERATURE: f32 = 0.1;

const GENERATION_SYSTEM: &str = "You are an expert Go code generator specializing in Kubernetes.

CRITICAL RULES:
1. Follow the same structural pattern (function signatures, registration, comments) as the provided examples.
2. Use idiomatic Go: proper error handling, context usage and structuring.
3. Handle all edge cases.
4. Provide your answer in plain text without any markdown code fences or explanation.

Generate production-ready code that compiles without errors.";

const REFINEMENT_SYSTEM: &str = "You are an expert Go developer. Fix the provided code errors while \
maintaining the exact same structure, format, and style. Only address the specific errors mentioned.";

const CONTINUATION_SYSTEM: &str = "You are continuing code generation. Continue EXACTLY from where \
the code was cut off. Do not repeat.";

/// A system/user message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Initial generation request: rendered context followed by the request.
pub fn generation(query: &Query) -> Prompt {
    let context = query.context.render();
    let user = if context.is_empty() {
        format!(
            "Generate code for this request:\n{}\n\nGenerate COMPLETE, WORKING code. Start now:",
            query.text
        )
    } else {
        format!(
            "Study these COMPLETE reference examples and replicate their patterns:\n\n{context}\n\n\
             Now generate code for this request:\n{}\n\n\
             Generate COMPLETE, WORKING code following the patterns above. Start now:",
            query.text
        )
    };
    Prompt {
        system: GENERATION_SYSTEM.to_string(),
        user,
    }
}

/// Patch request for code that failed verification.
pub fn refinement(code: &str, report: &DiagnosticReport) -> Prompt {
    let errors = report
        .errors()
        .take(MAX_LISTED_ISSUES)
        .map(|issue| format!("- {}", issue.render()))
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "Here is source code that has some errors. Fix these errors while retaining the same format, \
         structure, and style. Just address the errors without changing the overall approach or \
         architecture.\n\n\
         ERRORS TO FIX:\n{errors}\n\n\
         SOURCE CODE TO FIX:\n```go\n{code}\n```\n\n\
         Please provide the corrected code that fixes these specific errors while maintaining the \
         same structure and functionality. Return only the corrected Go code without explanations."
    );
    Prompt {
        system: REFINEMENT_SYSTEM.to_string(),
        user,
    }
}

/// Follow-up after the backend stopped on its token limit.
pub fn continuation(partial: &str) -> Prompt {
    Prompt {
        system: CONTINUATION_SYSTEM.to_string(),
        user: format!(
            "Previous code (truncated at end):\n\n{partial}\n\n\
             CONTINUE the code from the exact point where it was cut off. Start with the incomplete \
             line/function and complete it. Do not add explanations."
        ),
    }
}

fn is_fence(line: &str) -> bool {
    line.trim()
        .strip_prefix("```")
        .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Strip markdown fences and surrounding prose from a model response.
///
/// Code starts after the first opening fence (or at the first `package `
/// line) and ends before the last closing fence. Falls back to the trimmed
/// input when nothing is left.
pub fn extract_code(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut start = 0;
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            start = i + 1;
            break;
        }
        if trimmed.starts_with("package ") {
            start = i;
            break;
        }
    }

    let end = (start..lines.len())
        .rev()
        .find(|&i| lines[i].trim().starts_with("```"))
        .unwrap_or(lines.len());

    let code = lines[start..end]
        .iter()
        .filter(|line| !is_fence(line))
        .copied()
        .collect::<Vec<_>>()
        .join("\n");
    let code = code.trim();

    if code.is_empty() {
        text.trim().to_string()
    } else {
        code.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContextBundle, Issue, ReportOrigin, Snippet};

    #[test]
    fn test_extract_fenced_block() {
        let text = "Here you go:\n```go\npackage main\n\nfunc main() {}\n```\nHope this helps.";
        assert_eq!(extract_code(text), "package main\n\nfunc main() {}");
    }

    #[test]
    fn test_extract_starts_at_package_line() {
        let text = "Sure! The code is below.\npackage main\nfunc f() {}";
        assert_eq!(extract_code(text), "package main\nfunc f() {}");
    }

    #[test]
    fn test_extract_drops_stray_fences() {
        let text = "```go\npackage a\n```\n```go\nfunc b() {}\n```";
        assert_eq!(extract_code(text), "package a\nfunc b() {}");
    }

    #[test]
    fn test_extract_plain_text_passthrough() {
        assert_eq!(extract_code("  func f() {}  \n"), "func f() {}");
        assert_eq!(extract_code("   "), "");
    }

    #[test]
    fn test_extract_falls_back_when_only_fences() {
        assert_eq!(extract_code("```\n```"), "```\n```");
    }

    #[test]
    fn test_refinement_lists_at_most_ten_errors() {
        let report = DiagnosticReport::new(
            (1..=14)
                .map(|n| Issue::error(Some(n), format!("err-{n}")).with_source("typecheck"))
                .collect(),
            ReportOrigin::Structured,
        );
        let prompt = refinement("package main", &report);
        assert!(prompt.user.contains("- Line 1: err-1 [typecheck]"));
        assert!(prompt.user.contains("- Line 10: err-10 [typecheck]"));
        assert!(!prompt.user.contains("err-11"));
        assert!(prompt.user.contains("```go\npackage main\n```"));
    }

    #[test]
    fn test_generation_embeds_context_and_request() {
        let query = Query::new(
            "write a mutating webhook",
            ContextBundle::new(vec![Snippet::complete_file("package webhook")]),
        );
        let prompt = generation(&query);
        let context_at = prompt.user.find("package webhook").expect("context");
        let request_at = prompt.user.find("write a mutating webhook").expect("request");
        assert!(context_at < request_at);
    }
}
