//! Consensus ranking.
//!
//! Order: combined score descending, then fewer errors, then faster
//! generation, then roster priority. Failed candidates never rank.

use std::cmp::Ordering;

use crate::domain::{Candidate, EngineError, Result};

fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    let combined = |c: &Candidate| c.combined().unwrap_or(0.0);
    let errors = |c: &Candidate| c.error_count().unwrap_or(usize::MAX);

    combined(b)
        .total_cmp(&combined(a))
        .then_with(|| errors(a).cmp(&errors(b)))
        .then_with(|| a.generation.duration_ms.cmp(&b.generation.duration_ms))
        .then_with(|| a.priority.cmp(&b.priority))
}

/// Usable candidates, best first.
pub fn rank(candidates: &[Candidate]) -> Vec<&Candidate> {
    let mut usable: Vec<&Candidate> = candidates.iter().filter(|c| !c.is_failed()).collect();
    usable.sort_by(|a, b| compare(a, b));
    usable
}

/// The winner, or `AllCandidatesFailed` when nothing is usable.
pub fn select(candidates: &[Candidate]) -> Result<&Candidate> {
    rank(candidates)
        .into_iter()
        .next()
        .ok_or(EngineError::AllCandidatesFailed {
            configured: candidates.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CandidateStatus, DiagnosticReport, FailureReason, GenerationResult, Issue, ReportOrigin,
    };
    use crate::scoring::ScoreBreakdown;
    use std::time::Duration;

    fn candidate(
        model: &str,
        priority: usize,
        combined: f64,
        errors: u32,
        millis: u64,
    ) -> Candidate {
        let report = DiagnosticReport::new(
            (1..=errors).map(|l| Issue::error(Some(l), "e")).collect(),
            ReportOrigin::Structured,
        );
        Candidate {
            model: model.to_string(),
            priority,
            generation: GenerationResult::succeeded(
                "package main".into(),
                Duration::from_millis(millis),
                1,
                false,
            ),
            report: Some(report),
            score: Some(ScoreBreakdown {
                quality: 0.0,
                speed: 0.0,
                completeness: 0.0,
                combined,
            }),
            refinements: Vec::new(),
            status: if errors == 0 {
                CandidateStatus::Clean
            } else {
                CandidateStatus::BestEffort
            },
            failure: None,
        }
    }

    fn failed(model: &str, priority: usize) -> Candidate {
        Candidate::failed(
            model,
            priority,
            GenerationResult::failed("down", Duration::ZERO),
            FailureReason::Generation {
                message: "down".into(),
            },
        )
    }

    #[test]
    fn test_highest_combined_wins() {
        let set = vec![
            candidate("a", 0, 0.80, 0, 1000),
            candidate("b", 1, 0.95, 0, 9000),
        ];
        assert_eq!(select(&set).unwrap().model, "b");
    }

    #[test]
    fn test_tie_breaks() {
        let set = vec![
            candidate("slow", 0, 0.9, 1, 5000),
            candidate("fewer-errors", 1, 0.9, 0, 8000),
        ];
        assert_eq!(select(&set).unwrap().model, "fewer-errors");

        let set = vec![
            candidate("slow", 0, 0.9, 0, 5000),
            candidate("fast", 1, 0.9, 0, 1000),
        ];
        assert_eq!(select(&set).unwrap().model, "fast");

        let set = vec![
            candidate("second", 1, 0.9, 0, 1000),
            candidate("first", 0, 0.9, 0, 1000),
        ];
        assert_eq!(select(&set).unwrap().model, "first");
    }

    #[test]
    fn test_failed_candidates_are_excluded() {
        let set = vec![failed("a", 0), candidate("b", 1, 0.1, 9, 1000)];
        let ranked = rank(&set);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].model, "b");
    }

    #[test]
    fn test_all_failed() {
        let set = vec![failed("a", 0), failed("b", 1), failed("c", 2)];
        assert!(matches!(
            select(&set),
            Err(EngineError::AllCandidatesFailed { configured: 3 })
        ));
    }

    #[test]
    fn test_selection_is_order_independent() {
        let mut set = vec![
            candidate("a", 0, 0.7, 2, 3000),
            candidate("b", 1, 0.7, 2, 3000),
            candidate("c", 2, 0.7, 2, 3000),
        ];
        let first = select(&set).unwrap().model.clone();
        set.reverse();
        assert_eq!(select(&set).unwrap().model, first);
        assert_eq!(first, "a");
    }
}
