//! Composite quality scoring.
//!
//! Pure functions only: the same report, duration and length always produce
//! the same [`ScoreBreakdown`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, DiagnosticReport};

/// Quality lost per real error.
pub const ERROR_PENALTY: f64 = 0.08;

/// Generations at or beyond this many seconds score zero on speed.
pub const SPEED_HORIZON_SECS: f64 = 30.0;

/// Length (in characters) at which completeness saturates.
pub const COMPLETENESS_CAP: f64 = 3000.0;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Relative weights of the three sub-scores. Always sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub quality: f64,
    pub speed: f64,
    pub completeness: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            quality: 0.70,
            speed: 0.10,
            completeness: 0.20,
        }
    }
}

impl ScoringWeights {
    /// Validate a weight triple.
    pub fn new(quality: f64, speed: f64, completeness: f64) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("quality", quality),
            ("speed", speed),
            ("completeness", completeness),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeights(format!(
                    "{name} weight must be a non-negative number, got {value}"
                )));
            }
        }
        let sum = quality + speed + completeness;
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::InvalidWeights(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(Self {
            quality,
            speed,
            completeness,
        })
    }
}

/// Sub-scores and their weighted sum, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub quality: f64,
    pub speed: f64,
    pub completeness: f64,
    pub combined: f64,
}

pub fn quality_score(error_count: usize) -> f64 {
    (1.0 - error_count as f64 * ERROR_PENALTY).clamp(0.0, 1.0)
}

pub fn speed_score(duration: Duration) -> f64 {
    (1.0 - duration.as_secs_f64() / SPEED_HORIZON_SECS)
        .clamp(0.0, 1.0)
}

pub fn completeness_score(length: usize) -> f64 {
    (length as f64 / COMPLETENESS_CAP).clamp(0.0, 1.0)
}

/// Score one sample.
///
/// A report whose verifier could not run scores zero on quality regardless
/// of its synthetic error count.
pub fn score(
    report: &DiagnosticReport,
    duration: Duration,
    length: usize,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let quality = if report.verifier_unavailable() {
        0.0
    } else {
        quality_score(report.error_count())
    };
    let speed = speed_score(duration);
    let completeness = completeness_score(length);
    let combined = (weights.quality * quality
        + weights.speed * speed
        + weights.completeness * completeness)
        .clamp(0.0, 1.0);

    ScoreBreakdown {
        quality,
        speed,
        completeness,
        combined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Issue, ReportOrigin};

    fn report_with_errors(n: u32) -> DiagnosticReport {
        DiagnosticReport::new(
            (1..=n)
                .map(|line| Issue::error(Some(line), "undefined: x"))
                .collect(),
            ReportOrigin::Structured,
        )
    }

    #[test]
    fn test_quality_boundaries() {
        assert_eq!(quality_score(0), 1.0);
        assert!((quality_score(5) - 0.6).abs() < 1e-9);
        assert_eq!(quality_score(13), 0.0);
        assert_eq!(quality_score(500), 0.0);
    }

    #[test]
    fn test_speed_floors_at_horizon() {
        assert_eq!(speed_score(Duration::ZERO), 1.0);
        assert!((speed_score(Duration::from_secs(15)) - 0.5).abs() < 1e-9);
        assert_eq!(speed_score(Duration::from_secs(30)), 0.0);
        assert_eq!(speed_score(Duration::from_secs(300)), 0.0);
    }

    #[test]
    fn test_completeness_saturates() {
        assert_eq!(completeness_score(0), 0.0);
        assert!((completeness_score(1500) - 0.5).abs() < 1e-9);
        assert_eq!(completeness_score(9000), 1.0);
    }

    #[test]
    fn test_combined_uses_default_weights() {
        let breakdown = score(
            &report_with_errors(0),
            Duration::from_secs(3),
            3000,
            &ScoringWeights::default(),
        );
        // 0.7 * 1.0 + 0.1 * 0.9 + 0.2 * 1.0
        assert!((breakdown.combined - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_combined_stays_in_unit_interval() {
        let weights = ScoringWeights::default();
        for errors in [0, 1, 12, 13, 40] {
            for secs in [0, 10, 29, 30, 120] {
                for length in [0, 100, 3000, 50_000] {
                    let s = score(
                        &report_with_errors(errors),
                        Duration::from_secs(secs),
                        length,
                        &weights,
                    );
                    for value in [s.quality, s.speed, s.completeness, s.combined] {
                        assert!((0.0..=1.0).contains(&value));
                    }
                }
            }
        }
    }

    #[test]
    fn test_unavailable_verifier_zeroes_quality() {
        let s = score(
            &DiagnosticReport::unavailable("golangci-lint: not found"),
            Duration::from_secs(1),
            100,
            &ScoringWeights::default(),
        );
        assert_eq!(s.quality, 0.0);
    }

    #[test]
    fn test_weights_validation() {
        assert!(ScoringWeights::new(0.5, 0.25, 0.25).is_ok());
        assert!(matches!(
            ScoringWeights::new(0.5, 0.5, 0.5),
            Err(ConfigError::InvalidWeights(_))
        ));
        assert!(matches!(
            ScoringWeights::new(1.2, -0.2, 0.0),
            Err(ConfigError::InvalidWeights(_))
        ));
    }
}
