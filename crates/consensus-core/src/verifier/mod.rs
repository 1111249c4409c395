//! Verifier adapter.
//!
//! A [`Verifier`] turns one code sample into a [`DiagnosticReport`] and never
//! fails: a broken sample or a broken tool both come back as a report.

pub mod error;
pub mod golangci;
pub mod workspace;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::domain::DiagnosticReport;

pub use error::{VerifierError, VerifierResult};
pub use golangci::{parse_output, ToolOutput};
pub use workspace::{LintConfig, LintVerifier};

#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, code: &str) -> DiagnosticReport;
}

/// Caps concurrent invocations of an inner verifier across all candidates.
pub struct BoundedVerifier {
    inner: Arc<dyn Verifier>,
    permits: Arc<Semaphore>,
}

impl BoundedVerifier {
    pub fn new(inner: Arc<dyn Verifier>, max_concurrent: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl Verifier for BoundedVerifier {
    async fn verify(&self, code: &str) -> DiagnosticReport {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return DiagnosticReport::unavailable("verifier pool closed"),
        };
        self.inner.verify(code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks the peak number of overlapping calls.
    #[derive(Default)]
    struct Overlap {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Verifier for Overlap {
        async fn verify(&self, _code: &str) -> DiagnosticReport {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            DiagnosticReport::clean()
        }
    }

    #[tokio::test]
    async fn test_bounded_verifier_caps_concurrency() {
        let overlap = Arc::new(Overlap::default());
        let bounded = Arc::new(BoundedVerifier::new(overlap.clone(), 2));

        let calls = (0..6).map(|_| {
            let bounded = bounded.clone();
            tokio::spawn(async move { bounded.verify("package main").await })
        });
        for handle in futures::future::join_all(calls).await {
            assert!(handle.expect("join").is_clean());
        }

        assert_eq!(overlap.peak.load(Ordering::SeqCst), 2);
        assert_eq!(bounded.available_permits(), 2);
    }
}
