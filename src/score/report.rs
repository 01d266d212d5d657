//! Result reporting.

use async_trait::async_trait;
use tracing::{info, warn};

use super::BenchmarkResult;
use crate::error::RuntimeError;

/// Destination of intermediate and final results.
#[async_trait]
pub trait Reporter: Send + Sync + 'static {
    async fn report(&self, result: &BenchmarkResult) -> Result<(), RuntimeError>;
}

/// Writes results to the log. The tag breakdown is logged with the final result only.
#[derive(Debug, Default)]
pub struct LogReporter;

#[async_trait]
impl Reporter for LogReporter {
    async fn report(&self, r: &BenchmarkResult) -> Result<(), RuntimeError> {
        if !r.finished {
            info!(
                score = r.score,
                raw = r.raw,
                deduction = r.deduction,
                errors = r.errors.deduction,
                timeouts = r.errors.timeout,
                "progress"
            );
            return Ok(());
        }
        for (tag, n) in r.breakdown.iter() {
            info!(tag = %tag, count = n, "score tag");
        }
        if r.passed {
            info!(score = r.score, raw = r.raw, deduction = r.deduction, reason = %r.reason, "benchmark passed");
        } else {
            warn!(score = r.score, raw = r.raw, deduction = r.deduction, reason = %r.reason, "benchmark failed");
        }
        Ok(())
    }
}
