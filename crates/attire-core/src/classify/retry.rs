//! Retry utilities for transient scoring failures.
//!
//! Only the similarity backend is retried. Aggregation faults are
//! deterministic in the scores, so running them again cannot help.

use crate::error::PipelineError;
use std::time::Duration;

/// Determine whether a pipeline error is worth retrying.
///
/// Retryable: scorer failures and timeouts.
/// Non-retryable: aggregation faults, missing models, preprocessing errors.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::Scoring { .. } => true,
        PipelineError::Timeout { stage, .. } => stage == "score",
        _ => false,
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}
