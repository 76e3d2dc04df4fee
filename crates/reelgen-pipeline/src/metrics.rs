//! Pipeline metrics collection.
//!
//! Recording is a no-op until the host installs a `metrics` recorder.

use metrics::counter;
use reelgen_models::{ErrorCategory, StageContext};

/// Metric name constants for consistency.
pub mod names {
    /// Retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "reelgen_retries_total";

    /// Status checks made against long-running operations.
    pub const POLL_ITERATIONS_TOTAL: &str = "reelgen_poll_iterations_total";

    /// Classified stage failures by stage and category.
    pub const STAGE_FAILURES_TOTAL: &str = "reelgen_stage_failures_total";
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record one status check of a long-running operation.
pub fn record_poll() {
    counter!(names::POLL_ITERATIONS_TOTAL).increment(1);
}

/// Record a classified failure.
pub fn record_stage_failure(context: StageContext, category: ErrorCategory) {
    counter!(
        names::STAGE_FAILURES_TOTAL,
        "context" => context.as_str(),
        "category" => category.as_str()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::RETRIES_TOTAL.contains("retries"));
        assert!(names::POLL_ITERATIONS_TOTAL.contains("poll"));
        assert!(names::STAGE_FAILURES_TOTAL.contains("failures"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_retry("script_generate");
        record_poll();
        record_stage_failure(StageContext::Video, ErrorCategory::Timeout);
    }
}
