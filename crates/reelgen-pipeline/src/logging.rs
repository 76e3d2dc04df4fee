//! Structured logging for pipeline actions.
//!
//! Every long-running action logs through a [`StageLogger`] so records
//! carry the run identifier and the action name.

use reelgen_models::RunId;
use tracing::{error, info, warn, Span};

/// Logger bound to one run and one action.
#[derive(Debug, Clone)]
pub struct StageLogger {
    run_id: String,
    operation: String,
}

impl StageLogger {
    /// Create a logger for `operation` (e.g. "script", "video_resubmit") within a run.
    pub fn new(run_id: &RunId, operation: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Stage started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Stage progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Stage warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Stage error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Stage completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span wrapping the provider calls of one action.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "stage",
            run_id = %self.run_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_logger_creation() {
        let run_id = RunId::new();
        let logger = StageLogger::new(&run_id, "script");

        assert_eq!(logger.run_id(), run_id.to_string());
        assert_eq!(logger.operation(), "script");
    }

    #[test]
    fn test_stage_logger_span_does_not_panic_without_subscriber() {
        let logger = StageLogger::new(&RunId::from_string("run-1"), "video");
        let span = logger.create_span();
        let _guard = span.enter();
        logger.log_progress("polling");
    }
}
