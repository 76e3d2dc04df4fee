//! Staged content-generation pipeline.
//!
//! This crate provides:
//! - Bounded retry for rate-limited provider calls
//! - Failure classification into user-actionable categories
//! - Polling of long-running video operations
//! - The five-stage pipeline state and its orchestrator

pub mod classify;
pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod poller;
pub mod retry;
pub mod state;

pub use classify::{categorize, classify};
pub use config::{AudioProvider, PipelineConfig};
pub use error::{PipelineError, PipelineResult, TransitionError};
pub use logging::StageLogger;
pub use pipeline::{script_prompt, ActionOutcome, Collaborators, Pipeline};
pub use poller::{OperationPoller, PollPolicy};
pub use retry::{with_retry, RetryPolicy};
pub use state::{Action, BusyFlags, PipelineState, Stage, StageError};
