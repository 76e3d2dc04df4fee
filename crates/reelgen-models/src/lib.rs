//! Shared data models for the reelgen content pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Run identifiers
//! - Voice preferences
//! - Script text and media artifacts (image, audio, video)
//! - Failure categories and the `FailureSignal` capability trait

pub mod artifact;
pub mod failure;
pub mod run;
pub mod voice;

// Re-export common types
pub use artifact::{ArtifactError, AudioArtifact, ImageArtifact, ScriptText, VideoArtifact};
pub use failure::{ErrorCategory, FailureSignal, Recovery, StageContext, StageFailure};
pub use run::RunId;
pub use voice::VoicePreference;
