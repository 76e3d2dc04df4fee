//! Generative AI collaborators for the reelgen pipeline.
//!
//! This crate provides:
//! - The `ScriptGenerator`, `VoiceGenerator` and `VideoGenerator` interfaces
//! - Gemini clients for script text and narration audio
//! - A Veo client for long-running image-to-video operations
//! - A simulated voice provider for offline runs

pub mod config;
pub mod error;
pub mod gemini;
mod http;
pub mod provider;
pub mod simulated;
mod types;
pub mod veo;

pub use config::GenAiConfig;
pub use error::{GenAiError, GenAiResult};
pub use gemini::GeminiClient;
pub use provider::{OperationError, ScriptGenerator, VideoGenerator, VideoOperation, VoiceGenerator};
pub use simulated::SimulatedVoiceGenerator;
pub use veo::VeoClient;
