//! Collaborator interfaces consumed by the pipeline.

use async_trait::async_trait;
use reelgen_models::{AudioArtifact, ImageArtifact, VoicePreference};
use serde::{Deserialize, Serialize};

use crate::error::GenAiResult;

/// Produces narration scripts from a prompt.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> GenAiResult<String>;
}

/// Produces narration audio for a script.
#[async_trait]
pub trait VoiceGenerator: Send + Sync {
    async fn generate(&self, text: &str, voice: VoicePreference) -> GenAiResult<AudioArtifact>;
}

/// Long-running video generation.
///
/// `poll` must be idempotent; the poller calls it repeatedly with the
/// latest handle until `done` is set.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    async fn submit(&self, prompt: &str, image: &ImageArtifact) -> GenAiResult<VideoOperation>;

    async fn poll(&self, operation: &VideoOperation) -> GenAiResult<VideoOperation>;

    /// Download the finished video referenced by `result_uri`.
    async fn fetch(&self, result_uri: &str) -> GenAiResult<Vec<u8>>;
}

/// Error reported by a finished operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    pub code: Option<i32>,
    pub message: Option<String>,
}

/// Handle to a video generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoOperation {
    pub name: String,
    pub done: bool,
    pub error: Option<OperationError>,
    pub result_uri: Option<String>,
    /// Reasons given when samples were dropped by safety filtering
    #[serde(default)]
    pub filtered_reasons: Vec<String>,
}

impl VideoOperation {
    /// A freshly submitted, unfinished operation.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            error: None,
            result_uri: None,
            filtered_reasons: Vec::new(),
        }
    }

    /// A finished operation carrying a result reference.
    pub fn completed(name: impl Into<String>, result_uri: impl Into<String>) -> Self {
        Self {
            done: true,
            result_uri: Some(result_uri.into()),
            ..Self::pending(name)
        }
    }

    /// A finished operation carrying a provider error.
    pub fn failed(name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            done: true,
            error: Some(OperationError {
                code: None,
                message,
            }),
            ..Self::pending(name)
        }
    }
}
