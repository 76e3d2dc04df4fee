//! Pipeline error types.

use reelgen_genai::GenAiError;
use reelgen_models::ArtifactError;
use thiserror::Error;

use crate::state::Action;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A stage transition or action that was refused because its
/// precondition does not hold. The state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Enter a topic before generating a script")]
    EmptyTopic,

    #[error("The script cannot be empty")]
    EmptyScript,

    #[error("Generate a script before continuing")]
    ScriptNotGenerated,

    #[error("Upload an image before generating the video")]
    MissingImage,

    #[error("Generate the video before viewing the result")]
    VideoNotGenerated,

    #[error("The image can only be changed before the video is submitted")]
    ImageLocked,

    #[error("{0} generation is already in progress")]
    Busy(Action),

    #[error("{action} generation is not available at stage {stage}")]
    WrongStage { action: Action, stage: u8 },

    #[error("Already at the first stage")]
    AtFirstStage,

    #[error("Already at the final stage")]
    AtFinalStage,

    #[error("There is no failed video to resubmit")]
    NothingToResubmit,
}

/// Errors raised while wiring up or feeding a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Provider error: {0}")]
    Provider(#[from] GenAiError),

    #[error("Invalid artifact: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Unsupported image file: {0}")]
    UnsupportedImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Missing credentials and similar problems that must halt startup.
    pub fn is_configuration(&self) -> bool {
        matches!(self, PipelineError::Provider(GenAiError::Config(_)))
    }
}
