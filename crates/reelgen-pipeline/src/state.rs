//! Pipeline state and its transition rules.
//!
//! The stage pointer is a tagged enum: each variant owns the data that
//! must exist at that stage, so a video stage without a script or image
//! cannot be built. Artifacts that belong to stages ahead of the pointer
//! are kept in a side store, which makes rewinding non-destructive.

use std::fmt;

use reelgen_models::{
    AudioArtifact, ImageArtifact, ScriptText, StageFailure, VideoArtifact, VoicePreference,
};
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

/// Long-running action kinds, each guarded by its own busy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Script,
    Audio,
    Video,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Script => "script",
            Action::Audio => "audio",
            Action::Video => "video",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Independent busy flags per action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BusyFlags {
    script: bool,
    audio: bool,
    video: bool,
}

impl BusyFlags {
    pub fn is_set(&self, action: Action) -> bool {
        match action {
            Action::Script => self.script,
            Action::Audio => self.audio,
            Action::Video => self.video,
        }
    }

    pub fn any(&self) -> bool {
        self.script || self.audio || self.video
    }

    fn set(&mut self, action: Action, busy: bool) {
        match action {
            Action::Script => self.script = busy,
            Action::Audio => self.audio = busy,
            Action::Video => self.video = busy,
        }
    }
}

/// Current step of the pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Stage {
    /// 1: enter a topic and generate a script.
    #[default]
    Script,
    /// 2: generate narration or skip it.
    Voice { script: ScriptText },
    /// 3: upload the source image.
    Image { script: ScriptText },
    /// 4: submit video generation.
    VideoSubmit {
        script: ScriptText,
        image: ImageArtifact,
    },
    /// 5: generated video or failure with resubmit.
    Result {
        script: ScriptText,
        image: ImageArtifact,
    },
}

impl Stage {
    /// Stage number, 1 to 5.
    pub fn number(&self) -> u8 {
        match self {
            Stage::Script => 1,
            Stage::Voice { .. } => 2,
            Stage::Image { .. } => 3,
            Stage::VideoSubmit { .. } => 4,
            Stage::Result { .. } => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Script => "script",
            Stage::Voice { .. } => "voice",
            Stage::Image { .. } => "image",
            Stage::VideoSubmit { .. } => "video_submit",
            Stage::Result { .. } => "result",
        }
    }

    pub fn script(&self) -> Option<&ScriptText> {
        match self {
            Stage::Script => None,
            Stage::Voice { script }
            | Stage::Image { script }
            | Stage::VideoSubmit { script, .. }
            | Stage::Result { script, .. } => Some(script),
        }
    }

    pub fn image(&self) -> Option<&ImageArtifact> {
        match self {
            Stage::VideoSubmit { image, .. } | Stage::Result { image, .. } => Some(image),
            _ => None,
        }
    }

    /// Action whose completion moves the pipeline out of this stage.
    pub fn action(&self) -> Option<Action> {
        match self {
            Stage::Script => Some(Action::Script),
            Stage::Voice { .. } => Some(Action::Audio),
            Stage::Result { .. } => Some(Action::Video),
            Stage::Image { .. } | Stage::VideoSubmit { .. } => None,
        }
    }

    fn script_mut(&mut self) -> Option<&mut ScriptText> {
        match self {
            Stage::Script => None,
            Stage::Voice { script }
            | Stage::Image { script }
            | Stage::VideoSubmit { script, .. }
            | Stage::Result { script, .. } => Some(script),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.name())
    }
}

/// Inline error shown for the current stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageError {
    /// A transition was refused.
    Rejected(TransitionError),
    /// An action ran and failed.
    Failed(StageFailure),
}

impl StageError {
    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            StageError::Failed(failure) => Some(failure),
            StageError::Rejected(_) => None,
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Rejected(e) => write!(f, "{}", e),
            StageError::Failed(failure) => write!(f, "{}", failure.message),
        }
    }
}

/// Artifacts produced for stages ahead of the pointer.
#[derive(Debug, Clone, PartialEq, Default)]
struct Retained {
    script: Option<ScriptText>,
    image: Option<ImageArtifact>,
}

/// Single source of truth for one pipeline run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineState {
    stage: Stage,
    topic: String,
    voice: VoicePreference,
    retained: Retained,
    audio: Option<AudioArtifact>,
    video: Option<VideoArtifact>,
    busy: BusyFlags,
    last_error: Option<StageError>,
    audio_error: Option<StageFailure>,
    video_failed: bool,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_number(&self) -> u8 {
        self.stage.number()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn voice(&self) -> VoicePreference {
        self.voice
    }

    /// Current script, whether it sits in the stage or was kept across a rewind.
    pub fn script(&self) -> Option<&str> {
        self.stage
            .script()
            .or(self.retained.script.as_ref())
            .map(ScriptText::as_str)
    }

    pub fn image(&self) -> Option<&ImageArtifact> {
        self.stage.image().or(self.retained.image.as_ref())
    }

    pub fn audio(&self) -> Option<&AudioArtifact> {
        self.audio.as_ref()
    }

    pub fn video(&self) -> Option<&VideoArtifact> {
        self.video.as_ref()
    }

    pub fn busy(&self) -> BusyFlags {
        self.busy
    }

    pub fn is_busy(&self, action: Action) -> bool {
        self.busy.is_set(action)
    }

    pub fn last_error(&self) -> Option<&StageError> {
        self.last_error.as_ref()
    }

    pub fn audio_error(&self) -> Option<&StageFailure> {
        self.audio_error.as_ref()
    }

    pub fn video_failed(&self) -> bool {
        self.video_failed
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
    }

    pub fn set_voice(&mut self, voice: VoicePreference) {
        self.voice = voice;
    }

    /// Replace the script text.
    ///
    /// At stage 1 a blank edit simply clears the draft; later stages
    /// require a script, so blank text is refused there.
    pub fn edit_script(&mut self, text: impl Into<String>) -> Result<(), TransitionError> {
        let text = text.into();
        if matches!(self.stage, Stage::Script) {
            self.retained.script = ScriptText::new(text).ok();
            return Ok(());
        }

        let script = match ScriptText::new(text) {
            Ok(script) => script,
            Err(_) => return Err(self.reject(TransitionError::EmptyScript)),
        };
        if let Some(current) = self.stage.script_mut() {
            *current = script;
        }
        Ok(())
    }

    /// Store the uploaded source image. Only allowed up to stage 3.
    pub fn set_image(&mut self, image: ImageArtifact) -> Result<(), TransitionError> {
        if matches!(self.stage, Stage::VideoSubmit { .. } | Stage::Result { .. }) {
            return Err(self.reject(TransitionError::ImageLocked));
        }
        self.retained.image = Some(image);
        Ok(())
    }

    /// Move one stage forward reusing artifacts already produced.
    pub fn advance(&mut self) -> Result<(), TransitionError> {
        self.ensure_stage_idle()?;

        let outcome = match std::mem::take(&mut self.stage) {
            Stage::Script if self.topic.trim().is_empty() => {
                Err((Stage::Script, TransitionError::EmptyTopic))
            }
            Stage::Script => match self.retained.script.take() {
                Some(script) => Ok(Stage::Voice { script }),
                None => Err((Stage::Script, TransitionError::ScriptNotGenerated)),
            },
            Stage::Voice { script } => Ok(Stage::Image { script }),
            Stage::Image { script } => match self.retained.image.take() {
                Some(image) => Ok(Stage::VideoSubmit { script, image }),
                None => Err((Stage::Image { script }, TransitionError::MissingImage)),
            },
            Stage::VideoSubmit { script, image } => {
                if self.video.is_some() {
                    Ok(Stage::Result { script, image })
                } else {
                    Err((
                        Stage::VideoSubmit { script, image },
                        TransitionError::VideoNotGenerated,
                    ))
                }
            }
            stage @ Stage::Result { .. } => Err((stage, TransitionError::AtFinalStage)),
        };

        self.settle(outcome)
    }

    /// Move one stage back. Nothing already produced is discarded.
    pub fn rewind(&mut self) -> Result<(), TransitionError> {
        self.ensure_stage_idle()?;

        let outcome = match std::mem::take(&mut self.stage) {
            Stage::Script => Err((Stage::Script, TransitionError::AtFirstStage)),
            Stage::Voice { script } => {
                self.retained.script = Some(script);
                Ok(Stage::Script)
            }
            Stage::Image { script } => Ok(Stage::Voice { script }),
            Stage::VideoSubmit { script, image } => {
                self.retained.image = Some(image);
                Ok(Stage::Image { script })
            }
            Stage::Result { script, image } => Ok(Stage::VideoSubmit { script, image }),
        };

        self.settle(outcome)
    }

    /// Leave stage 2 without narration.
    pub fn skip_audio(&mut self) -> Result<(), TransitionError> {
        self.ensure_stage_idle()?;

        match std::mem::take(&mut self.stage) {
            Stage::Voice { script } => {
                self.audio = None;
                self.audio_error = None;
                self.settle(Ok(Stage::Image { script }))
            }
            other => {
                let stage = other.number();
                self.settle(Err((
                    other,
                    TransitionError::WrongStage {
                        action: Action::Audio,
                        stage,
                    },
                )))
            }
        }
    }

    /// Return every field to its initial value.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn begin_script(&mut self) -> Result<String, TransitionError> {
        if self.busy.script {
            return Err(TransitionError::Busy(Action::Script));
        }
        if !matches!(self.stage, Stage::Script) {
            return Err(self.wrong_stage(Action::Script));
        }
        if self.topic.trim().is_empty() {
            return Err(self.reject(TransitionError::EmptyTopic));
        }

        self.last_error = None;
        self.busy.set(Action::Script, true);
        Ok(self.topic.trim().to_string())
    }

    pub(crate) fn finish_script(&mut self, result: Result<ScriptText, StageFailure>) {
        self.busy.set(Action::Script, false);
        match result {
            Ok(script) if matches!(self.stage, Stage::Script) => {
                self.retained.script = None;
                self.stage = Stage::Voice { script };
            }
            Ok(script) => self.retained.script = Some(script),
            Err(failure) => self.last_error = Some(StageError::Failed(failure)),
        }
    }

    pub(crate) fn begin_audio(&mut self) -> Result<(ScriptText, VoicePreference), TransitionError> {
        if self.busy.audio {
            return Err(TransitionError::Busy(Action::Audio));
        }
        let script = match &self.stage {
            Stage::Voice { script } => script.clone(),
            _ => return Err(self.wrong_stage(Action::Audio)),
        };

        self.audio_error = None;
        self.busy.set(Action::Audio, true);
        Ok((script, self.voice))
    }

    pub(crate) fn finish_audio(&mut self, result: Result<AudioArtifact, StageFailure>) {
        self.busy.set(Action::Audio, false);
        match result {
            Ok(audio) => {
                self.audio = Some(audio);
                self.stage = match std::mem::take(&mut self.stage) {
                    Stage::Voice { script } => Stage::Image { script },
                    other => other,
                };
            }
            Err(failure) => self.audio_error = Some(failure),
        }
    }

    /// Start a video attempt, either first submission from stage 4 or a
    /// resubmission from a failed stage 5.
    pub(crate) fn begin_video(
        &mut self,
        resubmit: bool,
    ) -> Result<(ScriptText, ImageArtifact), TransitionError> {
        if self.busy.video {
            return Err(TransitionError::Busy(Action::Video));
        }
        let inputs = match (&self.stage, resubmit) {
            (Stage::VideoSubmit { script, image }, false) => (script.clone(), image.clone()),
            (Stage::Result { script, image }, true) if self.video_failed => {
                (script.clone(), image.clone())
            }
            (Stage::Result { .. }, true) => {
                return Err(self.reject(TransitionError::NothingToResubmit))
            }
            _ => return Err(self.wrong_stage(Action::Video)),
        };

        self.video_failed = false;
        self.last_error = None;
        self.busy.set(Action::Video, true);
        self.video = None;
        self.stage = match std::mem::take(&mut self.stage) {
            Stage::VideoSubmit { script, image } => Stage::Result { script, image },
            other => other,
        };
        Ok(inputs)
    }

    pub(crate) fn finish_video(&mut self, result: Result<VideoArtifact, StageFailure>) {
        self.busy.set(Action::Video, false);
        match result {
            Ok(video) => self.video = Some(video),
            Err(failure) => {
                self.video_failed = true;
                self.last_error = Some(StageError::Failed(failure));
            }
        }
    }

    /// Release an action whose caller stopped waiting for it. An
    /// interrupted video attempt counts as failed so it can be resubmitted.
    pub(crate) fn interrupt(&mut self, action: Action) {
        self.busy.set(action, false);
        if action == Action::Video && self.video.is_none() {
            self.video_failed = true;
        }
    }

    /// Refuse to move while the current stage's action is in flight.
    fn ensure_stage_idle(&self) -> Result<(), TransitionError> {
        match self.stage.action() {
            Some(action) if self.busy.is_set(action) => Err(TransitionError::Busy(action)),
            _ => Ok(()),
        }
    }

    fn settle(&mut self, outcome: Result<Stage, (Stage, TransitionError)>) -> Result<(), TransitionError> {
        match outcome {
            Ok(stage) => {
                self.stage = stage;
                if matches!(self.last_error, Some(StageError::Rejected(_))) {
                    self.last_error = None;
                }
                Ok(())
            }
            Err((stage, error)) => {
                self.stage = stage;
                Err(self.reject(error))
            }
        }
    }

    fn wrong_stage(&mut self, action: Action) -> TransitionError {
        let stage = self.stage.number();
        self.reject(TransitionError::WrongStage { action, stage })
    }

    fn reject(&mut self, error: TransitionError) -> TransitionError {
        self.last_error = Some(StageError::Rejected(error.clone()));
        error
    }
}
