//! Pipeline orchestrator.
//!
//! [`Pipeline`] owns one [`PipelineState`] behind an async mutex and runs
//! the long-running stage actions against the collaborator clients. Each
//! action takes its inputs under the lock, releases it for the provider
//! work, then re-acquires it to apply the outcome. Provider failures are
//! classified and stored on the state; callers only ever see refused
//! transitions as errors.

use std::future::Future;
use std::sync::Arc;

use reelgen_genai::{
    GeminiClient, GenAiConfig, GenAiError, GenAiResult, ScriptGenerator,
    SimulatedVoiceGenerator, VeoClient, VideoGenerator, VoiceGenerator,
};
use reelgen_models::{
    AudioArtifact, ImageArtifact, RunId, ScriptText, StageContext, StageFailure, VoicePreference,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::classify::classify;
use crate::config::{AudioProvider, PipelineConfig};
use crate::error::{PipelineResult, TransitionError};
use crate::logging::StageLogger;
use crate::poller::{OperationPoller, PollPolicy};
use crate::retry::{with_retry, RetryPolicy};
use crate::state::{Action, PipelineState};

/// Prompt sent to the script model for a topic.
pub fn script_prompt(topic: &str) -> String {
    format!(
        "Write a short, engaging narration script of about 60 words for a video about: {}. \
         Return only the narration text, without a title, stage directions or formatting.",
        topic.trim()
    )
}

/// The three external clients a pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub script: Arc<dyn ScriptGenerator>,
    pub voice: Arc<dyn VoiceGenerator>,
    pub video: Arc<dyn VideoGenerator>,
}

impl Collaborators {
    pub fn new(
        script: Arc<dyn ScriptGenerator>,
        voice: Arc<dyn VoiceGenerator>,
        video: Arc<dyn VideoGenerator>,
    ) -> Self {
        Self {
            script,
            voice,
            video,
        }
    }

    /// Build the Gemini and Veo clients, picking the voice backend from config.
    pub fn from_config(config: &PipelineConfig, genai: GenAiConfig) -> PipelineResult<Self> {
        let gemini = Arc::new(GeminiClient::new(genai.clone())?);
        let video = Arc::new(VeoClient::new(genai)?);

        let voice: Arc<dyn VoiceGenerator> = match config.audio_provider {
            AudioProvider::Gemini => gemini.clone(),
            AudioProvider::Simulated => Arc::new(SimulatedVoiceGenerator::new(
                config.simulated_audio_delay,
                config.simulated_audio_failure_rate,
            )),
        };

        Ok(Self::new(gemini, voice, video))
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// How a started action ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The artifact was stored and the stage moved on where applicable.
    Completed,
    /// The action failed; the classified failure is also on the state.
    Failed(StageFailure),
    /// The run was reset while the action was in flight. Nothing was applied.
    Abandoned,
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed)
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            ActionOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct RunHandle {
    id: RunId,
    cancel: CancellationToken,
}

impl RunHandle {
    fn new() -> Self {
        Self {
            id: RunId::new(),
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Debug)]
struct RunSlot {
    state: PipelineState,
    run: RunHandle,
}

/// Releases an action's busy flag if its future is dropped before the
/// result is settled.
struct BusyGuard {
    inner: Arc<Mutex<RunSlot>>,
    run_id: RunId,
    action: Action,
    armed: bool,
}

impl BusyGuard {
    fn new(inner: &Arc<Mutex<RunSlot>>, run_id: &RunId, action: Action) -> Self {
        Self {
            inner: inner.clone(),
            run_id: run_id.clone(),
            action,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        if let Ok(mut slot) = self.inner.try_lock() {
            release_interrupted(&mut slot, &self.run_id, self.action);
            return;
        }

        // Lock is contended; finish the release on the runtime.
        let inner = self.inner.clone();
        let run_id = self.run_id.clone();
        let action = self.action;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let mut slot = inner.lock().await;
                    release_interrupted(&mut slot, &run_id, action);
                });
            }
            Err(_) => warn!(
                run_id = %run_id,
                action = ?action,
                "No runtime to release interrupted action; busy until reset"
            ),
        }
    }
}

fn release_interrupted(slot: &mut RunSlot, run_id: &RunId, action: Action) {
    if slot.run.id != *run_id {
        return;
    }
    slot.state.interrupt(action);
    warn!(
        run_id = %run_id,
        action = ?action,
        "Action dropped before completion, busy flag released"
    );
}

/// One explicitly owned pipeline run.
///
/// Independent pipelines may coexist. An action future dropped before it
/// completes releases its busy flag; an interrupted video attempt can be
/// resubmitted.
#[derive(Debug)]
pub struct Pipeline {
    inner: Arc<Mutex<RunSlot>>,
    collaborators: Collaborators,
    retry: RetryPolicy,
    poller: OperationPoller,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, retry: RetryPolicy, poll: PollPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RunSlot {
                state: PipelineState::new(),
                run: RunHandle::new(),
            })),
            collaborators,
            poller: OperationPoller::new(retry.clone(), poll),
            retry,
        }
    }

    pub fn with_config(collaborators: Collaborators, config: &PipelineConfig) -> Self {
        Self::new(collaborators, config.retry.clone(), config.poll.clone())
    }

    /// Build a pipeline backed by the real provider clients.
    pub fn from_config(config: &PipelineConfig, genai: GenAiConfig) -> PipelineResult<Self> {
        let collaborators = Collaborators::from_config(config, genai)?;
        Ok(Self::with_config(collaborators, config))
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> PipelineState {
        self.inner.lock().await.state.clone()
    }

    pub async fn run_id(&self) -> RunId {
        self.inner.lock().await.run.id.clone()
    }

    pub async fn set_topic(&self, topic: impl Into<String>) {
        self.inner.lock().await.state.set_topic(topic);
    }

    pub async fn set_voice(&self, voice: VoicePreference) {
        self.inner.lock().await.state.set_voice(voice);
    }

    pub async fn edit_script(&self, text: impl Into<String>) -> Result<(), TransitionError> {
        self.inner.lock().await.state.edit_script(text)
    }

    pub async fn set_image(&self, image: ImageArtifact) -> Result<(), TransitionError> {
        self.inner.lock().await.state.set_image(image)
    }

    pub async fn advance(&self) -> Result<(), TransitionError> {
        self.inner.lock().await.state.advance()
    }

    pub async fn rewind(&self) -> Result<(), TransitionError> {
        self.inner.lock().await.state.rewind()
    }

    pub async fn skip_audio(&self) -> Result<(), TransitionError> {
        self.inner.lock().await.state.skip_audio()
    }

    /// Start a fresh run.
    ///
    /// In-flight actions of the old run are cancelled at their next await
    /// point and their results are never applied. Returns the new run id.
    pub async fn reset(&self) -> RunId {
        let mut slot = self.inner.lock().await;
        slot.run.cancel.cancel();
        let previous = std::mem::replace(&mut slot.run, RunHandle::new());
        slot.state.reset();

        info!(
            previous_run_id = %previous.id,
            run_id = %slot.run.id,
            "Pipeline reset"
        );
        slot.run.id.clone()
    }

    /// Stage 1: generate a script from the topic.
    pub async fn generate_script(&self) -> Result<ActionOutcome, TransitionError> {
        let (topic, run, guard) = {
            let mut slot = self.inner.lock().await;
            let topic = slot.state.begin_script()?;
            let guard = BusyGuard::new(&self.inner, &slot.run.id, Action::Script);
            (topic, slot.run.clone(), guard)
        };

        let logger = StageLogger::new(&run.id, "script");
        logger.log_start(&format!("generating script for topic '{}'", topic));

        let prompt = script_prompt(&topic);
        logger.log_progress(&format!("prompt of {} chars", prompt.len()));
        let result = self
            .guarded(&run, self.produce_script(&prompt).instrument(logger.create_span()))
            .await;

        Ok(self
            .settle(&run, guard, &logger, StageContext::Script, result, PipelineState::finish_script)
            .await)
    }

    /// Stage 2: narrate the script with the selected voice.
    pub async fn generate_audio(&self) -> Result<ActionOutcome, TransitionError> {
        let (script, voice, run, guard) = {
            let mut slot = self.inner.lock().await;
            let (script, voice) = slot.state.begin_audio()?;
            let guard = BusyGuard::new(&self.inner, &slot.run.id, Action::Audio);
            (script, voice, slot.run.clone(), guard)
        };

        let logger = StageLogger::new(&run.id, "audio");
        logger.log_start(&format!("generating narration with {} voice", voice));

        let result = self
            .guarded(
                &run,
                self.produce_audio(&script, voice).instrument(logger.create_span()),
            )
            .await;

        Ok(self
            .settle(&run, guard, &logger, StageContext::Audio, result, PipelineState::finish_audio)
            .await)
    }

    /// Stage 4: submit the video request and wait for the result.
    pub async fn generate_video(&self) -> Result<ActionOutcome, TransitionError> {
        self.run_video(false).await
    }

    /// Stage 5: retry a failed video attempt with the same script and image.
    pub async fn resubmit_video(&self) -> Result<ActionOutcome, TransitionError> {
        self.run_video(true).await
    }

    async fn run_video(&self, resubmit: bool) -> Result<ActionOutcome, TransitionError> {
        let (script, image, run, guard) = {
            let mut slot = self.inner.lock().await;
            let (script, image) = slot.state.begin_video(resubmit)?;
            let guard = BusyGuard::new(&self.inner, &slot.run.id, Action::Video);
            (script, image, slot.run.clone(), guard)
        };

        let operation = if resubmit { "video_resubmit" } else { "video" };
        let logger = StageLogger::new(&run.id, operation);
        logger.log_start(&format!("submitting video with {:?} image", image));

        let result = self
            .guarded(
                &run,
                self.poller
                    .generate(self.collaborators.video.as_ref(), script.as_str(), &image)
                    .instrument(logger.create_span()),
            )
            .await;

        Ok(self
            .settle(&run, guard, &logger, StageContext::Video, result, PipelineState::finish_video)
            .await)
    }

    async fn produce_script(&self, prompt: &str) -> GenAiResult<ScriptText> {
        let text = with_retry(&self.retry, "script_generate", || {
            self.collaborators.script.generate(prompt)
        })
        .await?;

        ScriptText::new(text).map_err(|_| GenAiError::missing_result("script text was blank"))
    }

    async fn produce_audio(
        &self,
        script: &ScriptText,
        voice: VoicePreference,
    ) -> GenAiResult<AudioArtifact> {
        with_retry(&self.retry, "voice_generate", || {
            self.collaborators.voice.generate(script.as_str(), voice)
        })
        .await
    }

    /// Run `work` unless the run is cancelled first.
    async fn guarded<T, F>(&self, run: &RunHandle, work: F) -> Option<GenAiResult<T>>
    where
        F: Future<Output = GenAiResult<T>>,
    {
        tokio::select! {
            biased;
            _ = run.cancel.cancelled() => None,
            result = work => Some(result),
        }
    }

    /// Classify and apply an action's result if its run is still current.
    async fn settle<T>(
        &self,
        run: &RunHandle,
        guard: BusyGuard,
        logger: &StageLogger,
        context: StageContext,
        result: Option<GenAiResult<T>>,
        apply: fn(&mut PipelineState, Result<T, StageFailure>),
    ) -> ActionOutcome {
        let Some(result) = result else {
            guard.disarm();
            logger.log_warning("abandoned by reset");
            return ActionOutcome::Abandoned;
        };

        let result = result.map_err(|e| {
            let failure = classify(&e, context);
            logger.log_error(&format!("{} ({})", e, failure.category));
            failure
        });

        let mut slot = self.inner.lock().await;
        if slot.run.id != run.id {
            guard.disarm();
            logger.log_warning("run was reset, discarding result");
            return ActionOutcome::Abandoned;
        }

        let outcome = match &result {
            Ok(_) => ActionOutcome::Completed,
            Err(failure) => ActionOutcome::Failed(failure.clone()),
        };
        apply(&mut slot.state, result);
        guard.disarm();

        if outcome.is_completed() {
            logger.log_completion(&format!("now at stage {}", slot.state.stage()));
        }
        outcome
    }
}
