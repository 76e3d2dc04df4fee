//! Drives a long-running video operation from submission to artifact.
//!
//! Submission and each status check go through the retry wrapper. Once
//! the operation reports `done`, the result reference is downloaded with a
//! single plain request. Failures from the three phases are tagged with a
//! `phase` field in logs and returned as `GenAiError`.

use std::time::Duration;

use reelgen_genai::{GenAiError, GenAiResult, VideoGenerator, VideoOperation};
use reelgen_models::{ImageArtifact, VideoArtifact};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::metrics::record_poll;
use crate::retry::{with_retry, RetryPolicy};

/// Timing policy for status checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between status checks.
    pub interval: Duration,
    /// Give up once this much time has passed since submission.
    /// `None` polls until the provider reports completion.
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_wait: Some(Duration::from_secs(20 * 60)),
        }
    }
}

impl PollPolicy {
    /// Poll forever at `interval`.
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_wait: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// Runs video operations to completion.
#[derive(Debug, Clone, Default)]
pub struct OperationPoller {
    retry: RetryPolicy,
    poll: PollPolicy,
}

impl OperationPoller {
    pub fn new(retry: RetryPolicy, poll: PollPolicy) -> Self {
        Self { retry, poll }
    }

    /// Submit a generation request and wait for the resulting video.
    pub async fn generate<G>(
        &self,
        client: &G,
        prompt: &str,
        image: &ImageArtifact,
    ) -> GenAiResult<VideoArtifact>
    where
        G: VideoGenerator + ?Sized,
    {
        let operation = with_retry(&self.retry, "video_submit", || client.submit(prompt, image))
            .await
            .inspect_err(|e| warn!(phase = "submit", "Video submission failed: {}", e))?;

        info!(phase = "submit", operation = %operation.name, "Video operation submitted");

        let operation = self.wait_until_done(client, operation).await?;
        self.collect(client, &operation).await
    }

    /// Re-query the operation until it reports `done`.
    async fn wait_until_done<G>(
        &self,
        client: &G,
        mut operation: VideoOperation,
    ) -> GenAiResult<VideoOperation>
    where
        G: VideoGenerator + ?Sized,
    {
        let started = Instant::now();
        let deadline = self.poll.max_wait.map(|max_wait| started + max_wait);
        let mut poll_count = 0u32;

        while !operation.done {
            let mut wait = self.poll.interval;
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(self.timed_out(&operation, poll_count, started));
                }
                wait = wait.min(remaining);
            }

            tokio::time::sleep(wait).await;
            poll_count += 1;
            record_poll();

            let current = operation;
            let check = with_retry(&self.retry, "video_poll", || client.poll(&current));
            // the budget also bounds retry backoff inside a status check
            let checked = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, check).await {
                    Ok(checked) => checked,
                    Err(_) => return Err(self.timed_out(&current, poll_count, started)),
                },
                None => check.await,
            };
            operation = checked.inspect_err(|e| {
                warn!(phase = "poll", poll_count, "Video status check failed: {}", e)
            })?;

            debug!(
                phase = "poll",
                operation = %operation.name,
                poll_count,
                done = operation.done,
                "Checked video operation"
            );
        }

        info!(operation = %operation.name, poll_count, "Video operation finished");
        Ok(operation)
    }

    fn timed_out(&self, operation: &VideoOperation, poll_count: u32, started: Instant) -> GenAiError {
        let waited = started.elapsed();
        warn!(
            phase = "poll",
            operation = %operation.name,
            poll_count,
            waited_secs = waited.as_secs(),
            "Video operation did not complete in time"
        );
        GenAiError::Timeout(waited)
    }

    /// Turn a finished operation into an artifact.
    async fn collect<G>(&self, client: &G, operation: &VideoOperation) -> GenAiResult<VideoArtifact>
    where
        G: VideoGenerator + ?Sized,
    {
        if let Some(error) = &operation.error {
            let message = error
                .message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Video generation failed".to_string());
            warn!(phase = "poll", code = ?error.code, "Video operation reported an error: {}", message);
            return Err(GenAiError::operation_failed(message));
        }

        let Some(uri) = operation.result_uri.as_deref() else {
            let detail = if operation.filtered_reasons.is_empty() {
                "operation completed without a video reference".to_string()
            } else {
                format!(
                    "operation completed without a video reference (filtered: {})",
                    operation.filtered_reasons.join("; ")
                )
            };
            warn!(phase = "poll", operation = %operation.name, "{}", detail);
            return Err(GenAiError::missing_result(detail));
        };

        let bytes = client
            .fetch(uri)
            .await
            .inspect_err(|e| warn!(phase = "fetch", "Video download failed: {}", e))?;

        info!(phase = "fetch", bytes = bytes.len(), "Video downloaded");
        Ok(VideoArtifact::mp4(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reelgen_models::FailureSignal;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted video provider: replays queued responses.
    #[derive(Default)]
    struct ScriptedVideo {
        submits: Mutex<VecDeque<GenAiResult<VideoOperation>>>,
        polls: Mutex<VecDeque<GenAiResult<VideoOperation>>>,
        fetches: Mutex<Vec<String>>,
        fetch_result: Mutex<Option<GenAiResult<Vec<u8>>>>,
    }

    impl ScriptedVideo {
        fn new(submit: Vec<GenAiResult<VideoOperation>>, polls: Vec<GenAiResult<VideoOperation>>) -> Self {
            Self {
                submits: Mutex::new(submit.into()),
                polls: Mutex::new(polls.into()),
                fetches: Mutex::new(Vec::new()),
                fetch_result: Mutex::new(Some(Ok(vec![1, 2, 3]))),
            }
        }
    }

    #[async_trait]
    impl VideoGenerator for ScriptedVideo {
        async fn submit(&self, _prompt: &str, _image: &ImageArtifact) -> GenAiResult<VideoOperation> {
            self.submits.lock().unwrap().pop_front().expect("unexpected submit")
        }

        async fn poll(&self, _operation: &VideoOperation) -> GenAiResult<VideoOperation> {
            self.polls.lock().unwrap().pop_front().expect("unexpected poll")
        }

        async fn fetch(&self, result_uri: &str) -> GenAiResult<Vec<u8>> {
            self.fetches.lock().unwrap().push(result_uri.to_string());
            self.fetch_result.lock().unwrap().take().expect("unexpected fetch")
        }
    }

    fn image() -> ImageArtifact {
        ImageArtifact::new(vec![1], "image/png").unwrap()
    }

    fn poller() -> OperationPoller {
        OperationPoller::new(
            RetryPolicy::default(),
            PollPolicy::unbounded(Duration::from_secs(30)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_done_fetches_once() {
        let client = ScriptedVideo::new(
            vec![Ok(VideoOperation::pending("op"))],
            vec![Ok(VideoOperation::completed("op", "https://files/v"))],
        );

        let video = poller().generate(&client, "prompt", &image()).await.unwrap();

        assert_eq!(video.bytes, vec![1, 2, 3]);
        assert_eq!(*client.fetches.lock().unwrap(), vec!["https://files/v".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_without_result_is_missing_result() {
        let client = ScriptedVideo::new(
            vec![Ok(VideoOperation::pending("op"))],
            vec![Ok(VideoOperation {
                done: true,
                ..VideoOperation::pending("op")
            })],
        );

        let err = poller().generate(&client, "prompt", &image()).await.unwrap_err();

        assert!(err.is_missing_result());
        assert!(client.fetches.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_carries_message() {
        let client = ScriptedVideo::new(
            vec![Ok(VideoOperation::failed("op", Some("internal model error".into())))],
            vec![],
        );

        let err = poller().generate(&client, "prompt", &image()).await.unwrap_err();
        assert_eq!(err.to_string(), "Operation failed: internal model error");

        let client = ScriptedVideo::new(vec![Ok(VideoOperation::failed("op", None))], vec![]);
        let err = poller().generate(&client, "prompt", &image()).await.unwrap_err();
        assert_eq!(err.to_string(), "Operation failed: Video generation failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_wait_interval_and_retry_rate_limits() {
        let client = ScriptedVideo::new(
            vec![Ok(VideoOperation::pending("op"))],
            vec![
                Ok(VideoOperation::pending("op")),
                Err(GenAiError::RateLimited("slow down".into())),
                Ok(VideoOperation::completed("op", "https://files/v")),
            ],
        );

        let start = Instant::now();
        poller().generate(&client, "prompt", &image()).await.unwrap();

        // two intervals plus one 2s backoff
        assert_eq!(start.elapsed(), Duration::from_secs(62));
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_times_out() {
        let pending: Vec<_> = (0..10).map(|_| Ok(VideoOperation::pending("op"))).collect();
        let client = ScriptedVideo::new(vec![Ok(VideoOperation::pending("op"))], pending);
        let poller = OperationPoller::new(
            RetryPolicy::default(),
            PollPolicy::unbounded(Duration::from_secs(30))
                .with_max_wait(Some(Duration::from_secs(90))),
        );

        let err = poller.generate(&client, "prompt", &image()).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(client.polls.lock().unwrap().len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_wait_is_clamped_to_budget() {
        let pending: Vec<_> = (0..5).map(|_| Ok(VideoOperation::pending("op"))).collect();
        let client = ScriptedVideo::new(vec![Ok(VideoOperation::pending("op"))], pending);
        let poller = OperationPoller::new(
            RetryPolicy::default(),
            PollPolicy::unbounded(Duration::from_secs(30))
                .with_max_wait(Some(Duration::from_secs(45))),
        );

        let start = Instant::now();
        let err = poller.generate(&client, "prompt", &image()).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(start.elapsed(), Duration::from_secs(45));
        assert_eq!(client.polls.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_backoff_does_not_outlive_budget() {
        let client = ScriptedVideo::new(
            vec![Ok(VideoOperation::pending("op"))],
            vec![
                Err(GenAiError::RateLimited("slow down".into())),
                Ok(VideoOperation::completed("op", "https://files/v")),
            ],
        );
        let poller = OperationPoller::new(
            RetryPolicy::default(),
            PollPolicy::unbounded(Duration::from_secs(30))
                .with_max_wait(Some(Duration::from_secs(31))),
        );

        let start = Instant::now();
        let err = poller.generate(&client, "prompt", &image()).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(start.elapsed(), Duration::from_secs(31));
        assert!(client.fetches.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_propagates() {
        let client = ScriptedVideo::new(
            vec![Ok(VideoOperation::completed("op", "https://files/v"))],
            vec![],
        );
        *client.fetch_result.lock().unwrap() = Some(Err(GenAiError::fetch_failed(500, "")));

        let err = poller().generate(&client, "prompt", &image()).await.unwrap_err();
        assert!(matches!(err, GenAiError::Fetch { status: 500, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_error_is_not_polled() {
        let client = ScriptedVideo::new(vec![Err(GenAiError::Blocked("SAFETY".into()))], vec![]);
        let err = poller().generate(&client, "prompt", &image()).await.unwrap_err();
        assert!(err.is_policy_violation());
    }
}
