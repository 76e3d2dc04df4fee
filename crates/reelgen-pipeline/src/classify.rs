//! Failure classification.
//!
//! Maps any failure exposing [`FailureSignal`] to one of the user-facing
//! categories. Category logic is identical for every stage; only the
//! message copy depends on the [`StageContext`].

use reelgen_models::{ErrorCategory, FailureSignal, StageContext, StageFailure};

use crate::metrics::record_stage_failure;

/// Pick the category for a failure.
pub fn categorize<E>(error: &E) -> ErrorCategory
where
    E: FailureSignal + ?Sized,
{
    if error.is_quota_exhausted() || error.is_rate_limit() {
        ErrorCategory::QuotaExceeded
    } else if error.is_missing_result() {
        ErrorCategory::MissingResult
    } else if error.is_policy_violation() {
        ErrorCategory::ContentPolicyViolation
    } else if error.is_timeout() {
        ErrorCategory::Timeout
    } else {
        ErrorCategory::Unexpected
    }
}

/// Classify a failure raised while running `context`.
pub fn classify<E>(error: &E, context: StageContext) -> StageFailure
where
    E: FailureSignal + ?Sized,
{
    let category = categorize(error);
    record_stage_failure(context, category);
    let message = user_message(category, context, &error.failure_message());
    StageFailure::new(category, context, message)
}

/// User-facing copy for a category in a given stage.
pub fn user_message(category: ErrorCategory, context: StageContext, raw: &str) -> String {
    use ErrorCategory::*;
    use StageContext::*;

    match (category, context) {
        (QuotaExceeded, Script) => "Script generation quota exceeded. Wait a minute and try \
            again, or check the plan and billing details for your API key."
            .to_string(),
        (QuotaExceeded, Audio) => "Voice generation quota exceeded. Wait a minute and try \
            again, or skip narration for now."
            .to_string(),
        (QuotaExceeded, Video) => "Video generation quota exceeded. Video models have strict \
            rate limits; wait a few minutes before resubmitting, or upgrade your plan."
            .to_string(),

        (ContentPolicyViolation, Script) => "The topic was blocked by content safety filters. \
            Rephrase it and generate the script again."
            .to_string(),
        (ContentPolicyViolation, Audio) => "The narration was blocked by content safety \
            filters. Edit the script and try again."
            .to_string(),
        (ContentPolicyViolation, Video) => "The video request was blocked by safety filters. \
            Edit the script, or go back and use an image without people or sensitive content."
            .to_string(),

        (MissingResult, Script) => "Script generation finished but returned no text. Try a \
            more specific topic."
            .to_string(),
        (MissingResult, Audio) => "Voice generation finished but returned no audio. Try \
            again or skip narration."
            .to_string(),
        (MissingResult, Video) => "Video generation finished but no video was returned. This \
            usually means the output was filtered by safety checks; adjust the script or \
            image and resubmit."
            .to_string(),

        (Timeout, Script) => "Script generation took too long. Try again.".to_string(),
        (Timeout, Audio) => "Voice generation took too long. Try again.".to_string(),
        (Timeout, Video) => "Video generation did not finish in time. Resubmit to try again."
            .to_string(),

        (Unexpected, Script) => format!("Failed to generate script: {raw}"),
        (Unexpected, Audio) => format!("Failed to generate audio: {raw}"),
        (Unexpected, Video) => format!("Video generation failed: {raw}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_genai::GenAiError;
    use reelgen_models::failure::MISSING_RESULT_SENTINEL;
    use std::time::Duration;

    #[test]
    fn test_resource_exhausted_is_quota() {
        assert_eq!(
            categorize("RESOURCE_EXHAUSTED: too many requests"),
            ErrorCategory::QuotaExceeded
        );
        assert_eq!(categorize("Daily QUOTA reached"), ErrorCategory::QuotaExceeded);
    }

    #[test]
    fn test_responsible_ai_is_policy_violation() {
        assert_eq!(
            categorize("Blocked by Responsible AI practices"),
            ErrorCategory::ContentPolicyViolation
        );
        assert_eq!(
            categorize("RESPONSIBLE AI filter"),
            ErrorCategory::ContentPolicyViolation
        );
        assert_eq!(
            categorize("image contains sensitive content"),
            ErrorCategory::ContentPolicyViolation
        );
    }

    #[test]
    fn test_sentinel_is_missing_result() {
        assert_eq!(
            categorize(MISSING_RESULT_SENTINEL),
            ErrorCategory::MissingResult
        );
        assert_eq!(
            categorize(&GenAiError::missing_result("no uri")),
            ErrorCategory::MissingResult
        );
    }

    #[test]
    fn test_unrelated_message_is_unexpected() {
        assert_eq!(categorize("network down"), ErrorCategory::Unexpected);
    }

    #[test]
    fn test_timeout_category() {
        assert_eq!(
            categorize(&GenAiError::Timeout(Duration::from_secs(600))),
            ErrorCategory::Timeout
        );
    }

    #[test]
    fn test_rate_limit_escaping_retry_is_quota() {
        let err = GenAiError::from_http_status(429, "slow down");
        assert_eq!(categorize(&err), ErrorCategory::QuotaExceeded);
    }

    #[test]
    fn test_category_is_stage_independent() {
        for raw in ["RESOURCE_EXHAUSTED", "policy", MISSING_RESULT_SENTINEL, "network down"] {
            let script = classify(raw, StageContext::Script);
            let video = classify(raw, StageContext::Video);
            assert_eq!(script.category, video.category);
            assert_ne!(script.message, video.message);
        }
    }

    #[test]
    fn test_unexpected_echoes_raw_message() {
        let failure = classify("network down", StageContext::Video);
        assert_eq!(failure.category, ErrorCategory::Unexpected);
        assert_eq!(failure.context, StageContext::Video);
        assert_eq!(failure.message, "Video generation failed: network down");

        let failure = classify(&GenAiError::operation_failed("boom"), StageContext::Script);
        assert_eq!(failure.message, "Failed to generate script: Operation failed: boom");
    }
}
