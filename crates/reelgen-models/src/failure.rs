//! Failure categories surfaced to the user, and the capability trait
//! collaborator errors implement so they can be categorised.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker a provider puts in a failure payload when the caller should
/// back off and retry.
pub const RATE_LIMIT_MARKER: &str = "RESOURCE_EXHAUSTED";

/// Sentinel raised internally when an operation completed without
/// producing a usable artifact.
pub const MISSING_RESULT_SENTINEL: &str = "NO_RESULT_PRODUCED";

pub const QUOTA_MARKERS: &[&str] = &["quota", "resource_exhausted"];
pub const POLICY_MARKERS: &[&str] = &["sensitive", "policy", "responsible ai"];

/// User-actionable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    QuotaExceeded,
    ContentPolicyViolation,
    MissingResult,
    Timeout,
    Unexpected,
}

/// What the user can do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Run the failing stage again as is.
    Resubmit,
    /// Wait for quota to replenish, then run the failing stage again.
    WaitThenResubmit,
    /// Go back and change the input before trying again.
    EditInput,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::QuotaExceeded => "quota_exceeded",
            ErrorCategory::ContentPolicyViolation => "content_policy_violation",
            ErrorCategory::MissingResult => "missing_result",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Unexpected => "unexpected",
        }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            ErrorCategory::QuotaExceeded => Recovery::WaitThenResubmit,
            ErrorCategory::ContentPolicyViolation => Recovery::EditInput,
            ErrorCategory::MissingResult | ErrorCategory::Timeout | ErrorCategory::Unexpected => {
                Recovery::Resubmit
            }
        }
    }

    /// Whether the pipeline may be resubmitted from the failing stage
    /// without changing any input.
    pub fn is_resubmit_eligible(&self) -> bool {
        !matches!(self.recovery(), Recovery::EditInput)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stage that raised a failure. Only affects message copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageContext {
    Script,
    Audio,
    Video,
}

impl StageContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageContext::Script => "script",
            StageContext::Audio => "audio",
            StageContext::Video => "video",
        }
    }
}

impl fmt::Display for StageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified failure stored on the pipeline state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFailure {
    pub category: ErrorCategory,
    pub context: StageContext,
    /// User-facing message.
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl StageFailure {
    pub fn new(category: ErrorCategory, context: StageContext, message: impl Into<String>) -> Self {
        Self {
            category,
            context,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn recovery(&self) -> Recovery {
        self.category.recovery()
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}", self.context, self.category, self.message)
    }
}

/// Capability interface for categorising a failure.
///
/// The default methods match marker substrings in [`failure_text`],
/// which should contain the error message and its full serialized form.
/// Implementations with structured knowledge override the predicates and
/// may still fall back to the defaults.
///
/// [`failure_text`]: FailureSignal::failure_text
pub trait FailureSignal {
    /// Human-readable message, echoed verbatim for unexpected failures.
    fn failure_message(&self) -> String;

    /// Everything known about the failure as text.
    fn failure_text(&self) -> String {
        self.failure_message()
    }

    /// Transient rate limiting; the retry wrapper backs off on this.
    fn is_rate_limit(&self) -> bool {
        self.failure_text().contains(RATE_LIMIT_MARKER)
    }

    fn is_quota_exhausted(&self) -> bool {
        contains_any(&self.failure_text(), QUOTA_MARKERS)
    }

    fn is_missing_result(&self) -> bool {
        contains_any(&self.failure_text(), &[MISSING_RESULT_SENTINEL])
    }

    fn is_policy_violation(&self) -> bool {
        contains_any(&self.failure_text(), POLICY_MARKERS)
    }

    fn is_timeout(&self) -> bool {
        false
    }
}

impl FailureSignal for str {
    fn failure_message(&self) -> String {
        self.to_string()
    }
}

impl FailureSignal for String {
    fn failure_message(&self) -> String {
        self.clone()
    }
}

/// Case-insensitive substring test against any of `markers`.
pub fn contains_any(text: &str, markers: &[&str]) -> bool {
    let haystack = text.to_lowercase();
    markers
        .iter()
        .any(|marker| haystack.contains(&marker.to_lowercase()))
}
