//! Generative AI client error types.

use std::time::Duration;

use reelgen_models::failure::{MISSING_RESULT_SENTINEL, RATE_LIMIT_MARKER};
use reelgen_models::FailureSignal;
use serde::Deserialize;
use thiserror::Error;

pub type GenAiResult<T> = Result<T, GenAiError>;

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("Rate limited ({marker}): {0}", marker = RATE_LIMIT_MARKER)]
    RateLimited(String),

    #[error("Provider returned {status}: {message}")]
    Api {
        status: u16,
        status_code: Option<String>,
        message: String,
    },

    #[error("Request blocked by provider safety filters: {0}")]
    Blocked(String),

    #[error("{sentinel}: {0}", sentinel = MISSING_RESULT_SENTINEL)]
    MissingResult(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Fetching result failed with {status}: {message}")]
    Fetch { status: u16, message: String },

    #[error("Timed out after {0:?} waiting for operation to complete")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Voice generation failed: {0}")]
    Simulated(String),

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Error envelope returned by the Gemini API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

fn parse_error_body(body: &str) -> Option<ApiErrorDetail> {
    serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| b.error)
}

fn reason_phrase(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

impl GenAiError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn missing_result(msg: impl Into<String>) -> Self {
        Self::MissingResult(msg.into())
    }

    pub fn operation_failed(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Build an error from a non-success API response.
    ///
    /// HTTP 429 and a `RESOURCE_EXHAUSTED` status both map to `RateLimited`.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let detail = parse_error_body(body);
        let status_code = detail.as_ref().and_then(|d| d.status.clone());
        let message = detail
            .and_then(|d| d.message)
            .filter(|m| !m.trim().is_empty())
            .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
            .unwrap_or_else(|| reason_phrase(status));

        if status == 429 || status_code.as_deref() == Some(RATE_LIMIT_MARKER) {
            return Self::RateLimited(message);
        }

        Self::Api {
            status,
            status_code,
            message,
        }
    }

    /// Build an error for a failed download of a finished artifact.
    ///
    /// Prefers the server-supplied JSON message, then the status reason text.
    pub fn fetch_failed(status: u16, body: &str) -> Self {
        let message = parse_error_body(body)
            .and_then(|d| d.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| reason_phrase(status));
        Self::Fetch { status, message }
    }

    /// Wrap a transport error. reqwest errors print the request URL,
    /// which carries the API key, so it is dropped here.
    pub fn network(error: reqwest::Error) -> Self {
        Self::Network(error.without_url())
    }
}

impl FailureSignal for GenAiError {
    fn failure_message(&self) -> String {
        self.to_string()
    }

    fn failure_text(&self) -> String {
        format!("{} {:?}", self, self)
    }

    fn is_rate_limit(&self) -> bool {
        matches!(self, GenAiError::RateLimited(_))
            || self.failure_text().contains(RATE_LIMIT_MARKER)
    }

    fn is_missing_result(&self) -> bool {
        matches!(self, GenAiError::MissingResult(_))
            || self.failure_text().contains(MISSING_RESULT_SENTINEL)
    }

    fn is_policy_violation(&self) -> bool {
        matches!(self, GenAiError::Blocked(_))
            || reelgen_models::failure::contains_any(
                &self.failure_text(),
                reelgen_models::failure::POLICY_MARKERS,
            )
    }

    fn is_timeout(&self) -> bool {
        matches!(self, GenAiError::Timeout(_))
    }
}
