//! Provider configuration.

use std::time::Duration;

use crate::error::{GenAiError, GenAiResult};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration shared by the Gemini and Veo clients.
#[derive(Clone)]
pub struct GenAiConfig {
    /// API credential, sent as the `key` query parameter
    pub api_key: String,
    /// API root, without trailing slash
    pub base_url: String,
    /// Model used for script generation
    pub script_model: String,
    /// Model used for speech synthesis
    pub tts_model: String,
    /// Model used for video generation
    pub video_model: String,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
}

impl GenAiConfig {
    /// Create a config with default models for the given credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            script_model: "gemini-2.5-flash".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            video_model: "veo-2.0-generate-001".to_string(),
            http_timeout: Duration::from_secs(120),
        }
    }

    /// Point the clients at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create config from environment variables.
    ///
    /// `GEMINI_API_KEY` is required; everything else has a default.
    pub fn from_env() -> GenAiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenAiError::config_error("GEMINI_API_KEY not set"))?;

        let defaults = Self::new(api_key);
        Ok(Self {
            base_url: std::env::var("GEMINI_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url.clone()),
            script_model: std::env::var("REELGEN_SCRIPT_MODEL")
                .unwrap_or(defaults.script_model.clone()),
            tts_model: std::env::var("REELGEN_TTS_MODEL").unwrap_or(defaults.tts_model.clone()),
            video_model: std::env::var("REELGEN_VIDEO_MODEL")
                .unwrap_or(defaults.video_model.clone()),
            http_timeout: Duration::from_secs(
                std::env::var("REELGEN_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            ..defaults
        })
    }
}

// Keep the credential out of logs.
impl std::fmt::Debug for GenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("script_model", &self.script_model)
            .field("tts_model", &self.tts_model)
            .field("video_model", &self.video_model)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}
