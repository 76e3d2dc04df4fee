//! Gemini client for script generation and speech synthesis.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reelgen_models::{AudioArtifact, VoicePreference};
use reqwest::Client;
use tracing::{debug, info};

use crate::config::GenAiConfig;
use crate::error::{GenAiError, GenAiResult};
use crate::http::{build_client, ensure_success};
use crate::provider::{ScriptGenerator, VoiceGenerator};
use crate::types::{GenerateContentRequest, GenerateContentResponse};

/// Gemini API client.
pub struct GeminiClient {
    http: Client,
    config: GenAiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(config: GenAiConfig) -> GenAiResult<Self> {
        let http = build_client(&config)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(GenAiConfig::from_env()?)
    }

    /// Prebuilt voice for a preference.
    pub fn voice_name(voice: VoicePreference) -> &'static str {
        match voice {
            VoicePreference::Female => "Kore",
            VoicePreference::Male => "Charon",
        }
    }

    /// Call `generateContent` on a model.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> GenAiResult<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        debug!(model = %model, "Calling Gemini generateContent");

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(GenAiError::network)?;

        let response = ensure_success(response).await?;
        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| {
                GenAiError::invalid_response(format!(
                    "Failed to parse Gemini response: {}",
                    e.without_url()
                ))
            })?;

        if let Some(reason) = body.block_reason() {
            return Err(GenAiError::Blocked(reason));
        }
        Ok(body)
    }
}

#[async_trait]
impl ScriptGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> GenAiResult<String> {
        let request = GenerateContentRequest::text(prompt);
        let response = self
            .generate_content(&self.config.script_model, &request)
            .await?;

        let script = response
            .text()
            .ok_or_else(|| GenAiError::missing_result("Gemini returned no script text"))?;

        info!(
            model = %self.config.script_model,
            chars = script.len(),
            "Generated script"
        );
        Ok(script.trim().to_string())
    }
}

#[async_trait]
impl VoiceGenerator for GeminiClient {
    async fn generate(&self, text: &str, voice: VoicePreference) -> GenAiResult<AudioArtifact> {
        let voice_name = Self::voice_name(voice);
        let request = GenerateContentRequest::speech(text, voice_name);
        let response = self.generate_content(&self.config.tts_model, &request).await?;

        let inline = response
            .inline_data()
            .ok_or_else(|| GenAiError::missing_result("Gemini returned no audio data"))?;
        let bytes = STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| GenAiError::invalid_response(format!("Invalid base64 audio: {}", e)))?;

        info!(
            model = %self.config.tts_model,
            voice = %voice_name,
            bytes = bytes.len(),
            "Generated narration audio"
        );
        Ok(AudioArtifact::new(bytes, inline.mime_type.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_models::FailureSignal;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(GenAiConfig::new("test-key").with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_generate_script() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "  A short script.  "}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let script = ScriptGenerator::generate(&client, "topic").await.unwrap();
        assert_eq!(script, "A short script.");
    }

    #[tokio::test]
    async fn test_generate_script_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = ScriptGenerator::generate(&client, "topic").await.unwrap_err();
        assert!(err.is_rate_limit());
    }

    #[tokio::test]
    async fn test_generate_script_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = ScriptGenerator::generate(&client, "topic").await.unwrap_err();
        assert!(matches!(err, GenAiError::Blocked(_)));
        assert!(err.is_policy_violation());
    }

    #[tokio::test]
    async fn test_generate_script_empty_is_missing_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": []}}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = ScriptGenerator::generate(&client, "topic").await.unwrap_err();
        assert!(err.is_missing_result());
    }

    #[tokio::test]
    async fn test_generate_speech() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash-preview-tts:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"inlineData": {
                    "mimeType": "audio/L16;codec=pcm;rate=24000",
                    "data": STANDARD.encode([1u8, 2, 3, 4])
                }}]}}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let audio = VoiceGenerator::generate(&client, "Hello", VoicePreference::Male)
            .await
            .unwrap();
        assert_eq!(audio.bytes, vec![1, 2, 3, 4]);
        assert_eq!(audio.media_type, "audio/L16;codec=pcm;rate=24000");
    }

    #[test]
    fn test_voice_names() {
        assert_eq!(GeminiClient::voice_name(VoicePreference::Female), "Kore");
        assert_eq!(GeminiClient::voice_name(VoicePreference::Male), "Charon");
    }

    #[tokio::test]
    async fn test_connection_failure_hides_api_key() {
        let config = GenAiConfig::new("SECRET-KEY-123").with_base_url("http://127.0.0.1:9");
        let client = GeminiClient::new(config).unwrap();

        let err = ScriptGenerator::generate(&client, "topic").await.unwrap_err();

        assert!(matches!(err, GenAiError::Network(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!err.failure_text().contains("SECRET-KEY-123"));
    }
}
