//! Gemini and Veo wire types.
//!
//! Only the fields the clients read or write are modelled.

use serde::{Deserialize, Serialize};

use crate::provider::{OperationError, VideoOperation};

/// `generateContent` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

impl GenerateContentRequest {
    pub fn text(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: None,
        }
    }

    pub fn speech(text: &str, voice_name: &str) -> Self {
        Self {
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice_name.to_string(),
                        },
                    },
                }),
            }),
            ..Self::text(text)
        }
    }
}

/// `generateContent` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<ResponseContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl GenerateContentResponse {
    /// Safety block reason, from prompt feedback or a SAFETY finish.
    pub fn block_reason(&self) -> Option<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Some(reason);
        }
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.clone())
            .filter(|r| r == "SAFETY" || r == "PROHIBITED_CONTENT")
    }

    fn parts(&self) -> impl Iterator<Item = &ResponsePart> + '_ {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|c| c.parts.iter())
    }

    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        Some(text).filter(|t| !t.trim().is_empty())
    }

    /// First inline binary part of the first candidate.
    pub fn inline_data(&self) -> Option<&InlineData> {
        self.parts().find_map(|p| p.inline_data.as_ref())
    }
}

/// `predictLongRunning` request.
#[derive(Debug, Serialize)]
pub(crate) struct PredictRequest {
    pub instances: Vec<VideoInstance>,
    pub parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
pub(crate) struct VideoInstance {
    pub prompt: String,
    pub image: InlineImage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineImage {
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoParameters {
    pub aspect_ratio: String,
    pub sample_count: u32,
}

/// Long-running operation resource.
#[derive(Debug, Deserialize)]
pub(crate) struct OperationResource {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationStatus>,
    #[serde(default)]
    pub response: Option<OperationPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationStatus {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationPayload {
    #[serde(default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    pub rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeneratedSample {
    #[serde(default)]
    pub video: Option<VideoReference>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoReference {
    #[serde(default)]
    pub uri: Option<String>,
}

impl From<OperationResource> for VideoOperation {
    fn from(resource: OperationResource) -> Self {
        let video_response = resource
            .response
            .and_then(|r| r.generate_video_response);

        let (result_uri, filtered_reasons) = match video_response {
            Some(v) => (
                v.generated_samples
                    .into_iter()
                    .find_map(|s| s.video.and_then(|video| video.uri)),
                v.rai_media_filtered_reasons,
            ),
            None => (None, Vec::new()),
        };

        Self {
            name: resource.name,
            done: resource.done,
            error: resource.error.map(|e| OperationError {
                code: e.code,
                message: e.message,
            }),
            result_uri,
            filtered_reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_request_shape() {
        let request = GenerateContentRequest::speech("Hello", "Kore");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(json["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            json["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Kore"
        );
    }

    #[test]
    fn test_text_request_omits_generation_config() {
        let json = serde_json::to_value(GenerateContentRequest::text("hi")).unwrap();
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_text_and_block_reason() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Part one. "},{"text":"Part two."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Part one. Part two."));
        assert!(response.block_reason().is_none());

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert_eq!(blocked.block_reason().as_deref(), Some("SAFETY"));
        assert!(blocked.text().is_none());
    }

    #[test]
    fn test_operation_conversion() {
        let resource: OperationResource = serde_json::from_str(
            r#"{
                "name": "models/veo/operations/abc",
                "done": true,
                "response": {"generateVideoResponse": {"generatedSamples": [{"video": {"uri": "https://files/v1?alt=media"}}]}}
            }"#,
        )
        .unwrap();
        let op = VideoOperation::from(resource);
        assert!(op.done);
        assert_eq!(op.result_uri.as_deref(), Some("https://files/v1?alt=media"));
        assert!(op.error.is_none());
    }

    #[test]
    fn test_operation_conversion_filtered() {
        let resource: OperationResource = serde_json::from_str(
            r#"{
                "name": "models/veo/operations/abc",
                "done": true,
                "response": {"generateVideoResponse": {"raiMediaFilteredReasons": ["celebrity likeness"]}}
            }"#,
        )
        .unwrap();
        let op = VideoOperation::from(resource);
        assert!(op.result_uri.is_none());
        assert_eq!(op.filtered_reasons, vec!["celebrity likeness".to_string()]);
    }

    #[test]
    fn test_pending_operation_defaults() {
        let resource: OperationResource =
            serde_json::from_str(r#"{"name": "operations/1"}"#).unwrap();
        let op = VideoOperation::from(resource);
        assert!(!op.done);
        assert_eq!(op, VideoOperation::pending("operations/1"));
    }
}
