//! Veo client for long-running image-to-video generation.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reelgen_models::ImageArtifact;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::config::GenAiConfig;
use crate::error::{GenAiError, GenAiResult};
use crate::http::{build_client, ensure_success};
use crate::provider::{VideoGenerator, VideoOperation};
use crate::types::{InlineImage, OperationResource, PredictRequest, VideoInstance, VideoParameters};

const ASPECT_RATIO: &str = "16:9";

/// Veo API client.
pub struct VeoClient {
    http: Client,
    config: GenAiConfig,
}

impl VeoClient {
    /// Create a new Veo client.
    pub fn new(config: GenAiConfig) -> GenAiResult<Self> {
        let http = build_client(&config)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(GenAiConfig::from_env()?)
    }

    /// Result URI with the credential appended as a query pair.
    fn authorized_uri(&self, result_uri: &str) -> GenAiResult<Url> {
        let mut url = Url::parse(result_uri)?;
        url.query_pairs_mut().append_pair("key", &self.config.api_key);
        Ok(url)
    }

    async fn read_operation(response: reqwest::Response) -> GenAiResult<VideoOperation> {
        let response = ensure_success(response).await?;
        let resource: OperationResource = response.json().await.map_err(|e| {
            GenAiError::invalid_response(format!("Failed to parse operation: {}", e.without_url()))
        })?;
        Ok(resource.into())
    }
}

#[async_trait]
impl VideoGenerator for VeoClient {
    async fn submit(&self, prompt: &str, image: &ImageArtifact) -> GenAiResult<VideoOperation> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.config.base_url, self.config.video_model
        );
        let request = PredictRequest {
            instances: vec![VideoInstance {
                prompt: prompt.to_string(),
                image: InlineImage {
                    bytes_base64_encoded: STANDARD.encode(&image.bytes),
                    mime_type: image.media_type.clone(),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio: ASPECT_RATIO.to_string(),
                sample_count: 1,
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(GenAiError::network)?;
        let operation = Self::read_operation(response).await?;

        info!(
            model = %self.config.video_model,
            operation = %operation.name,
            "Submitted video generation"
        );
        Ok(operation)
    }

    async fn poll(&self, operation: &VideoOperation) -> GenAiResult<VideoOperation> {
        let url = format!("{}/{}", self.config.base_url, operation.name);
        debug!(operation = %operation.name, "Polling video operation");

        let response = self
            .http
            .get(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(GenAiError::network)?;
        Self::read_operation(response).await
    }

    async fn fetch(&self, result_uri: &str) -> GenAiResult<Vec<u8>> {
        let url = self.authorized_uri(result_uri)?;
        let response = self.http.get(url).send().await.map_err(GenAiError::network)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::fetch_failed(status, &body));
        }

        let bytes = response.bytes().await.map_err(GenAiError::network)?;
        info!(bytes = bytes.len(), "Downloaded generated video");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> VeoClient {
        VeoClient::new(GenAiConfig::new("test-key").with_base_url(server.uri())).unwrap()
    }

    fn image() -> ImageArtifact {
        ImageArtifact::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png").unwrap()
    }

    #[tokio::test]
    async fn test_submit_returns_pending_operation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/veo-2.0-generate-001:predictLongRunning"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "models/veo-2.0-generate-001/operations/op1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let op = client_for(&server).submit("A sunrise", &image()).await.unwrap();
        assert_eq!(op, VideoOperation::pending("models/veo-2.0-generate-001/operations/op1"));
    }

    #[tokio::test]
    async fn test_poll_completed_operation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/veo-2.0-generate-001/operations/op1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "models/veo-2.0-generate-001/operations/op1",
                "done": true,
                "response": {"generateVideoResponse": {"generatedSamples": [
                    {"video": {"uri": "https://files.example/v1/video?alt=media"}}
                ]}}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let op = client
            .poll(&VideoOperation::pending("models/veo-2.0-generate-001/operations/op1"))
            .await
            .unwrap();
        assert!(op.done);
        assert_eq!(
            op.result_uri.as_deref(),
            Some("https://files.example/v1/video?alt=media")
        );
    }

    #[tokio::test]
    async fn test_fetch_appends_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/video"))
            .and(query_param("alt", "media"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8, 8, 9]))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let uri = format!("{}/download/video?alt=media", server.uri());
        assert_eq!(client.fetch(&uri).await.unwrap(), vec![7, 8, 9]);
    }

    #[tokio::test]
    async fn test_fetch_failure_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"message": "API key not valid"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let uri = format!("{}/download/video", server.uri());
        match client.fetch(&uri).await.unwrap_err() {
            GenAiError::Fetch { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_connection_failure_hides_api_key() {
        let client = VeoClient::new(GenAiConfig::new("SECRET-KEY-123")).unwrap();

        let err = client
            .fetch("http://127.0.0.1:9/v1/files/video?alt=media")
            .await
            .unwrap_err();

        assert!(matches!(err, GenAiError::Network(_)));
        assert!(!format!("{} {:?}", err, err).contains("SECRET-KEY-123"));
    }
}
