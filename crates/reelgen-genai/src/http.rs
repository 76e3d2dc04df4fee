//! Shared HTTP plumbing for the provider clients.

use reqwest::{Client, Response};

use crate::config::GenAiConfig;
use crate::error::{GenAiError, GenAiResult};

pub(crate) fn build_client(config: &GenAiConfig) -> GenAiResult<Client> {
    Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(GenAiError::network)
}

/// Turn a non-success API response into a `GenAiError`.
pub(crate) async fn ensure_success(response: Response) -> GenAiResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(GenAiError::from_http_status(status, &body))
}
