pub mod classify;
pub mod image_client;
pub mod prompt_client;

use crate::{
    config::OpenAiConfig,
    error::{GenerationError, Result, Stage},
    models::ApiErrorEnvelope,
};
use classify::{classify, ProviderFailure};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

pub use image_client::ImageClient;
pub use prompt_client::PromptClient;

/// Entry point bundling the prompt and image clients over one HTTP pool.
#[derive(Clone)]
pub struct OpenAiClient {
    prompt_client: PromptClient,
    image_client: ImageClient,
}

impl OpenAiClient {
    /// Building the client never touches the network and does not require a
    /// key; each call checks the credential before sending anything.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GenerationError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: OpenAiConfig, http: reqwest::Client) -> Self {
        let config = Arc::new(config);
        Self {
            prompt_client: PromptClient::new(http.clone(), config.clone()),
            image_client: ImageClient::new(http, config),
        }
    }

    pub fn prompt(&self) -> &PromptClient {
        &self.prompt_client
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }
}

/// The provider never answered, so there is nothing to classify. The URL is
/// stripped so it cannot leak into the message.
fn transport_error(stage: Stage, err: reqwest::Error) -> GenerationError {
    GenerationError::Provider {
        stage,
        message: err.without_url().to_string(),
    }
}

/// POSTs `body` as JSON and decodes a success response, classifying anything
/// else for `stage`.
pub(crate) async fn post_json<B, R>(
    http: &reqwest::Client,
    config: &OpenAiConfig,
    path: &str,
    body: &B,
    stage: Stage,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let api_key = config.require_api_key()?;
    let url = config.endpoint(path);

    let response = http
        .post(&url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| {
            log::error!("Request to {} failed: {}", url, e);
            transport_error(stage, e)
        })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(stage, e))?;

    if !status.is_success() {
        let body = serde_json::from_str::<ApiErrorEnvelope>(&text)
            .ok()
            .map(|envelope| envelope.error);
        log::error!(
            "OpenAI {} call returned {}: code={:?} type={:?}",
            stage,
            status,
            body.as_ref().and_then(|b| b.code_str()),
            body.as_ref().and_then(|b| b.kind.clone())
        );
        return Err(classify(stage, ProviderFailure::from_response(status, body, &text)));
    }

    serde_json::from_str(&text).map_err(|e| {
        log::error!("Could not decode OpenAI {} response: {}", stage, e);
        GenerationError::Serialization(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationRequest;

    // Nothing listens on port 1; the path is full of classifier keywords.
    fn unreachable_client() -> OpenAiClient {
        let config = OpenAiConfig::new()
            .with_api_key("sk-test")
            .with_base_url("http://127.0.0.1:1/ratelimit-policy-401-authentication/v1");
        OpenAiClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_refused_connection_is_not_classified_from_url() {
        let client = unreachable_client();
        let request = GenerationRequest::new("Snowy Cabin").unwrap();

        match client.prompt().enrich(&request).await.unwrap_err() {
            GenerationError::Provider { stage, message } => {
                assert_eq!(stage, Stage::Prompt);
                assert!(!message.contains("ratelimit"), "url leaked: {}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_on_image_stage_is_not_policy() {
        let client = unreachable_client();

        let err = client.image().generate("a cabin").await.unwrap_err();
        assert!(
            matches!(err, GenerationError::Provider { stage: Stage::Image, .. }),
            "unexpected error: {:?}",
            err
        );
    }
}
