use crate::{
    config::OpenAiConfig,
    error::{GenerationError, Result, Stage},
    models::{ImageGenerationRequest, ImageGenerationResponse, ImageReference},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;

#[derive(Clone)]
pub struct ImageClient {
    http: reqwest::Client,
    config: Arc<OpenAiConfig>,
}

impl ImageClient {
    pub fn new(http: reqwest::Client, config: Arc<OpenAiConfig>) -> Self {
        Self { http, config }
    }

    pub fn build_request(&self, prompt: &str) -> ImageGenerationRequest {
        ImageGenerationRequest {
            model: self.config.image_model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.config.image_size,
            response_format: "url".to_string(),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<ImageReference> {
        self.config.require_api_key()?;

        let payload = self.build_request(prompt);
        log::info!(
            "Generating {} image with model: {}",
            payload.size,
            payload.model
        );

        let response: ImageGenerationResponse = super::post_json(
            &self.http,
            &self.config,
            "images/generations",
            &payload,
            Stage::Image,
        )
        .await?;

        let image = response.data.into_iter().next().ok_or_else(|| {
            GenerationError::Provider {
                stage: Stage::Image,
                message: "no images generated".into(),
            }
        })?;

        if let Some(revised) = &image.revised_prompt {
            log::debug!("Provider revised the prompt to: {}", revised);
        }

        match (image.url, image.b64_json) {
            (Some(url), _) if !url.is_empty() => Ok(ImageReference::Url(url)),
            (_, Some(data)) => STANDARD
                .decode(data.trim())
                .map(ImageReference::Inline)
                .map_err(|e| GenerationError::Serialization(format!("invalid b64_json: {}", e))),
            _ => Err(GenerationError::Provider {
                stage: Stage::Image,
                message: "the image had neither a url nor inline data".into(),
            }),
        }
    }

    /// Downloads the bytes behind `image`. Inline images are returned as is.
    pub async fn fetch(&self, image: &ImageReference) -> Result<Vec<u8>> {
        let url = match image {
            ImageReference::Inline(bytes) => return Ok(bytes.clone()),
            ImageReference::Url(url) => url,
        };

        log::debug!("Fetching image from {}", url);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Network(format!(
                "image download returned {}",
                status
            )));
        }

        let bytes = response.bytes().await?;
        log::debug!("Fetched {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}
