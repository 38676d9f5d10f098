use crate::{
    config::OpenAiConfig,
    error::{GenerationError, Result, Stage},
    models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, GenerationRequest},
};
use std::sync::Arc;

pub const SYSTEM_INSTRUCTION: &str = "Create a prompt for Dall-e that will generate a beautiful Christmas scene using the following text for inspiration:";

/// Turns a user phrase into an image-generation prompt via chat completions.
#[derive(Clone)]
pub struct PromptClient {
    http: reqwest::Client,
    config: Arc<OpenAiConfig>,
}

impl PromptClient {
    pub fn new(http: reqwest::Client, config: Arc<OpenAiConfig>) -> Self {
        Self { http, config }
    }

    pub fn build_request(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.chat_model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(request.phrase()),
            ],
            n: 1,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    pub async fn enrich(&self, request: &GenerationRequest) -> Result<String> {
        self.config.require_api_key()?;

        let payload = self.build_request(request);
        log::info!("Enriching phrase with model: {}", payload.model);
        log::debug!(
            "Chat completion request payload: {}",
            serde_json::to_string(&payload).unwrap_or_default()
        );

        let response: ChatCompletionResponse = super::post_json(
            &self.http,
            &self.config,
            "chat/completions",
            &payload,
            Stage::Prompt,
        )
        .await?;

        if let Some(usage) = &response.usage {
            log::debug!(
                "Prompt tokens: {}, completion tokens: {}",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            GenerationError::Provider {
                stage: Stage::Prompt,
                message: "the response contained no choices".into(),
            }
        })?;

        if let Some(reason) = &choice.finish_reason {
            if reason == "length" {
                log::warn!("Enriched prompt was cut off at {} tokens", self.config.max_tokens);
            }
        }

        match choice.message.content.map(|c| c.trim().to_string()) {
            Some(content) if !content.is_empty() => Ok(content),
            _ => Err(GenerationError::Provider {
                stage: Stage::Prompt,
                message: "the response contained an empty message".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatRole;

    #[test]
    fn test_request_shape() {
        let config = OpenAiConfig::new().with_api_key("sk-test");
        let client = PromptClient::new(reqwest::Client::new(), Arc::new(config));
        let request = GenerationRequest::new("Snowy Cabin").unwrap();

        let payload = client.build_request(&request);
        assert_eq!(payload.n, 1);
        assert_eq!(payload.max_tokens, 256);
        assert_eq!(payload.temperature, 1.0);
        assert_eq!(payload.messages.len(), 2);
        assert_eq!(payload.messages[0].role, ChatRole::System);
        assert_eq!(payload.messages[0].content, SYSTEM_INSTRUCTION);
        assert_eq!(payload.messages[1].role, ChatRole::User);
        assert_eq!(payload.messages[1].content, "Snowy Cabin");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["temperature"], 1.0);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_io() {
        // Port 9 is discard; nothing should ever be sent there.
        let config = OpenAiConfig::new().with_base_url("http://127.0.0.1:9");
        let client = PromptClient::new(reqwest::Client::new(), Arc::new(config));
        let request = GenerationRequest::new("Snowy Cabin").unwrap();

        let err = client.enrich(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey));
    }
}
