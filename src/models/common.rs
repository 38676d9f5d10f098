use crate::error::{GenerationError, Result};
use crate::models::ImageReference;
use serde::Deserialize;

/// Error body returned by the provider on non-success responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    // Usually a string, occasionally a number or null.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub param: Option<String>,
}

impl ApiErrorBody {
    pub fn code_str(&self) -> Option<String> {
        match self.code.as_ref()? {
            serde_json::Value::String(code) => Some(code.clone()),
            serde_json::Value::Number(code) => Some(code.to_string()),
            _ => None,
        }
    }
}

/// The phrase a user submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    phrase: String,
}

impl GenerationRequest {
    pub fn new(phrase: impl Into<String>) -> Result<Self> {
        let phrase = phrase.into();
        if phrase.trim().is_empty() {
            return Err(GenerationError::EmptyPhrase);
        }
        Ok(Self { phrase })
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }
}

/// Output of one complete generation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub phrase: String,
    pub prompt: String,
    pub image: ImageReference,
}
