use std::fmt;
use thiserror::Error;

/// Which remote call a provider failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prompt,
    Image,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Prompt => write!(f, "prompt"),
            Stage::Image => write!(f, "image"),
        }
    }
}

/// Every failure the generate and save flows can surface.
///
/// The `Display` text of each variant is the one-line message shown to the
/// user, so front ends can render `err.to_string()` directly.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("OpenAI API key missing. Set OPENAI_API_KEY (or add it to a .env file); keys are issued at https://platform.openai.com/")]
    MissingApiKey,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid OpenAI API key. Please check your API key and ensure it's valid.")]
    Authentication,

    #[error("OpenAI API quota exceeded. Please check your usage limits or billing information.")]
    QuotaExceeded,

    #[error("The generated prompt violates OpenAI's content policy. Please try a different input.")]
    ContentPolicy,

    #[error("OpenAI API error while generating {stage}: {message}")]
    Provider { stage: Stage, message: String },

    #[error("Could not write to disk: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not download the image: {0}")]
    Network(String),

    #[error("Unexpected response from OpenAI: {0}")]
    Serialization(String),

    #[error("Please enter a phrase to generate an image from.")]
    EmptyPhrase,

    #[error("\"{0}\" cannot be used as a file name")]
    InvalidFileName(String),

    #[error("Another generation or save is still running.")]
    Busy,

    #[error("Nothing to save yet. Generate an image first.")]
    NothingToSave,
}

impl GenerationError {
    /// Notification title for categories that deserve their own heading;
    /// `None` lets the caller title it after the action that failed.
    pub fn title(&self) -> Option<&'static str> {
        match self {
            GenerationError::MissingApiKey => Some("OpenAI API Key Missing"),
            GenerationError::Config(_) => Some("Configuration Error"),
            GenerationError::Authentication => Some("Authentication Failed"),
            GenerationError::QuotaExceeded => Some("Quota Exceeded"),
            GenerationError::ContentPolicy => Some("Content Policy Violation"),
            GenerationError::Busy => Some("Busy"),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_names_stage() {
        let err = GenerationError::Provider {
            stage: Stage::Image,
            message: "server exploded".into(),
        };
        assert_eq!(
            err.to_string(),
            "OpenAI API error while generating image: server exploded"
        );
        assert_eq!(err.title(), None);
    }

    #[test]
    fn test_titles() {
        assert_eq!(
            GenerationError::MissingApiKey.title(),
            Some("OpenAI API Key Missing")
        );
        assert_eq!(GenerationError::ContentPolicy.title(), Some("Content Policy Violation"));
        assert_eq!(GenerationError::NothingToSave.title(), None);
    }
}
