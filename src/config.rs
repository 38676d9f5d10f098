use crate::{
    error::{GenerationError, Result},
    models::ImageSize,
};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_MAX_TOKENS: u32 = 256;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const SAVE_FOLDER_NAME: &str = "Advent DALLE";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub image_size: ImageSize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_size: ImageSize::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl OpenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `OPENAI_*` and `ADVENT_*` variables; unset ones keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.api_key = env::var("OPENAI_API_KEY").ok();

        if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var("ADVENT_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Ok(model) = env::var("ADVENT_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Ok(size) = env::var("ADVENT_IMAGE_SIZE") {
            config.image_size = size.parse()?;
        }
        if let Ok(max_tokens) = env::var("ADVENT_MAX_TOKENS") {
            config.max_tokens = max_tokens.trim().parse().map_err(|_| {
                GenerationError::Config(format!("ADVENT_MAX_TOKENS is not a number: {}", max_tokens))
            })?;
        }
        if let Ok(temperature) = env::var("ADVENT_TEMPERATURE") {
            config.temperature = temperature.trim().parse().map_err(|_| {
                GenerationError::Config(format!(
                    "ADVENT_TEMPERATURE is not a number: {}",
                    temperature
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_models(
        mut self,
        chat_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        self.chat_model = chat_model.into();
        self.image_model = image_model.into();
        self
    }

    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.image_size = size;
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// The credential, or `MissingApiKey` when it is unset or blank.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(GenerationError::MissingApiKey),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.require_api_key().is_ok()
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GenerationError::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(GenerationError::Config("max_tokens must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SaveConfig {
    pub folder: PathBuf,
}

impl Default for SaveConfig {
    fn default() -> Self {
        SaveConfig {
            folder: default_save_folder(),
        }
    }
}

impl SaveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        match env::var("ADVENT_SAVE_DIR") {
            Ok(dir) if !dir.trim().is_empty() => SaveConfig {
                folder: PathBuf::from(dir),
            },
            _ => Self::default(),
        }
    }

    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = folder.into();
        self
    }
}

/// `<Pictures>/Advent DALLE`, falling back to `~/Pictures` and then the
/// working directory when the platform has no picture library.
pub fn default_save_folder() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SAVE_FOLDER_NAME)
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub openai: OpenAiConfig,
    pub save: SaveConfig,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        Ok(AppConfig {
            openai: OpenAiConfig::from_env()?,
            save: SaveConfig::from_env(),
        })
    }

    pub fn with_openai(mut self, config: OpenAiConfig) -> Self {
        self.openai = config;
        self
    }

    pub fn with_save(mut self, config: SaveConfig) -> Self {
        self.save = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_is_missing() {
        assert!(matches!(
            OpenAiConfig::new().require_api_key(),
            Err(GenerationError::MissingApiKey)
        ));
        assert!(matches!(
            OpenAiConfig::new().with_api_key("   ").require_api_key(),
            Err(GenerationError::MissingApiKey)
        ));
        assert_eq!(
            OpenAiConfig::new().with_api_key(" sk-test ").require_api_key().unwrap(),
            "sk-test"
        );
    }

    #[test]
    fn test_defaults_match_festive_workflow() {
        let config = OpenAiConfig::default();
        assert_eq!(config.chat_model, "gpt-4");
        assert_eq!(config.image_model, "dall-e-3");
        assert_eq!(config.image_size, ImageSize::Wide);
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.temperature, 1.0);
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = OpenAiConfig::new().with_base_url("http://localhost:9000/v1/");
        assert_eq!(
            config.endpoint("chat/completions"),
            "http://localhost:9000/v1/chat/completions"
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let config = OpenAiConfig::new().with_sampling(256, 3.5);
        assert!(matches!(config.validate(), Err(GenerationError::Config(_))));
    }

    #[test]
    fn test_default_save_folder_name() {
        assert!(SaveConfig::default().folder.ends_with(SAVE_FOLDER_NAME));
    }
}
