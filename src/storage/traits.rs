use crate::{error::Result, models::GenerationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Destination for a generated image and the prompt that produced it.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persists both artifacts or neither.
    async fn save(&self, result: &GenerationResult, image: &[u8]) -> Result<SavedArtifacts>;

    /// Human-readable description of where artifacts go.
    fn location(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifacts {
    pub image_path: PathBuf,
    pub prompt_path: PathBuf,
    pub saved_at: DateTime<Utc>,
}
