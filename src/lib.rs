pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod notification;
pub mod openai;
pub mod session;
pub mod storage;

pub use config::{AppConfig, OpenAiConfig, SaveConfig};
pub use error::{GenerationError, Result, Stage};
pub use models::{GenerationRequest, GenerationResult, ImageReference, ImageSize};
pub use notification::{Action, Notification, NotificationKind};
pub use openai::{ImageClient, OpenAiClient, PromptClient};
pub use session::{Session, SessionState};
pub use storage::{ArtifactStore, FolderStore, SavedArtifacts};
