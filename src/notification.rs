use crate::{error::GenerationError, storage::SavedArtifacts};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// User action a notification reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Generate,
    Save,
    /// Fetching the current image to show it.
    Display,
}

impl Action {
    fn failure_title(&self) -> &'static str {
        match self {
            Action::Generate => "Error Generating Image",
            Action::Save => "Error Saving Image",
            Action::Display => "Error Displaying Image",
        }
    }
}

/// A dismissible, one-line message for the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn saved(saved: &SavedArtifacts) -> Self {
        Self::success("Image Saved", saved.image_path.display().to_string())
    }

    pub fn from_error(action: Action, err: &GenerationError) -> Self {
        let title = err.title().unwrap_or_else(|| action.failure_title());
        Self::error(title, err.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}
