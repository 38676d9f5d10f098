use super::{sanitize_file_name, ArtifactStore, SavedArtifacts};
use crate::{error::Result, models::GenerationResult};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Writes `<phrase>.png` and `<phrase>.txt` into one folder, overwriting
/// files of the same name.
#[derive(Debug, Clone)]
pub struct FolderStore {
    folder: PathBuf,
}

impl FolderStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Final paths for `phrase`, without touching the filesystem.
    pub fn paths_for(&self, phrase: &str) -> Result<(PathBuf, PathBuf)> {
        let name = sanitize_file_name(phrase)?;
        Ok((
            self.folder.join(format!("{}.png", name)),
            self.folder.join(format!("{}.txt", name)),
        ))
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(".part");
    PathBuf::from(staged)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Could not clean up {}: {}", path.display(), e);
        }
    }
}

#[async_trait]
impl ArtifactStore for FolderStore {
    async fn save(&self, result: &GenerationResult, image: &[u8]) -> Result<SavedArtifacts> {
        let (image_path, prompt_path) = self.paths_for(&result.phrase)?;
        fs::create_dir_all(&self.folder).await?;

        let staged_image = staging_path(&image_path);
        let staged_prompt = staging_path(&prompt_path);

        let staged = async {
            fs::write(&staged_image, image).await?;
            fs::write(&staged_prompt, result.prompt.as_bytes()).await
        }
        .await;
        if let Err(e) = staged {
            remove_quietly(&staged_image).await;
            remove_quietly(&staged_prompt).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&staged_image, &image_path).await {
            remove_quietly(&staged_image).await;
            remove_quietly(&staged_prompt).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&staged_prompt, &prompt_path).await {
            // The image is already in place; drop it so the pair stays consistent.
            remove_quietly(&image_path).await;
            remove_quietly(&staged_prompt).await;
            return Err(e.into());
        }

        log::info!("Saved {} and {}", image_path.display(), prompt_path.display());
        Ok(SavedArtifacts {
            image_path,
            prompt_path,
            saved_at: Utc::now(),
        })
    }

    fn location(&self) -> String {
        self.folder.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageReference;

    fn result(phrase: &str, prompt: &str) -> GenerationResult {
        GenerationResult {
            phrase: phrase.to_string(),
            prompt: prompt.to_string(),
            image: ImageReference::Url("http://example.invalid/a.png".into()),
        }
    }

    #[tokio::test]
    async fn test_save_creates_folder_and_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderStore::new(dir.path().join("Advent DALLE"));

        let saved = store
            .save(&result("Snowy Cabin", "A cozy cabin under falling snow"), b"PNGDATA")
            .await
            .unwrap();

        assert_eq!(saved.image_path, dir.path().join("Advent DALLE/Snowy Cabin.png"));
        assert_eq!(saved.prompt_path, dir.path().join("Advent DALLE/Snowy Cabin.txt"));
        assert_eq!(std::fs::read(&saved.image_path).unwrap(), b"PNGDATA");
        assert_eq!(
            std::fs::read_to_string(&saved.prompt_path).unwrap(),
            "A cozy cabin under falling snow"
        );
    }

    #[tokio::test]
    async fn test_resave_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderStore::new(dir.path());

        store.save(&result("Snowy Cabin", "first"), b"one").await.unwrap();
        let saved = store.save(&result("Snowy Cabin", "second"), b"two").await.unwrap();

        assert_eq!(std::fs::read(&saved.image_path).unwrap(), b"two");
        assert_eq!(std::fs::read_to_string(&saved.prompt_path).unwrap(), "second");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_folder_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let store = FolderStore::new(&blocker);

        let err = store
            .save(&result("Snowy Cabin", "prompt"), b"img")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::GenerationError::Io(_)));
    }
}
