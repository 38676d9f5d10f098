//! Headless interaction state for one user.
//!
//! A `Session` owns the last successful generation and decides which
//! actions are currently allowed. Only one generate or save runs at a time;
//! the guard lives here, not in whatever front end drives the session.

use crate::{
    config::AppConfig,
    error::{GenerationError, Result},
    logger,
    models::{GenerationRequest, GenerationResult},
    notification::{Action, Notification},
    openai::OpenAiClient,
    storage::{ArtifactStore, FolderStore, SavedArtifacts},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Generate available, nothing to save.
    Idle,
    /// A generate or save is in flight.
    Working,
    /// The last generation succeeded and can be saved.
    ResultReady,
}

struct Inner {
    state: SessionState,
    last_result: Option<GenerationResult>,
}

pub struct Session {
    client: OpenAiClient,
    store: Arc<dyn ArtifactStore>,
    inner: Mutex<Inner>,
    busy: AtomicBool,
}

/// Held for the duration of one action. Dropping it without `finish`
/// (error, cancellation) puts the session back where it was.
struct Flight<'a> {
    session: &'a Session,
    prior: SessionState,
    finished: bool,
}

impl Flight<'_> {
    fn finish(mut self, next: SessionState) {
        self.session.lock().state = next;
        self.finished = true;
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.session.lock().state = self.prior;
        }
        self.session.busy.store(false, Ordering::Release);
    }
}

impl Session {
    pub fn new(client: OpenAiClient, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            client,
            store,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                last_result: None,
            }),
            busy: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = OpenAiClient::new(config.openai.clone())?;
        let store = Arc::new(FolderStore::new(config.save.folder.clone()));
        Ok(Self::new(client, store))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<Flight<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("Rejected action: session is busy");
            return Err(GenerationError::Busy);
        }

        let mut inner = self.lock();
        let prior = inner.state;
        inner.state = SessionState::Working;
        Ok(Flight {
            session: self,
            prior,
            finished: false,
        })
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn can_generate(&self) -> bool {
        self.state() != SessionState::Working
    }

    pub fn can_save(&self) -> bool {
        self.state() == SessionState::ResultReady
    }

    pub fn last_result(&self) -> Option<GenerationResult> {
        self.lock().last_result.clone()
    }

    pub fn save_location(&self) -> String {
        self.store.location()
    }

    pub async fn generate(&self, phrase: &str) -> Result<GenerationResult> {
        self.generate_with_progress(phrase, |_| {}).await
    }

    /// Runs one generation cycle. `on_prompt` sees the enriched prompt as
    /// soon as it exists, before the image call starts.
    ///
    /// The result is committed only once both calls succeed; on failure the
    /// previous result (if any) stays current.
    pub async fn generate_with_progress<F>(
        &self,
        phrase: &str,
        on_prompt: F,
    ) -> Result<GenerationResult>
    where
        F: FnOnce(&str) + Send,
    {
        let request = GenerationRequest::new(phrase)?;
        let flight = self.begin()?;
        let _timer = logger::timer("generation cycle");

        let prompt = self.client.prompt().enrich(&request).await?;
        log::info!("Enriched prompt ready ({} chars)", prompt.len());
        on_prompt(&prompt);

        let image = self.client.image().generate(&prompt).await?;
        log::info!("Image ready: {}", image);

        let result = GenerationResult {
            phrase: request.phrase().to_string(),
            prompt,
            image,
        };
        self.lock().last_result = Some(result.clone());
        flight.finish(SessionState::ResultReady);
        Ok(result)
    }

    /// Downloads the current image and stores it next to its prompt.
    pub async fn save(&self) -> Result<SavedArtifacts> {
        let flight = self.begin()?;
        let result = match flight.prior {
            SessionState::ResultReady => self.last_result(),
            _ => None,
        }
        .ok_or(GenerationError::NothingToSave)?;

        let bytes = self.client.image().fetch(&result.image).await?;
        let saved = self.store.save(&result, &bytes).await?;
        flight.finish(SessionState::Idle);
        Ok(saved)
    }

    /// Bytes of the current image, for display. Does not change state.
    pub async fn current_image(&self) -> Result<Vec<u8>> {
        let result = self.last_result().ok_or(GenerationError::NothingToSave)?;
        self.client.image().fetch(&result.image).await
    }

    /// `generate` wrapped as a notification, the way a front end reports it.
    pub async fn generate_and_notify(
        &self,
        phrase: &str,
    ) -> (Option<GenerationResult>, Option<Notification>) {
        match self.generate(phrase).await {
            Ok(result) => (Some(result), None),
            Err(e) => {
                log::error!("Generation failed: {}", e);
                (None, Some(Notification::from_error(Action::Generate, &e)))
            }
        }
    }

    pub async fn save_and_notify(&self) -> Notification {
        match self.save().await {
            Ok(saved) => Notification::saved(&saved),
            Err(e) => {
                log::error!("Save failed: {}", e);
                Notification::from_error(Action::Save, &e)
            }
        }
    }

    pub fn spawn_generate(
        self: &Arc<Self>,
        phrase: impl Into<String>,
    ) -> JoinHandle<Result<GenerationResult>> {
        let session = Arc::clone(self);
        let phrase = phrase.into();
        tokio::spawn(async move { session.generate(&phrase).await })
    }

    pub fn spawn_save(self: &Arc<Self>) -> JoinHandle<Result<SavedArtifacts>> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.save().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;

    fn offline_session(config: OpenAiConfig) -> Session {
        let dir = std::env::temp_dir().join("advent-gen-session-tests");
        Session::new(
            OpenAiClient::new(config).unwrap(),
            Arc::new(FolderStore::new(dir)),
        )
    }

    #[test]
    fn test_starts_idle() {
        let session = offline_session(OpenAiConfig::new());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.can_generate());
        assert!(!session.can_save());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_save_before_generate_is_rejected() {
        let session = offline_session(OpenAiConfig::new());
        assert!(matches!(
            session.save().await,
            Err(GenerationError::NothingToSave)
        ));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_missing_key_returns_to_idle() {
        let session = offline_session(OpenAiConfig::new().with_base_url("http://127.0.0.1:9"));
        let (result, notification) = session.generate_and_notify("Snowy Cabin").await;
        assert!(result.is_none());
        let notification = notification.unwrap();
        assert_eq!(notification.title, "OpenAI API Key Missing");
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_blank_phrase_does_not_enter_working() {
        let session = offline_session(OpenAiConfig::new().with_api_key("sk-test"));
        assert!(matches!(
            session.generate("   ").await,
            Err(GenerationError::EmptyPhrase)
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_flight_guard_is_exclusive_and_restores_state() {
        let session = offline_session(OpenAiConfig::new());
        let flight = session.begin().unwrap();
        assert_eq!(session.state(), SessionState::Working);
        assert!(matches!(session.begin(), Err(GenerationError::Busy)));
        drop(flight);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.begin().is_ok());
    }
}
