use crate::core::state::{Episode, SessionData};
use crate::services::api::{ContinueRequest, IdeasRequest, NovelBackend, StoryRequest};
use crate::services::store::StoryStore;
use anyhow::{bail, Result};
use log::info;

pub const DEFAULT_MODEL: &str = "xai";

/// Drives generation requests and records their results in the store.
pub struct StoryWorkflow {
    backend: Box<dyn NovelBackend>,
    store: StoryStore,
    default_model: String,
}

impl StoryWorkflow {
    pub fn new(backend: Box<dyn NovelBackend>, store: StoryStore) -> Self {
        Self {
            backend,
            store,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_default_model(mut self, model: &str) -> Self {
        self.default_model = model.to_string();
        self
    }

    pub fn store(&self) -> &StoryStore {
        &self.store
    }

    pub fn has_story(&self) -> Result<bool> {
        Ok(!self.store.episodes()?.is_empty())
    }

    pub async fn ideas(&self, genre: &str, model_choice: &str) -> Result<String> {
        let request = IdeasRequest {
            genre: genre.to_string(),
            model_choice: model_choice.to_string(),
        };
        self.backend.generate_ideas(&request).await
    }

    /// Generates the first episode of a new story.
    ///
    /// The session is replaced and the episode appended only after the
    /// backend answers successfully.
    pub async fn start(&self, request: &StoryRequest) -> Result<Vec<Episode>> {
        info!("Generating story (genre: {}, model: {})", request.genre, request.model_choice);
        let generated = self.backend.generate_story(request).await?;

        let episode = Episode {
            text: generated.novel_text,
            summary: generated.summary,
            title: generated.title,
            model: request.model_choice.clone(),
        };

        self.store.set_session_data(&SessionData::from(request))?;
        self.store.append_episode(episode)
    }

    pub async fn continue_story(&self) -> Result<Vec<Episode>> {
        let episodes = self.store.episodes()?;
        let Some(latest) = episodes.last() else {
            bail!("No story data to continue");
        };
        let session = self.store.session_data()?;

        let request = ContinueRequest::from_session(&session, &latest.summary, episodes.len() + 1);
        info!("Continuing story with episode {}", request.episode_number);
        let generated = self.backend.continue_story(&request).await?;

        let episode = Episode {
            text: generated.novel_text,
            summary: generated.summary,
            title: generated.title,
            model: session
                .model_choice
                .unwrap_or_else(|| self.default_model.clone()),
        };
        self.store.append_episode(episode)
    }

    pub fn restart(&self) -> Result<()> {
        self.store.clear_all()
    }
}
