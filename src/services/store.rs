use crate::core::io::KeyValueStore;
use crate::core::state::{Episode, SessionData, Snapshot, StoryContext};
use anyhow::{Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use serde_json::Value;
use std::sync::Arc;

pub const STORY_LIST_KEY: &str = "novel_story_list";
pub const SESSION_DATA_KEY: &str = "novel_session_data";

/// Episode list and session configuration on top of a key-value scope.
///
/// The two keys are written independently; nothing ties their updates
/// together.
#[derive(Clone)]
pub struct StoryStore {
    storage: Arc<dyn KeyValueStore>,
}

impl StoryStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn episodes(&self) -> Result<Vec<Episode>> {
        match self.storage.get_item(STORY_LIST_KEY)? {
            Some(content) => serde_json::from_str(&content)
                .with_context(|| format!("Stored data under `{}` is corrupt", STORY_LIST_KEY)),
            None => Ok(Vec::new()),
        }
    }

    pub fn episode(&self, index: usize) -> Result<Option<Episode>> {
        Ok(self.episodes()?.into_iter().nth(index))
    }

    pub fn save_episodes(&self, episodes: &[Episode]) -> Result<()> {
        let content = serde_json::to_string(episodes)?;
        self.storage.set_item(STORY_LIST_KEY, &content)
    }

    /// Read-modify-write; a concurrent writer on the same scope can lose updates.
    pub fn append_episode(&self, episode: Episode) -> Result<Vec<Episode>> {
        let mut episodes = self.episodes()?;
        episodes.push(episode);
        self.save_episodes(&episodes)?;
        info!("Stored episode {}", episodes.len());
        Ok(episodes)
    }

    pub fn session_data(&self) -> Result<SessionData> {
        match self.storage.get_item(SESSION_DATA_KEY)? {
            Some(content) => serde_json::from_str(&content)
                .with_context(|| format!("Stored data under `{}` is corrupt", SESSION_DATA_KEY)),
            None => Ok(SessionData::default()),
        }
    }

    pub fn set_session_data(&self, session: &SessionData) -> Result<()> {
        let content = serde_json::to_string(session)?;
        self.storage.set_item(SESSION_DATA_KEY, &content)
    }

    pub fn latest_context(&self) -> Result<Option<StoryContext>> {
        let episodes = self.episodes()?;
        let Some(latest) = episodes.last() else {
            return Ok(None);
        };
        let session = self.session_data()?;

        Ok(Some(StoryContext {
            summary: latest.summary.clone(),
            episode_number: episodes.len(),
            title: latest.title.clone(),
            model: latest.model.clone(),
            genre: session.genre,
            prompt: session.prompt,
            characters: session.characters,
        }))
    }

    pub fn clear_all(&self) -> Result<()> {
        self.storage.remove_item(STORY_LIST_KEY)?;
        self.storage.remove_item(SESSION_DATA_KEY)?;
        info!("Cleared story and session data");
        Ok(())
    }

    pub fn export_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            episodes: self.episodes()?,
            session_data: self.session_data()?,
            export_timestamp: Utc::now(),
        })
    }

    /// Replaces stored state with `snapshot`.
    ///
    /// Requires an `episodes` (or legacy `storyList`) array. Session data is
    /// only written when the snapshot carries it. Everything is decoded
    /// before the first write, so a rejected snapshot leaves storage as it was.
    pub fn import_snapshot(&self, snapshot: &Value) -> bool {
        let Some(fields) = snapshot.as_object() else {
            warn!("Import rejected: snapshot is not an object");
            return false;
        };

        let episodes_value = fields.get("episodes").or_else(|| fields.get("storyList"));
        let episodes: Vec<Episode> = match episodes_value {
            Some(value @ Value::Array(_)) => match serde_json::from_value(value.clone()) {
                Ok(episodes) => episodes,
                Err(e) => {
                    warn!("Import rejected: malformed episode: {}", e);
                    return false;
                }
            },
            _ => {
                warn!("Import rejected: `episodes` is missing or not an array");
                return false;
            }
        };

        let session: Option<SessionData> = match fields.get("sessionData") {
            None | Some(Value::Null) => None,
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!("Import rejected: malformed session data: {}", e);
                    return false;
                }
            },
        };

        if let Err(e) = self.save_episodes(&episodes) {
            error!("Failed to import episodes: {:#}", e);
            return false;
        }
        if let Some(session) = session {
            if let Err(e) = self.set_session_data(&session) {
                error!("Failed to import session data: {:#}", e);
                return false;
            }
        }

        info!("Imported {} episodes", episodes.len());
        true
    }

    pub fn import_snapshot_str(&self, content: &str) -> bool {
        match serde_json::from_str::<Value>(content) {
            Ok(value) => self.import_snapshot(&value),
            Err(e) => {
                warn!("Import rejected: not valid JSON: {}", e);
                false
            }
        }
    }
}
