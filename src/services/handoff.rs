use crate::core::io::KeyValueStore;
use crate::core::state::{CharacterProfile, LocationProfile};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub const SELECTED_CHARACTER_KEY: &str = "selected_character";
pub const SELECTED_LOCATION_KEY: &str = "selected_location";

/// One-shot handoff of a gallery selection to the story form.
///
/// Backed by transient storage; each stashed value is read at most once.
#[derive(Clone)]
pub struct SelectionHandoff {
    storage: Arc<dyn KeyValueStore>,
}

impl SelectionHandoff {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn stash_character(&self, profile: &CharacterProfile) -> Result<()> {
        self.stash(SELECTED_CHARACTER_KEY, profile)
    }

    pub fn take_character(&self) -> Result<Option<CharacterProfile>> {
        self.take(SELECTED_CHARACTER_KEY)
    }

    pub fn stash_location(&self, profile: &LocationProfile) -> Result<()> {
        self.stash(SELECTED_LOCATION_KEY, profile)
    }

    pub fn take_location(&self) -> Result<Option<LocationProfile>> {
        self.take(SELECTED_LOCATION_KEY)
    }

    fn stash<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let content = serde_json::to_string(value)?;
        self.storage.set_item(key, &content)
    }

    fn take<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(content) = self.storage.get_item(key)? else {
            return Ok(None);
        };
        // Removed before parsing: a corrupt entry is discarded as well.
        self.storage.remove_item(key)?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Stored data under `{}` is corrupt", key))?;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::MemoryStorage;

    #[test]
    fn test_take_is_one_shot() -> Result<()> {
        let handoff = SelectionHandoff::new(Arc::new(MemoryStorage::new()));
        assert!(handoff.take_character()?.is_none());

        let profile = CharacterProfile {
            id: Some("1".to_string()),
            name: Some("テスト太郎".to_string()),
            ..Default::default()
        };
        handoff.stash_character(&profile)?;

        assert_eq!(handoff.take_character()?, Some(profile));
        assert!(handoff.take_character()?.is_none());
        Ok(())
    }

    #[test]
    fn test_character_and_location_are_independent() -> Result<()> {
        let handoff = SelectionHandoff::new(Arc::new(MemoryStorage::new()));
        handoff.stash_location(&LocationProfile {
            name: Some("サンプルホテル".to_string()),
            ..Default::default()
        })?;

        assert!(handoff.take_character()?.is_none());
        let location = handoff.take_location()?.unwrap();
        assert_eq!(location.name.as_deref(), Some("サンプルホテル"));
        Ok(())
    }

    #[test]
    fn test_corrupt_entry_is_removed() -> Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(SELECTED_LOCATION_KEY, "[[[")?;
        let handoff = SelectionHandoff::new(storage.clone());

        assert!(handoff.take_location().is_err());
        assert_eq!(storage.get_item(SELECTED_LOCATION_KEY)?, None);
        Ok(())
    }
}
