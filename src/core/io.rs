use anyhow::{anyhow, Result};
#[cfg(not(target_arch = "wasm32"))]
use anyhow::{bail, Context};
use std::collections::HashMap;
use std::sync::Mutex;

#[cfg(target_arch = "wasm32")]
pub use crate::core::web_io::WebStorage;

#[cfg(target_arch = "wasm32")]
pub trait StorageBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> StorageBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait StorageBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> StorageBounds for T {}

/// String key-value storage with browser `Storage` semantics.
///
/// Reads and writes are synchronous. Removing a key that does not exist is
/// not an error.
pub trait KeyValueStore: StorageBounds {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

// --- In-memory Implementation ---

#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| anyhow!("Memory storage lock poisoned"))
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// --- Native Implementation ---

/// One `<key>.json` file per key under a root directory.
#[cfg(not(target_arch = "wasm32"))]
pub struct FileStorage {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStorage {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create storage folder {}", root.display()))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<std::path::PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            bail!("Invalid storage key: {:?}", key);
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip_and_remove() -> Result<()> {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("a")?, None);

        storage.set_item("a", "1")?;
        storage.set_item("a", "2")?;
        assert_eq!(storage.get_item("a")?.as_deref(), Some("2"));

        storage.remove_item("a")?;
        storage.remove_item("a")?;
        assert_eq!(storage.get_item("a")?, None);
        Ok(())
    }

    #[test]
    fn test_file_storage_persists_across_instances() -> Result<()> {
        let dir = tempfile::tempdir()?;

        let first = FileStorage::new(dir.path())?;
        first.set_item("novel_story_list", "[]")?;

        let second = FileStorage::new(dir.path())?;
        assert_eq!(second.get_item("novel_story_list")?.as_deref(), Some("[]"));
        assert!(dir.path().join("novel_story_list.json").exists());
        assert!(!dir.path().join("novel_story_list.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_file_storage_remove_missing_key_is_ok() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = FileStorage::new(dir.path().join("nested"))?;

        storage.remove_item("selected_character")?;
        assert_eq!(storage.get_item("selected_character")?, None);
        Ok(())
    }

    #[test]
    fn test_file_storage_rejects_path_like_keys() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = FileStorage::new(dir.path())?;

        assert!(storage.set_item("../escape", "x").is_err());
        assert!(storage.get_item("").is_err());
        Ok(())
    }
}
