use crate::core::io::KeyValueStore;
use anyhow::{anyhow, Result};

/// `window.localStorage` or `window.sessionStorage`.
pub struct WebStorage {
    storage: web_sys::Storage,
}

impl WebStorage {
    pub fn local() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow!("No window available"))?;
        let storage = window
            .local_storage()
            .map_err(|e| anyhow!("localStorage error: {:?}", e))?
            .ok_or_else(|| anyhow!("localStorage is not available"))?;
        Ok(Self { storage })
    }

    pub fn session() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow!("No window available"))?;
        let storage = window
            .session_storage()
            .map_err(|e| anyhow!("sessionStorage error: {:?}", e))?
            .ok_or_else(|| anyhow!("sessionStorage is not available"))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for WebStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| anyhow!("Get error ({}): {:?}", key, e))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // Fails with QuotaExceededError once the origin's quota is used up.
        self.storage
            .set_item(key, value)
            .map_err(|e| anyhow!("Set error ({}): {:?}", key, e))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| anyhow!("Remove error ({}): {:?}", key, e))
    }
}
