use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub story: StoryConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_production_url")]
    pub production_url: String,
    #[serde(default = "default_local_url")]
    pub local_url: String,
    /// Talk to `local_url`, as a page served from localhost would.
    #[serde(default)]
    pub use_local: bool,
    /// Serve canned responses instead of calling the backend.
    #[serde(default)]
    pub demo: bool,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_folder")]
    pub data_folder: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoryConfig {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_font")]
    pub default_font: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            production_url: default_production_url(),
            local_url: default_local_url(),
            use_local: false,
            demo: false,
            timeout_seconds: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_folder: default_data_folder(),
        }
    }
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            models: default_models(),
            default_font: default_font(),
        }
    }
}

fn default_production_url() -> String {
    "https://your-api-server.onrender.com".to_string()
}
fn default_local_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_data_folder() -> String {
    "data".to_string()
}
fn default_model() -> String {
    "xai".to_string()
}
fn default_models() -> Vec<String> {
    ["xai", "gemini", "anthropic", "openai"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}
fn default_font() -> String {
    "default".to_string()
}

impl ApiConfig {
    /// Base URL for a page served from `host`.
    pub fn base_url_for_host(&self, host: &str) -> &str {
        if is_local_host(host) {
            &self.local_url
        } else {
            &self.production_url
        }
    }

    pub fn base_url(&self) -> &str {
        if self.use_local {
            &self.local_url
        } else {
            &self.production_url
        }
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.production_url)
            .with_context(|| format!("Invalid api.production_url: {}", self.production_url))?;
        Url::parse(&self.local_url)
            .with_context(|| format!("Invalid api.local_url: {}", self.local_url))?;
        Ok(())
    }
}

pub fn is_local_host(host: &str) -> bool {
    host == "localhost" || host == "127.0.0.1"
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml_ng::from_str(content)?;
        config.api.validate()?;
        Ok(config)
    }

    /// Writes the default settings to `path`, refusing to replace a file unless `force`.
    pub fn init(path: impl AsRef<Path>, force: bool) -> Result<()> {
        let path = path.as_ref();
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        Self::default().save(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
