use crate::core::state::{CharacterProfile, LocationProfile};
use crate::services::api::{build_client, read_json_body};
use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

/// Character and location gallery endpoints.
#[derive(Debug)]
pub struct CatalogClient {
    base_url: Url,
    client: reqwest::Client,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout_seconds: Option<u64>) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url).with_context(|| format!("Invalid catalog URL: {}", base_url))?,
            client: build_client(timeout_seconds)?,
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Catalog URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn delete_character(&self, id: &str) -> Result<()> {
        self.delete(self.endpoint(&["characters", "delete", id])?).await
    }

    pub async fn character(&self, id: &str) -> Result<CharacterProfile> {
        self.get(self.endpoint(&["api", "characters", id])?).await
    }

    pub async fn random_character(&self, gender: &str) -> Result<CharacterProfile> {
        let body = json!({ "gender": gender });
        self.generate(self.endpoint(&["characters", "generate_random"])?, Some(&body)).await
    }

    pub async fn delete_location(&self, id: &str) -> Result<()> {
        self.delete(self.endpoint(&["locations", "delete", id])?).await
    }

    pub async fn location(&self, id: &str) -> Result<LocationProfile> {
        self.get(self.endpoint(&["api", "locations", id])?).await
    }

    pub async fn random_location(&self) -> Result<LocationProfile> {
        self.generate(self.endpoint(&["locations", "generate_random"])?, None).await
    }

    async fn delete(&self, url: Url) -> Result<()> {
        debug!("POST {}", url);
        let resp = self
            .client
            .post(url)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;
        let body = read_json_body(resp).await?;

        if body.get("success").and_then(Value::as_bool) == Some(true) {
            Ok(())
        } else {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Unknown error");
            Err(anyhow!("Delete failed: {}", message))
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await?;
        let body = read_json_body(resp).await?;
        serde_json::from_value(body).map_err(|e| anyhow!("Unexpected catalog response: {}", e))
    }

    async fn generate<T: DeserializeOwned>(&self, url: Url, body: Option<&Value>) -> Result<T> {
        debug!("POST {}", url);
        let request = self.client.post(url);
        let request = match body {
            Some(body) => request.json(body),
            None => request.header("Content-Type", "application/json"),
        };
        let resp = request.send().await?;
        let body = read_json_body(resp).await?;
        serde_json::from_value(body).map_err(|e| anyhow!("Unexpected catalog response: {}", e))
    }
}
