use crate::core::config::Config;
use crate::core::state::{Character, SessionData};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdeasRequest {
    pub genre: String,
    pub model_choice: String,
}

/// Payload of a first-episode request.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct StoryRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub story_request: String,
    #[serde(default)]
    pub font_choice: String,
    #[serde(default)]
    pub model_choice: String,
    #[serde(default)]
    pub characters: Vec<Character>,
}

impl From<&StoryRequest> for SessionData {
    fn from(request: &StoryRequest) -> Self {
        Self {
            prompt: Some(request.prompt.clone()),
            genre: Some(request.genre.clone()),
            instructions: Some(request.instructions.clone()),
            story_request: Some(request.story_request.clone()),
            font_choice: Some(request.font_choice.clone()),
            model_choice: Some(request.model_choice.clone()),
            characters: request.characters.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContinueRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_choice: Option<String>,
    pub previous_summary: String,
    pub episode_number: usize,
    pub characters: Vec<Character>,
}

impl ContinueRequest {
    pub fn from_session(session: &SessionData, previous_summary: &str, episode_number: usize) -> Self {
        Self {
            prompt: session.prompt.clone(),
            genre: session.genre.clone(),
            instructions: session.instructions.clone(),
            story_request: session.story_request.clone(),
            model_choice: session.model_choice.clone(),
            previous_summary: previous_summary.to_string(),
            episode_number,
            characters: session.characters.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GeneratedEpisode {
    pub novel_text: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize)]
struct IdeasResponse {
    ideas: String,
}

#[cfg(target_arch = "wasm32")]
pub trait BackendBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> BackendBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait BackendBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> BackendBounds for T {}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait NovelBackend: BackendBounds {
    async fn generate_ideas(&self, request: &IdeasRequest) -> Result<String>;
    async fn generate_story(&self, request: &StoryRequest) -> Result<GeneratedEpisode>;
    async fn continue_story(&self, request: &ContinueRequest) -> Result<GeneratedEpisode>;
}

pub fn create_backend(config: &Config, base_url: &str) -> Result<Box<dyn NovelBackend>> {
    if config.api.demo {
        log::info!("Demo mode: serving canned responses");
        return Ok(Box::new(crate::services::mock::MockBackend::new()));
    }
    Ok(Box::new(HttpBackend::new(base_url, config.api.timeout_seconds)?))
}

pub(crate) fn build_client(timeout_seconds: Option<u64>) -> Result<reqwest::Client> {
    #[allow(unused_mut)]
    let mut builder = reqwest::Client::builder();
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Some(secs) = timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
    }
    #[cfg(target_arch = "wasm32")]
    let _ = timeout_seconds;
    Ok(builder.build()?)
}

/// Turns a backend response into its JSON body, or into the error it reports.
pub(crate) async fn read_json_body(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let text = resp.text().await?;
    let body: Option<Value> = serde_json::from_str(&text).ok();

    if !status.is_success() {
        return Err(status_error(status, body.as_ref()));
    }

    body.ok_or_else(|| anyhow!("Failed to parse API response: {}", text))
}

pub(crate) fn status_error(status: StatusCode, body: Option<&Value>) -> anyhow::Error {
    match body
        .and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
    {
        Some(message) => anyhow!("{}", message),
        None => anyhow!("API error: {}", status.as_u16()),
    }
}

#[derive(Debug)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout_seconds: Option<u64>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout_seconds)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_request<B, T>(&self, endpoint: &str, data: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {}", url);

        let result = async {
            let resp = self.client.post(&url).json(data).send().await?;
            let body = read_json_body(resp).await?;

            if body.get("success").and_then(Value::as_bool) == Some(false) {
                let message = body
                    .get("error")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .unwrap_or("Unknown API error");
                return Err(anyhow!("{}", message));
            }

            serde_json::from_value::<T>(body)
                .map_err(|e| anyhow!("Unexpected API response shape: {}", e))
        }
        .await;

        if let Err(e) = &result {
            error!("API request failed ({}): {:#}", endpoint, e);
        }
        result
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl NovelBackend for HttpBackend {
    async fn generate_ideas(&self, request: &IdeasRequest) -> Result<String> {
        let response: IdeasResponse = self.send_request("/api/ideas", request).await?;
        Ok(response.ideas)
    }

    async fn generate_story(&self, request: &StoryRequest) -> Result<GeneratedEpisode> {
        self.send_request("/api/generate", request).await
    }

    async fn continue_story(&self, request: &ContinueRequest) -> Result<GeneratedEpisode> {
        self.send_request("/api/continue", request).await
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub request_line: String,
        pub headers: String,
        pub body: String,
    }

    /// Answers every connection with the next queued `(status, body)`.
    pub struct TestServer {
        pub base_url: String,
        pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl TestServer {
        pub async fn spawn(responses: Vec<(u16, String)>) -> Self {
            let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind test server");
            let addr = listener.local_addr().expect("local addr");
            let requests = Arc::new(Mutex::new(Vec::new()));
            let recorded = Arc::clone(&requests);

            tokio::spawn(async move {
                let mut queue = std::collections::VecDeque::from(responses);
                while let Ok((mut stream, _)) = listener.accept().await {
                    let request = read_request(&mut stream).await;
                    recorded.lock().unwrap().push(request);
                    let (status, body) = queue
                        .pop_front()
                        .unwrap_or((500, r#"{"error": "no response queued"}"#.to_string()));
                    let response = format!(
                        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });

            Self {
                base_url: format!("http://{}", addr),
                requests,
            }
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> RecordedRequest {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_header_end(&buf) {
                let head = String::from_utf8_lossy(&buf[..end]).to_string();
                let length = content_length(&head);
                while buf.len() < end + 4 + length {
                    let n = stream.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                let body = String::from_utf8_lossy(&buf[end + 4..]).to_string();
                let (request_line, headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
                return RecordedRequest {
                    request_line: request_line.to_string(),
                    headers: headers.to_string(),
                    body,
                };
            }
        }
        RecordedRequest {
            request_line: String::new(),
            headers: String::new(),
            body: String::new(),
        }
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    fn content_length(head: &str) -> usize {
        head.lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }
}
