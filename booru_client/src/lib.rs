mod error;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde_json::Value;

use std::time::Duration;

pub use crate::error::Error;
pub use crate::error::Result;

const USER_AGENT: &str = concat!("booru-gateway/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// One outbound GET against an upstream booru.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
    /// Short name used for log output, e.g. `e621.net_search`.
    pub label: String,
}

impl UpstreamRequest {
    pub fn get(url: &str, label: impl Into<String>) -> Result<Self> {
        Ok(UpstreamRequest {
            url: Url::parse(url)?,
            headers: Vec::new(),
            label: label.into(),
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn header_map(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        for (name, value) in self.headers.iter() {
            let name =
                header::HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeader(name.clone()))?;
            let value = header::HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Anything able to answer an upstream request with a JSON document.
/// An empty response body is reported as `Value::Null`.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_json(&self, request: &UpstreamRequest) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct BooruClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl BooruClient {
    pub fn new(timeout: Duration) -> Result<BooruClient> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(BooruClient { client, timeout })
    }

    async fn fetch_text(&self, request: &UpstreamRequest) -> Result<String> {
        let response = self
            .client
            .get(request.url.clone())
            .headers(request.header_map()?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::StatusError {
                status: status.as_u16(),
                reason: status
                    .canonical_reason()
                    .unwrap_or("Could not reach upstream")
                    .to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

impl Default for BooruClient {
    fn default() -> Self {
        BooruClient {
            client: Client::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[async_trait]
impl Upstream for BooruClient {
    async fn get_json(&self, request: &UpstreamRequest) -> Result<Value> {
        tracing::debug!("GET {}", request.url);
        let content = tokio::time::timeout(self.timeout, self.fetch_text(request))
            .await
            .map_err(|_| Error::Timeout(self.timeout.as_millis() as u64))??;

        log(&request.label, &content).await?;
        if content.trim().is_empty() {
            return Ok(Value::Null);
        }
        let result = serde_json::from_str::<Value>(&content)?;
        Ok(result)
    }
}

async fn log(name: &str, content: &str) -> Result<()> {
    use std::path::PathBuf;
    use tokio::{fs::File, io::AsyncWriteExt};

    if let Ok(dir) = std::env::var("CLIENT_LOG_DIR") {
        let name = name.replace(|c: char| !c.is_ascii_alphanumeric(), "_");
        let time = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filepath = PathBuf::from(dir).join(format!("booru_{}_{}.json", name, time));
        let mut file = File::create(filepath).await?;
        file.write_all(content.as_bytes()).await?;
    }
    Ok(())
}
