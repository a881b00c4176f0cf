//! HTTP client for the download service

use crate::api::types::{
    DownloadRequest, DownloadResponse, InfoRequest, SearchPage, SearchRequest,
    SuggestionsRequest, SuggestionsResponse, TaskMap, VideoInfo,
};
use crate::api::{FileBody, VideoService};
use crate::error::VidqError;
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: Option<String>,
    /// Proxy URL
    pub proxy_url: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            proxy_url: None,
        }
    }
}

/// REST client bound to one service base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    /// Create a client with default HTTP settings
    pub fn new(base_url: &str) -> Result<Self, VidqError> {
        Self::with_config(base_url, HttpClientConfig::default())
    }

    /// Create a client with custom HTTP settings
    pub fn with_config(base_url: &str, config: HttpClientConfig) -> Result<Self, VidqError> {
        let mut base = Url::parse(base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(VidqError::InvalidUrl(base_url.to_string()));
        }
        // a trailing slash keeps path prefixes intact when joining endpoints
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true);

        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("vidq/{}", env!("CARGO_PKG_VERSION")));
        builder = builder.user_agent(user_agent);

        if let Some(proxy_url) = &config.proxy_url {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => warn!("Ignoring invalid proxy {}: {}", proxy_url, e),
            }
        }

        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, VidqError> {
        Ok(self.base.join(path)?)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, VidqError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        decode(response).await
    }
}

/// Decode a JSON response, surfacing a server-reported `error` field first
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, VidqError> {
    let status = response.status();
    let body = response.bytes().await?;
    let value: Option<serde_json::Value> = serde_json::from_slice(&body).ok();

    if let Some(message) = value.as_ref().and_then(server_error) {
        return Err(VidqError::Server(message));
    }
    if !status.is_success() {
        return Err(VidqError::Status {
            status: status.as_u16(),
        });
    }

    match value {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(serde_json::from_slice(&body)?),
    }
}

fn server_error(value: &serde_json::Value) -> Option<String> {
    value
        .get("error")?
        .as_str()
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl VideoService for ApiClient {
    async fn lookup(&self, url: &str) -> Result<VideoInfo, VidqError> {
        self.post_json("api/info", &InfoRequest { url }).await
    }

    async fn enqueue(&self, url: &str, quality: &str) -> Result<String, VidqError> {
        let response: DownloadResponse = self
            .post_json("api/download", &DownloadRequest { url, quality })
            .await?;
        response
            .task_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| VidqError::Server("response carried no task id".to_string()))
    }

    async fn search(&self, query: &str, page_token: &str) -> Result<SearchPage, VidqError> {
        self.post_json("api/search", &SearchRequest { query, page_token })
            .await
    }

    async fn suggestions(&self, query: &str) -> Result<Vec<String>, VidqError> {
        let response: SuggestionsResponse = self
            .post_json("api/suggestions", &SuggestionsRequest { query })
            .await?;
        Ok(response.results)
    }

    async fn list_tasks(&self) -> Result<TaskMap, VidqError> {
        let url = self.endpoint("api/tasks")?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn fetch_file(&self, task_id: &str) -> Result<FileBody, VidqError> {
        let mut url = self.endpoint("api/get_file")?;
        url.path_segments_mut()
            .map_err(|_| VidqError::InvalidUrl(self.base.to_string()))?
            .push(task_id);
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            // error bodies are small JSON documents such as {"error": "File not ready"}
            return Err(decode::<serde_json::Value>(response)
                .await
                .err()
                .unwrap_or(VidqError::Generic("artifact request rejected".to_string())));
        }

        let content_length = response.content_length();
        let stream = response.bytes_stream().map_err(VidqError::from).boxed();
        Ok(FileBody {
            content_length,
            stream,
        })
    }
}
