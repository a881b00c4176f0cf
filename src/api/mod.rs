//! REST surface of the download service

pub mod client;
pub mod types;

pub use client::*;
pub use types::*;

use crate::error::VidqError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Streamed artifact body returned by `GET /api/get_file/{task_id}`
pub struct FileBody {
    /// Declared length, if the server sent one
    pub content_length: Option<u64>,
    /// Body chunks in order
    pub stream: BoxStream<'static, Result<Bytes, VidqError>>,
}

impl std::fmt::Debug for FileBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Operations the client needs from the download service.
///
/// `ApiClient` is the HTTP implementation; the components only see this
/// trait so they can be driven by in-memory services in tests.
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Look up metadata and format choices for a URL
    async fn lookup(&self, url: &str) -> Result<VideoInfo, VidqError>;

    /// Start a server-side download job, returning its task id
    async fn enqueue(&self, url: &str, quality: &str) -> Result<String, VidqError>;

    /// Fetch one page of search results; `page_token` is empty for the first page
    async fn search(&self, query: &str, page_token: &str) -> Result<SearchPage, VidqError>;

    /// Query completions
    async fn suggestions(&self, query: &str) -> Result<Vec<String>, VidqError>;

    /// Full task collection
    async fn list_tasks(&self) -> Result<TaskMap, VidqError>;

    /// Stream a finished artifact
    async fn fetch_file(&self, task_id: &str) -> Result<FileBody, VidqError>;
}
