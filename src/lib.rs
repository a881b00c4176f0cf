//! # vidq - terminal client for a video download service
//!
//! Talks to a server that fetches videos on request and hands the
//! finished files back.
//!
//! ## Features
//!
//! - Video lookup with format selection
//! - Download queueing with locally cached task metadata
//! - Paginated search and query suggestions
//! - Background task polling
//! - Streaming saves with a prompt or a fallback directory
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vidq::api::ApiClient;
//! use vidq::core::{QueueSubmitter, MetaStore, VideoLookup};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Arc::new(ApiClient::new("http://127.0.0.1:5000")?);
//!     let store = Arc::new(MetaStore::open(".vidq/tasks_meta.json").await?);
//!
//!     let mut lookup = VideoLookup::new(service.clone());
//!     let preview = lookup.fetch("VIDEO_URL").await?.clone();
//!
//!     let task_id = QueueSubmitter::new(service, store).submit(&preview).await?;
//!     println!("Queued {} as {}", preview.title, task_id);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod download;
pub mod error;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export main types
pub use api::{ApiClient, VideoService};
pub use app::{Action, App, View};
pub use config::ClientConfig;
pub use core::{MetaStore, QueueSubmitter, SearchPager, TaskPoller, VideoLookup};
pub use download::{DownloadTrigger, SaveCapability};
pub use error::VidqError;

/// Result type alias for vidq operations
pub type Result<T> = std::result::Result<T, VidqError>;
