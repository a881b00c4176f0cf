//! Query completions

use crate::api::VideoService;
use crate::error::VidqError;
use std::sync::Arc;
use tracing::debug;

/// Most completions kept from one response
pub const MAX_SUGGESTIONS: usize = 10;

/// Fetches completions for partial search queries
pub struct Suggestions {
    service: Arc<dyn VideoService>,
}

impl Suggestions {
    pub fn new(service: Arc<dyn VideoService>) -> Self {
        Self { service }
    }

    /// Completions for `query`; a blank query yields nothing without a request
    pub async fn complete(&self, query: &str) -> Result<Vec<String>, VidqError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = self.service.suggestions(query).await?;
        results.retain(|s| !s.trim().is_empty());
        results.dedup();
        results.truncate(MAX_SUGGESTIONS);
        debug!("{} suggestions for {:?}", results.len(), query);
        Ok(results)
    }
}
