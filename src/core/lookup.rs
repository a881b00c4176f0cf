//! Video lookup and the staged preview

use crate::api::types::{Format, VideoInfo};
use crate::api::VideoService;
use crate::error::VidqError;
use std::sync::Arc;
use tracing::{debug, info};

/// A looked-up video staged for enqueueing
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    /// URL sent back to the server on enqueue
    pub source_url: String,
    pub title: String,
    pub thumbnail: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Format choices in server order, never empty
    pub formats: Vec<Format>,
    selected: usize,
}

impl Preview {
    /// Build a preview from a lookup response.
    ///
    /// The second format is preselected when there is one, else the first.
    pub fn from_info(requested_url: &str, info: VideoInfo) -> Result<Self, VidqError> {
        if info.formats.is_empty() {
            return Err(VidqError::NoFormatFound);
        }
        let selected = if info.formats.len() > 1 { 1 } else { 0 };
        let source_url = info
            .original_url
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| requested_url.to_string());

        Ok(Self {
            source_url,
            title: info.title,
            thumbnail: info.thumbnail.filter(|t| !t.is_empty()),
            duration: info.duration,
            formats: info.formats,
            selected,
        })
    }

    pub fn selected_format(&self) -> &Format {
        &self.formats[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Change the selected format; unknown ids leave the selection as is
    pub fn select(&mut self, format_id: &str) -> Result<&Format, VidqError> {
        let index = self
            .formats
            .iter()
            .position(|f| f.id == format_id)
            .ok_or_else(|| VidqError::UnknownFormat(format_id.to_string()))?;
        self.selected = index;
        Ok(&self.formats[index])
    }
}

/// Looks up URLs and holds the current preview
pub struct VideoLookup {
    service: Arc<dyn VideoService>,
    preview: Option<Preview>,
}

impl VideoLookup {
    pub fn new(service: Arc<dyn VideoService>) -> Self {
        Self {
            service,
            preview: None,
        }
    }

    /// Look up `url` and replace the preview on success.
    ///
    /// Empty input is rejected before any request. On failure the previous
    /// preview stays in place.
    pub async fn fetch(&mut self, url: &str) -> Result<&Preview, VidqError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(VidqError::EmptyInput("Please enter a URL"));
        }

        debug!("Looking up {}", url);
        let info = self.service.lookup(url).await?;
        let preview = Preview::from_info(url, info)?;
        info!(
            "Preview ready: {} ({} formats)",
            preview.title,
            preview.formats.len()
        );

        Ok(self.preview.insert(preview))
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn preview_mut(&mut self) -> Option<&mut Preview> {
        self.preview.as_mut()
    }

    /// Select a format on the current preview
    pub fn select(&mut self, format_id: &str) -> Result<&Format, VidqError> {
        self.preview
            .as_mut()
            .ok_or(VidqError::NoPreview)?
            .select(format_id)
    }
}
