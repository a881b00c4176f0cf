//! Submitting previews as server-side download jobs

use crate::api::VideoService;
use crate::core::lookup::Preview;
use crate::core::meta_store::{MetaStore, TaskMeta};
use crate::core::poller::TaskPoller;
use crate::error::VidqError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Enqueues the current preview and caches its display metadata
pub struct QueueSubmitter {
    service: Arc<dyn VideoService>,
    store: Arc<MetaStore>,
    refresh: Option<Arc<TaskPoller>>,
    in_flight: AtomicBool,
}

/// Re-enables the submitter when the request finishes, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl QueueSubmitter {
    pub fn new(service: Arc<dyn VideoService>, store: Arc<MetaStore>) -> Self {
        Self {
            service,
            store,
            refresh: None,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Refresh this poller right after a successful submission
    pub fn with_refresh(mut self, poller: Arc<TaskPoller>) -> Self {
        self.refresh = Some(poller);
        self
    }

    /// False while a submission is outstanding
    pub fn is_enabled(&self) -> bool {
        !self.in_flight.load(Ordering::Acquire)
    }

    /// Enqueue `preview` with its selected format and return the task id.
    ///
    /// A second call while one is outstanding is rejected without a request.
    pub async fn submit(&self, preview: &Preview) -> Result<String, VidqError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VidqError::SubmitInProgress);
        }
        let _in_flight = InFlight(&self.in_flight);

        let quality = preview.selected_format().id.as_str();
        let task_id = self.service.enqueue(&preview.source_url, quality).await?;
        info!("Enqueued {} as task {} ({})", preview.source_url, task_id, quality);

        let meta = TaskMeta::new(
            preview.title.clone(),
            preview.thumbnail.clone(),
            preview.source_url.clone(),
        );
        if let Err(e) = self.store.upsert(&task_id, meta).await {
            // the job exists server-side; only its display title is lost
            warn!("Could not cache metadata for task {}: {}", task_id, e);
        }

        if let Some(poller) = &self.refresh {
            if let Err(e) = poller.poll_once().await {
                warn!("Task refresh after enqueue failed: {}", e);
            }
        }

        Ok(task_id)
    }
}
