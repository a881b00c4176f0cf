//! Periodic task polling
//!
//! One poll fetches the full task collection, merges it with cached
//! metadata and reconciles the board. A poll never overlaps another: a
//! tick or refresh that arrives while one is outstanding is skipped.
//! A failed request marks the server offline until a poll succeeds again.

use crate::api::types::TaskStatus;
use crate::api::VideoService;
use crate::core::meta_store::MetaStore;
use crate::core::tasks::{ReconcileSummary, TaskBoard, TaskCard};
use crate::error::VidqError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default time between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What a poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Applied(ReconcileSummary),
    /// Another poll was still outstanding
    Skipped,
}

pub struct TaskPoller {
    service: Arc<dyn VideoService>,
    store: Arc<MetaStore>,
    board: Mutex<TaskBoard>,
    polling: Mutex<()>,
    interval: Duration,
    updates: watch::Sender<Vec<TaskCard>>,
    online: watch::Sender<bool>,
}

impl TaskPoller {
    pub fn new(service: Arc<dyn VideoService>, store: Arc<MetaStore>) -> Self {
        let (updates, _) = watch::channel(Vec::new());
        let (online, _) = watch::channel(true);
        Self {
            service,
            store,
            board: Mutex::new(TaskBoard::new()),
            polling: Mutex::new(()),
            interval: DEFAULT_POLL_INTERVAL,
            updates,
            online,
        }
    }

    /// Set the time between polls
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll once now, unless a poll is already outstanding
    pub async fn poll_once(&self) -> Result<PollOutcome, VidqError> {
        let Ok(_polling) = self.polling.try_lock() else {
            debug!("Task poll already outstanding, skipping");
            return Ok(PollOutcome::Skipped);
        };

        let tasks = match self.service.list_tasks().await {
            Ok(tasks) => {
                self.set_online(true);
                tasks
            }
            Err(e) => {
                if e.is_transport() {
                    self.set_online(false);
                }
                return Err(e);
            }
        };
        let meta = self.store.snapshot().await;

        let mut board = self.board.lock().await;
        let summary = board.reconcile(&tasks, &meta);
        debug!(
            "Reconciled {} tasks ({} new, {} updated)",
            tasks.len(),
            summary.created,
            summary.updated
        );
        self.updates.send_replace(board.cards().to_vec());

        Ok(PollOutcome::Applied(summary))
    }

    /// Current board contents
    pub async fn snapshot(&self) -> TaskBoard {
        self.board.lock().await.clone()
    }

    /// Card snapshots published after every applied poll
    pub fn subscribe(&self) -> watch::Receiver<Vec<TaskCard>> {
        self.updates.subscribe()
    }

    /// Whether the last poll reached the server
    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Connectivity flips, published only when the state changes
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed && online {
            info!("Server reachable again");
        } else if changed {
            warn!("Lost contact with the server");
        }
    }

    /// Spawn the polling loop. The first poll runs immediately.
    pub fn start(self: &Arc<Self>) -> PollerHandle {
        let cancel = CancellationToken::new();
        let poller = Arc::clone(self);
        let token = cancel.clone();
        let join = tokio::spawn(async move { poller.run(token).await });

        PollerHandle {
            cancel,
            join: Some(join),
        }
    }

    /// Poll in the background until `task_id` finishes or fails.
    ///
    /// `on_update` sees every published state of the card.
    pub async fn wait_settled<F>(
        self: &Arc<Self>,
        task_id: &str,
        mut on_update: F,
    ) -> Result<TaskCard, VidqError>
    where
        F: FnMut(&TaskCard),
    {
        let mut updates = self.subscribe();
        let handle = self.start();

        let settled = loop {
            if updates.changed().await.is_err() {
                break Err(VidqError::Generic("task poller stopped".to_string()));
            }
            let card = updates
                .borrow_and_update()
                .iter()
                .find(|card| card.task_id == task_id)
                .cloned();
            let Some(card) = card else { continue };

            on_update(&card);
            if card.is_ready() {
                break Ok(card);
            }
            if card.status == TaskStatus::Error {
                let reason = card.error.unwrap_or_else(|| "unknown error".to_string());
                break Err(VidqError::TaskFailed(reason));
            }
        };

        handle.stop().await;
        settled
    }

    async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.poll_once() => {
                    if let Err(e) = result {
                        warn!("Task poll failed: {}", e);
                    }
                }
            }
        }
        debug!("Task poller stopped");
    }
}

/// Running poll loop; stopping or dropping it cancels the loop
pub struct PollerHandle {
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Cancel the loop and wait for it to exit
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!("Task poller ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
