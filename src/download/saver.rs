//! Saving finished artifacts to disk

use crate::api::VideoService;
use crate::core::progress::TransferProgress;
use crate::core::tasks::TaskCard;
use crate::error::VidqError;
use crate::utils::{generate_unique_filename, suggested_file_name};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Interactive destination picker
#[async_trait]
pub trait SaveDialog: Send + Sync {
    /// Ask where to save; `None` means the user cancelled
    async fn choose(&self, suggested_name: &str) -> Result<Option<PathBuf>, VidqError>;
}

/// How artifacts reach the disk
#[derive(Clone)]
pub enum SaveCapability {
    /// Ask the user for every file
    Dialog(Arc<dyn SaveDialog>),
    /// Write into a directory without asking, never overwriting
    Fallback { dir: PathBuf },
}

/// Which capability handled a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Dialog,
    Fallback,
}

/// Result of a save request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved {
        path: PathBuf,
        bytes: u64,
        mode: SaveMode,
    },
    /// The dialog was dismissed; nothing was requested or written
    Cancelled,
}

type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Streams finished artifacts from the service to local files
pub struct DownloadTrigger {
    service: Arc<dyn VideoService>,
    capability: SaveCapability,
    progress_callback: Option<ProgressCallback>,
    completed: Mutex<HashSet<String>>,
}

impl DownloadTrigger {
    pub fn new(service: Arc<dyn VideoService>, capability: SaveCapability) -> Self {
        Self {
            service,
            capability,
            progress_callback: None,
            completed: Mutex::new(HashSet::new()),
        }
    }

    /// Set progress callback
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(TransferProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Save the artifact behind a rendered card, naming it after the card
    pub async fn save_card(&self, card: &TaskCard) -> Result<SaveOutcome, VidqError> {
        let suggested = suggested_file_name(
            &card.task_id,
            Some(card.title.as_str()).filter(|_| card.from_cache),
            card.quality.as_deref(),
        );
        self.save(&card.task_id, &suggested).await
    }

    /// Save the artifact of `task_id`, offering `suggested_name`
    pub async fn save(&self, task_id: &str, suggested_name: &str) -> Result<SaveOutcome, VidqError> {
        let (path, mode) = match &self.capability {
            SaveCapability::Dialog(dialog) => match dialog.choose(suggested_name).await? {
                Some(path) => (path, SaveMode::Dialog),
                None => {
                    debug!("Save of task {} cancelled", task_id);
                    return Ok(SaveOutcome::Cancelled);
                }
            },
            SaveCapability::Fallback { dir } => {
                tokio::fs::create_dir_all(dir).await?;
                let name = generate_unique_filename(dir, suggested_name)?;
                (dir.join(name), SaveMode::Fallback)
            }
        };

        info!("Saving task {} to {}", task_id, path.display());
        let bytes = self.stream_to(task_id, &path).await?;
        self.completed_set().insert(task_id.to_string());

        Ok(SaveOutcome::Saved { path, bytes, mode })
    }

    /// Task ids saved during this session
    pub fn completed(&self) -> HashSet<String> {
        self.completed_set().clone()
    }

    fn completed_set(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.completed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stream the body into a `.part` sibling and move it into place
    async fn stream_to(&self, task_id: &str, path: &Path) -> Result<u64, VidqError> {
        let body = self.service.fetch_file(task_id).await?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = part_path(path);
        let mut file = File::create(&tmp_path).await?;
        let mut progress = TransferProgress::new(task_id, body.content_length);
        let mut stream = body.stream;

        let written: Result<(), VidqError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                progress.advance(chunk.len() as u64);
                if let Some(callback) = &self.progress_callback {
                    callback(progress.clone());
                }
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok(())
        }
        .await;
        drop(file);

        match written {
            Ok(()) => {
                tokio::fs::rename(&tmp_path, path).await?;
                info!("Saved {} bytes to {}", progress.written, path.display());
                Ok(progress.written)
            }
            Err(e) => {
                warn!("Save of task {} failed: {}, removing partial file", task_id, e);
                let _ = tokio::fs::remove_file(&tmp_path).await;
                Err(e)
            }
        }
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(".part");
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Task, TaskStatus};
    use crate::core::meta_store::TaskMeta;
    use crate::testing::StubService;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FixedDialog(Option<PathBuf>);

    #[async_trait]
    impl SaveDialog for FixedDialog {
        async fn choose(&self, _suggested_name: &str) -> Result<Option<PathBuf>, VidqError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_dialog_save_writes_chosen_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("picked.mp4");
        let service = Arc::new(StubService::default());
        service.set_file(Ok(b"0123456789".to_vec()));

        let seen = Arc::new(AtomicU64::new(0));
        let trigger = DownloadTrigger::new(
            service.clone(),
            SaveCapability::Dialog(Arc::new(FixedDialog(Some(target.clone())))),
        )
        .with_progress_callback({
            let seen = seen.clone();
            move |p: TransferProgress| seen.store(p.written, Ordering::SeqCst)
        });

        let outcome = trigger.save("t1", "video-t1.mp4").await.unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                path: target.clone(),
                bytes: 10,
                mode: SaveMode::Dialog
            }
        );
        assert_eq!(std::fs::read(&target).unwrap(), b"0123456789");
        assert!(!part_path(&target).exists());
        assert_eq!(seen.load(Ordering::SeqCst), 10);
        assert!(trigger.completed().contains("t1"));
    }

    #[tokio::test]
    async fn test_cancelled_dialog_is_a_no_op() {
        let service = Arc::new(StubService::default());
        let trigger = DownloadTrigger::new(
            service.clone(),
            SaveCapability::Dialog(Arc::new(FixedDialog(None))),
        );

        assert_eq!(trigger.save("t1", "x.mp4").await.unwrap(), SaveOutcome::Cancelled);
        assert_eq!(service.calls("fetch_file"), 0);
        assert!(trigger.completed().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("video-t1.mp4"), b"old").unwrap();
        let service = Arc::new(StubService::default());
        service.set_file(Ok(b"new".to_vec()));
        let trigger = DownloadTrigger::new(
            service,
            SaveCapability::Fallback {
                dir: dir.path().to_path_buf(),
            },
        );

        let outcome = trigger.save("t1", "video-t1.mp4").await.unwrap();
        let SaveOutcome::Saved { path, mode, .. } = outcome else {
            panic!("expected a saved file");
        };
        assert_eq!(mode, SaveMode::Fallback);
        assert_eq!(path, dir.path().join("video-t1 (1).mp4"));
        assert_eq!(std::fs::read(dir.path().join("video-t1.mp4")).unwrap(), b"old");
        assert_eq!(std::fs::read(path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_failed_fetch_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(StubService::default());
        service.set_file(Err(VidqError::Server("File not ready".to_string())));
        let trigger = DownloadTrigger::new(
            service,
            SaveCapability::Fallback {
                dir: dir.path().to_path_buf(),
            },
        );

        assert!(trigger.save("t1", "video-t1.mp4").await.is_err());
        assert!(trigger.completed().is_empty());
        assert!(!dir.path().join("video-t1.mp4").exists());
    }

    #[tokio::test]
    async fn test_save_card_names_after_cached_title() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(StubService::default());
        service.set_file(Ok(b"abc".to_vec()));
        let trigger = DownloadTrigger::new(
            service,
            SaveCapability::Fallback {
                dir: dir.path().to_path_buf(),
            },
        );

        let mut task = Task::new("0f8e2b1c-1111", TaskStatus::Finished, 100.0);
        task.quality = Some("mp3".to_string());
        let meta = TaskMeta::new("Song: live", None, "https://v/1");
        let card = TaskCard::render("0f8e2b1c-1111", &task, Some(&meta));

        trigger.save_card(&card).await.unwrap();
        assert!(dir.path().join("Song_ live.mp3").exists());

        let bare = TaskCard::render("aa11bb22-2222", &task, None);
        trigger.save_card(&bare).await.unwrap();
        assert!(dir.path().join("video-aa11bb22.mp3").exists());
    }
}
