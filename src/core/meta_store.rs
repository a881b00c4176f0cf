//! Local cache of task display metadata
//!
//! The server only knows a task's status and progress. Title, thumbnail and
//! source URL are captured when the task is submitted and kept in a single
//! JSON file mapping task id to `{title, thumb, url}`. Entries are never
//! expired automatically; `remove` is the only eviction.

use crate::error::VidqError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Display metadata cached for one task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl TaskMeta {
    pub fn new(
        title: impl Into<String>,
        thumb: Option<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            thumb,
            url: Some(url.into()),
            added_at: Some(Utc::now()),
        }
    }

    /// Overlay the fields `other` carries onto `self`
    pub fn merge(&mut self, other: TaskMeta) {
        if other.title.is_some() {
            self.title = other.title;
        }
        if other.thumb.is_some() {
            self.thumb = other.thumb;
        }
        if other.url.is_some() {
            self.url = other.url;
        }
        if self.added_at.is_none() {
            self.added_at = other.added_at;
        }
    }
}

/// All cached entries keyed by task id
pub type MetaMap = BTreeMap<String, TaskMeta>;

/// File-backed metadata cache
#[derive(Debug)]
pub struct MetaStore {
    path: PathBuf,
    entries: Mutex<MetaMap>,
}

impl MetaStore {
    /// Open the store, loading existing entries from `path`.
    ///
    /// A missing file is an empty store. An unreadable document is logged
    /// and replaced on the next write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, VidqError> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<MetaMap>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Discarding unreadable metadata cache {}: {}", path.display(), e);
                    MetaMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MetaMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Loaded {} cached task entries from {}", entries.len(), path.display());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskMeta> {
        self.entries.lock().await.get(task_id).cloned()
    }

    pub async fn snapshot(&self) -> MetaMap {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Write or merge the entry for `task_id` and persist the whole map
    pub async fn upsert(&self, task_id: &str, meta: TaskMeta) -> Result<(), VidqError> {
        let mut entries = self.entries.lock().await;
        entries
            .entry(task_id.to_string())
            .and_modify(|existing| existing.merge(meta.clone()))
            .or_insert(meta);
        persist(&self.path, &entries).await
    }

    /// Evict one entry; the task itself is untouched on the server
    pub async fn remove(&self, task_id: &str) -> Result<Option<TaskMeta>, VidqError> {
        let mut entries = self.entries.lock().await;
        let removed = entries.remove(task_id);
        if removed.is_some() {
            persist(&self.path, &entries).await?;
        }
        Ok(removed)
    }
}

async fn persist(path: &Path, entries: &MetaMap) -> Result<(), VidqError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let raw = serde_json::to_vec_pretty(entries)?;
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, raw).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("meta.json")).await.unwrap();
        assert!(store.is_empty().await);
        assert_eq!(store.get("nope").await, None);
    }

    #[tokio::test]
    async fn test_upsert_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("meta.json");

        let store = MetaStore::open(&path).await.unwrap();
        store
            .upsert(
                "t1",
                TaskMeta::new("Clip", Some("https://i/1.jpg".to_string()), "https://v/1"),
            )
            .await
            .unwrap();
        drop(store);

        let reopened = MetaStore::open(&path).await.unwrap();
        let meta = reopened.get("t1").await.unwrap();
        assert_eq!(meta.title.as_deref(), Some("Clip"));
        assert_eq!(meta.thumb.as_deref(), Some("https://i/1.jpg"));
        assert_eq!(meta.url.as_deref(), Some("https://v/1"));
    }

    #[tokio::test]
    async fn test_file_layout_is_plain_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        std::fs::write(
            &path,
            r#"{"abc": {"title": "Old", "thumb": "", "url": "https://v/old"}}"#,
        )
        .unwrap();

        let store = MetaStore::open(&path).await.unwrap();
        assert_eq!(store.get("abc").await.unwrap().title.as_deref(), Some("Old"));

        store.upsert("def", TaskMeta::default()).await.unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("abc").is_some());
        assert!(raw.get("def").is_some());
    }

    #[tokio::test]
    async fn test_upsert_merges_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("meta.json")).await.unwrap();

        store
            .upsert("t1", TaskMeta::new("First", None, "https://v/1"))
            .await
            .unwrap();
        store
            .upsert(
                "t1",
                TaskMeta {
                    thumb: Some("https://i/1.jpg".to_string()),
                    ..TaskMeta::default()
                },
            )
            .await
            .unwrap();

        let meta = store.get("t1").await.unwrap();
        assert_eq!(meta.title.as_deref(), Some("First"));
        assert_eq!(meta.thumb.as_deref(), Some("https://i/1.jpg"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = MetaStore::open(&path).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_evicts_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let store = MetaStore::open(&path).await.unwrap();
        store
            .upsert("t1", TaskMeta::new("Clip", None, "https://v/1"))
            .await
            .unwrap();

        assert!(store.remove("t1").await.unwrap().is_some());
        assert!(store.remove("t1").await.unwrap().is_none());

        let reopened = MetaStore::open(&path).await.unwrap();
        assert!(reopened.is_empty().await);
    }
}
