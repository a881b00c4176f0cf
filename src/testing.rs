//! In-memory service used by component tests

use crate::api::types::{SearchPage, TaskMap, VideoInfo};
use crate::api::{FileBody, VideoService};
use crate::error::VidqError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

type Canned<T> = Result<T, String>;

/// Scriptable `VideoService` that counts calls per operation
#[derive(Default)]
pub struct StubService {
    lookup: Mutex<Option<Canned<VideoInfo>>>,
    enqueue: Mutex<Option<Canned<String>>>,
    pages: Mutex<VecDeque<Canned<SearchPage>>>,
    suggestions: Mutex<Vec<String>>,
    tasks: Mutex<Option<Canned<TaskMap>>>,
    file: Mutex<Option<Canned<Vec<u8>>>>,
    search_gate: Mutex<Option<Arc<Semaphore>>>,
    tasks_gate: Mutex<Option<Arc<Semaphore>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    searches: Mutex<Vec<(String, String)>>,
}

fn canned<T>(result: Result<T, VidqError>) -> Canned<T> {
    result.map_err(|e| e.to_string())
}

fn replay<T: Clone>(slot: &Mutex<Option<Canned<T>>>, op: &str) -> Result<T, VidqError> {
    match slot.lock().unwrap().clone() {
        Some(Ok(value)) => Ok(value),
        Some(Err(message)) => Err(VidqError::Server(message)),
        None => Err(VidqError::Generic(format!("no canned {} response", op))),
    }
}

async fn pass(gate: &Mutex<Option<Arc<Semaphore>>>) {
    let gate = gate.lock().unwrap().clone();
    if let Some(gate) = gate {
        gate.acquire().await.unwrap().forget();
    }
}

impl StubService {
    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    fn record(&self, op: &'static str) {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
    }

    pub fn set_lookup(&self, result: Result<VideoInfo, VidqError>) {
        *self.lookup.lock().unwrap() = Some(canned(result));
    }

    pub fn set_enqueue(&self, result: Result<String, VidqError>) {
        *self.enqueue.lock().unwrap() = Some(canned(result));
    }

    pub fn push_page(&self, result: Result<SearchPage, VidqError>) {
        self.pages.lock().unwrap().push_back(canned(result));
    }

    pub fn set_suggestions(&self, results: Vec<String>) {
        *self.suggestions.lock().unwrap() = results;
    }

    pub fn set_tasks(&self, result: Result<TaskMap, VidqError>) {
        *self.tasks.lock().unwrap() = Some(canned(result));
    }

    pub fn set_file(&self, result: Result<Vec<u8>, VidqError>) {
        *self.file.lock().unwrap() = Some(canned(result));
    }

    /// Hold search responses until permits are added to the returned gate
    pub fn gate_search(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.search_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold task-list responses until permits are added to the returned gate
    pub fn gate_tasks(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.tasks_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// (query, page token) of every search call in order
    pub fn searches(&self) -> Vec<(String, String)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoService for StubService {
    async fn lookup(&self, _url: &str) -> Result<VideoInfo, VidqError> {
        self.record("lookup");
        replay(&self.lookup, "lookup")
    }

    async fn enqueue(&self, _url: &str, _quality: &str) -> Result<String, VidqError> {
        self.record("enqueue");
        replay(&self.enqueue, "enqueue")
    }

    async fn search(&self, query: &str, page_token: &str) -> Result<SearchPage, VidqError> {
        self.record("search");
        self.searches
            .lock()
            .unwrap()
            .push((query.to_string(), page_token.to_string()));
        pass(&self.search_gate).await;
        let next = self.pages.lock().unwrap().pop_front();
        match next {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(VidqError::Server(message)),
            None => Ok(SearchPage::default()),
        }
    }

    async fn suggestions(&self, _query: &str) -> Result<Vec<String>, VidqError> {
        self.record("suggestions");
        Ok(self.suggestions.lock().unwrap().clone())
    }

    async fn list_tasks(&self) -> Result<TaskMap, VidqError> {
        self.record("list_tasks");
        pass(&self.tasks_gate).await;
        replay(&self.tasks, "tasks")
    }

    async fn fetch_file(&self, _task_id: &str) -> Result<FileBody, VidqError> {
        self.record("fetch_file");
        let body = replay(&self.file, "file")?;
        let content_length = Some(body.len() as u64);
        let chunks: Vec<Result<Bytes, VidqError>> = body
            .chunks(4)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(FileBody {
            content_length,
            stream: futures::stream::iter(chunks).boxed(),
        })
    }
}
