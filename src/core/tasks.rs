//! Task cards and their reconciliation against polled server state

use crate::api::types::{Task, TaskMap, TaskStatus};
use crate::core::meta_store::{MetaMap, TaskMeta};
use crate::error::VidqError;
use crate::utils::short_id;
use crate::Result;
use std::collections::HashMap;

/// Shown in the tasks view before any card exists
pub const NO_TASKS_PLACEHOLDER: &str = "No active tasks";

/// Rendered state of one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCard {
    pub task_id: String,
    pub title: String,
    /// Title came from cached metadata rather than the id fallback
    pub from_cache: bool,
    pub thumbnail: Option<String>,
    pub source_url: Option<String>,
    pub status: TaskStatus,
    /// Display progress; always 100 once finished
    pub progress: f64,
    pub speed: Option<String>,
    pub eta: Option<String>,
    pub quality: Option<String>,
    pub error: Option<String>,
}

impl TaskCard {
    /// Merge server state with cached metadata.
    ///
    /// Metadata wins for display fields, the server for status and progress.
    pub fn render(task_id: &str, task: &Task, meta: Option<&TaskMeta>) -> Self {
        let cached_title = meta
            .and_then(|m| m.title.clone())
            .filter(|t| !t.is_empty());
        let from_cache = cached_title.is_some();
        let title = cached_title.unwrap_or_else(|| format!("Task {}", short_id(task_id)));
        let progress = if task.status.is_finished() {
            100.0
        } else {
            task.progress
        };

        Self {
            task_id: task_id.to_string(),
            title,
            from_cache,
            thumbnail: meta.and_then(|m| m.thumb.clone()).filter(|t| !t.is_empty()),
            source_url: meta.and_then(|m| m.url.clone()).filter(|u| !u.is_empty()),
            status: task.status,
            progress,
            speed: task.speed.clone(),
            eta: task.eta.clone(),
            quality: task.quality.clone(),
            error: task.error.clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status.is_finished()
    }
}

/// Counts from one reconcile pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
}

/// Ordered set of cards keyed by task id.
///
/// Cards are appended when first seen and updated in place afterwards.
/// A card is never removed, so a task that disappears from the server
/// keeps its last rendered state.
#[derive(Debug, Default, Clone)]
pub struct TaskBoard {
    cards: Vec<TaskCard>,
    index: HashMap<String, usize>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one poll result. New cards are created newest first, which is
    /// the reverse of the server's insertion order.
    pub fn reconcile(&mut self, tasks: &TaskMap, meta: &MetaMap) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        for (task_id, task) in tasks.iter().rev() {
            let card = TaskCard::render(task_id, task, meta.get(task_id));
            match self.index.get(task_id) {
                Some(&slot) => {
                    self.cards[slot] = card;
                    summary.updated += 1;
                }
                None => {
                    self.index.insert(task_id.clone(), self.cards.len());
                    self.cards.push(card);
                    summary.created += 1;
                }
            }
        }

        summary
    }

    pub fn cards(&self) -> &[TaskCard] {
        &self.cards
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskCard> {
        self.index.get(task_id).map(|&slot| &self.cards[slot])
    }

    /// Look a card up by full id or by an unambiguous id prefix
    pub fn find(&self, id_or_prefix: &str) -> Option<&TaskCard> {
        if id_or_prefix.is_empty() {
            return None;
        }
        if let Some(card) = self.get(id_or_prefix) {
            return Some(card);
        }
        let mut matches = self
            .cards
            .iter()
            .filter(|card| card.task_id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(card), None) => Some(card),
            _ => None,
        }
    }

    /// Find a card that can be saved now
    pub fn ready_card(&self, id_or_prefix: &str) -> Result<&TaskCard> {
        let card = self
            .find(id_or_prefix.trim())
            .ok_or_else(|| VidqError::UnknownTask(id_or_prefix.to_string()))?;
        if !card.is_ready() {
            return Err(VidqError::TaskNotReady(short_id(&card.task_id).to_string()));
        }
        Ok(card)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Placeholder text to show instead of cards, if any
    pub fn placeholder(&self) -> Option<&'static str> {
        self.cards.is_empty().then_some(NO_TASKS_PLACEHOLDER)
    }
}
