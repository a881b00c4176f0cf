//! Interactive session: views, actions and their dispatch
//!
//! Every user input becomes an [`Action`]. [`App::dispatch`] runs it
//! against the session components and reports what to redraw; messages
//! for the user are queued as [`Notice`]s.

use crate::api::VideoService;
use crate::core::{
    MetaStore, PageOutcome, QueueSubmitter, SearchPager, Suggestions, TaskPoller, VideoLookup,
};
use crate::download::{DownloadTrigger, SaveOutcome};
use crate::error::VidqError;
use crate::utils::short_id;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Top-level screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Search,
    Tasks,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Home => "home",
            View::Search => "search",
            View::Tasks => "tasks",
        }
    }
}

/// One user intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(View),
    Lookup(String),
    SelectFormat(String),
    Enqueue,
    Search(String),
    /// Default query for an empty search view
    Browse,
    LoadMore,
    /// Look up the n-th (1-based) search result
    Open(usize),
    Save(String),
    Forget(String),
    Suggest(String),
    Help,
    Quit,
}

impl Action {
    /// Parse one shell line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Action>, VidqError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let action = match word.to_ascii_lowercase().as_str() {
            "home" => Action::Navigate(View::Home),
            "tasks" => Action::Navigate(View::Tasks),
            "search" | "find" if rest.is_empty() => Action::Navigate(View::Search),
            "search" | "find" => Action::Search(rest.to_string()),
            "info" | "lookup" => Action::Lookup(rest.to_string()),
            "quality" | "format" => Action::SelectFormat(rest.to_string()),
            "add" | "queue" => Action::Enqueue,
            "more" => Action::LoadMore,
            "open" => {
                let index = rest
                    .parse()
                    .map_err(|_| VidqError::UnknownCommand(line.to_string()))?;
                Action::Open(index)
            }
            "save" => Action::Save(rest.to_string()),
            "forget" => Action::Forget(rest.to_string()),
            "suggest" => Action::Suggest(rest.to_string()),
            "help" | "?" => Action::Help,
            "quit" | "exit" => Action::Quit,
            _ if looks_like_url(line) => Action::Lookup(line.to_string()),
            _ => return Err(VidqError::UnknownCommand(word.to_string())),
        };
        Ok(Some(action))
    }
}

fn looks_like_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Move between views.
///
/// Opening an empty search view asks for the default browse page.
pub fn navigate(current: View, target: View, results_empty: bool) -> (View, Option<Action>) {
    debug!("View {} -> {}", current.name(), target.name());
    let follow_up = (target == View::Search && results_empty).then_some(Action::Browse);
    (target, follow_up)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// View the message points at, if any
    pub hint: Option<View>,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, view: View) -> Self {
        self.hint = Some(view);
        self
    }
}

/// What the caller should show after a dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Show(View),
    Suggestions(Vec<String>),
    Help,
    Nothing,
    Quit,
}

/// Session state behind the interactive shell
pub struct App {
    view: View,
    lookup: VideoLookup,
    submitter: QueueSubmitter,
    pager: SearchPager,
    suggestions: Suggestions,
    poller: Arc<TaskPoller>,
    store: Arc<MetaStore>,
    trigger: DownloadTrigger,
    notices: Vec<Notice>,
    connectivity: watch::Receiver<bool>,
}

impl App {
    pub fn new(
        service: Arc<dyn VideoService>,
        store: Arc<MetaStore>,
        poller: Arc<TaskPoller>,
        trigger: DownloadTrigger,
    ) -> Self {
        Self {
            view: View::Home,
            lookup: VideoLookup::new(service.clone()),
            submitter: QueueSubmitter::new(service.clone(), store.clone())
                .with_refresh(poller.clone()),
            pager: SearchPager::new(service.clone()),
            suggestions: Suggestions::new(service),
            connectivity: poller.connectivity(),
            poller,
            store,
            trigger,
            notices: Vec::new(),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn lookup(&self) -> &VideoLookup {
        &self.lookup
    }

    pub fn pager(&self) -> &SearchPager {
        &self.pager
    }

    pub fn poller(&self) -> &Arc<TaskPoller> {
        &self.poller
    }

    /// Drain queued notices
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.check_connectivity();
        std::mem::take(&mut self.notices)
    }

    /// Run an action and any follow-up it triggers
    pub async fn dispatch(&mut self, action: Action) -> Outcome {
        let mut next = Some(action);
        let mut outcome = Outcome::Nothing;
        while let Some(action) = next.take() {
            let (result, follow_up) = self.step(action).await;
            outcome = result;
            next = follow_up;
        }
        outcome
    }

    async fn step(&mut self, action: Action) -> (Outcome, Option<Action>) {
        match action {
            Action::Navigate(target) => {
                let results_empty = self.pager.entries().is_empty();
                let (view, follow_up) = navigate(self.view, target, results_empty);
                self.view = view;
                if view == View::Tasks {
                    self.refresh_tasks().await;
                }
                (Outcome::Show(view), follow_up)
            }
            Action::Lookup(url) => {
                self.view = View::Home;
                let fetched = self.lookup.fetch(&url).await.map(|_| ());
                match fetched {
                    Ok(()) => (Outcome::Show(View::Home), None),
                    Err(e) => {
                        self.fail(&e);
                        (Outcome::Nothing, None)
                    }
                }
            }
            Action::SelectFormat(id) => match self.lookup.select(&id).map(|f| f.label.clone()) {
                Ok(label) => {
                    let message = format!("Quality set to {}", label);
                    self.notify(Notice::new(NoticeLevel::Info, message));
                    (Outcome::Show(View::Home), None)
                }
                Err(e) => {
                    self.fail(&e);
                    (Outcome::Nothing, None)
                }
            },
            Action::Enqueue => {
                self.enqueue().await;
                (Outcome::Nothing, None)
            }
            Action::Search(query) => {
                self.view = View::Search;
                match self.pager.search(&query).await {
                    Ok(_) => (Outcome::Show(View::Search), None),
                    Err(e) if e.is_user_input() => {
                        self.fail(&e);
                        (Outcome::Nothing, None)
                    }
                    Err(e) => {
                        warn!("Search for {:?} failed: {}", query, e);
                        self.notify(Notice::new(NoticeLevel::Error, "Search failed"));
                        (Outcome::Show(View::Search), None)
                    }
                }
            }
            Action::Browse => {
                if let Err(e) = self.pager.browse().await {
                    warn!("Browse failed: {}", e);
                    self.notify(Notice::new(NoticeLevel::Error, "Search failed"));
                }
                (Outcome::Show(View::Search), None)
            }
            Action::LoadMore => match self.pager.load_more().await {
                PageOutcome::Loaded(_) | PageOutcome::Empty => (Outcome::Show(View::Search), None),
                PageOutcome::Skipped => {
                    if !self.pager.has_more() {
                        self.notify(Notice::new(NoticeLevel::Info, "No more results"));
                    }
                    (Outcome::Nothing, None)
                }
                PageOutcome::Superseded => (Outcome::Nothing, None),
            },
            Action::Open(index) => {
                let Some(result) = index.checked_sub(1).and_then(|i| self.pager.result_at(i))
                else {
                    self.fail(&VidqError::NoSuchResult(index));
                    return (Outcome::Nothing, None);
                };
                self.view = View::Home;
                (Outcome::Nothing, Some(Action::Lookup(result.url)))
            }
            Action::Save(task_id) => {
                self.save(&task_id).await;
                (Outcome::Nothing, None)
            }
            Action::Forget(task_id) => {
                self.forget(&task_id).await;
                (Outcome::Nothing, None)
            }
            Action::Suggest(query) => match self.suggestions.complete(&query).await {
                Ok(list) => (Outcome::Suggestions(list), None),
                Err(e) => {
                    warn!("Suggestions for {:?} failed: {}", query, e);
                    (Outcome::Nothing, None)
                }
            },
            Action::Help => (Outcome::Help, None),
            Action::Quit => (Outcome::Quit, None),
        }
    }

    async fn enqueue(&mut self) {
        let Some(preview) = self.lookup.preview().cloned() else {
            self.fail(&VidqError::NoPreview);
            return;
        };
        match self.submitter.submit(&preview).await {
            Ok(task_id) => {
                debug!("Queued {} as {}", preview.title, task_id);
                self.notify(Notice::new(NoticeLevel::Success, "Task added").with_hint(View::Tasks));
            }
            Err(VidqError::SubmitInProgress) => {
                self.notify(Notice::new(
                    NoticeLevel::Warning,
                    VidqError::SubmitInProgress.to_string(),
                ));
            }
            Err(e) => {
                warn!("Enqueue of {} failed: {}", preview.source_url, e);
                self.notify(Notice::new(NoticeLevel::Error, "Failed to start download"));
            }
        }
    }

    async fn save(&mut self, id_or_prefix: &str) {
        self.refresh_tasks().await;
        let board = self.poller.snapshot().await;
        let card = match board.ready_card(id_or_prefix) {
            Ok(card) => card.clone(),
            Err(e) => {
                self.fail(&e);
                return;
            }
        };

        match self.trigger.save_card(&card).await {
            Ok(SaveOutcome::Saved { path, .. }) => {
                let message = format!("Saved {}", path.display());
                self.notify(Notice::new(NoticeLevel::Success, message));
            }
            Ok(SaveOutcome::Cancelled) => debug!("Save of {} cancelled", card.task_id),
            Err(e) => {
                warn!("Save of task {} failed: {}", card.task_id, e);
                self.notify(Notice::new(NoticeLevel::Error, "Download failed"));
            }
        }
    }

    async fn forget(&mut self, task_id: &str) {
        match self.store.remove(task_id.trim()).await {
            Ok(Some(_)) => {
                let message = format!("Forgot task {}", short_id(task_id.trim()));
                self.notify(Notice::new(NoticeLevel::Success, message));
            }
            Ok(None) => self.fail(&VidqError::UnknownTask(task_id.to_string())),
            Err(e) => self.fail(&e),
        }
    }

    async fn refresh_tasks(&self) {
        if let Err(e) = self.poller.poll_once().await {
            warn!("Task refresh failed: {}", e);
        }
    }

    /// Turn an online/offline flip of the poller into a notice
    fn check_connectivity(&mut self) {
        if !self.connectivity.has_changed().unwrap_or(false) {
            return;
        }
        let notice = if *self.connectivity.borrow_and_update() {
            Notice::new(NoticeLevel::Success, "Back online")
        } else {
            Notice::new(
                NoticeLevel::Warning,
                "Server unreachable; task progress may be out of date",
            )
        };
        self.notify(notice);
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn fail(&mut self, error: &VidqError) {
        let message = match error {
            VidqError::Server(message) => message.clone(),
            other => other.to_string(),
        };
        self.notify(Notice::new(NoticeLevel::Error, message));
    }
}
