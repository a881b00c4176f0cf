//! Search pagination
//!
//! `SearchPager` owns the query, continuation token and in-flight flag of
//! one search session and the list of entries the results view renders.
//! The session lock is never held across a request; the in-flight flag is
//! what keeps two "load more" requests from running at once.

use crate::api::types::{SearchPage, SearchResult};
use crate::api::VideoService;
use crate::error::VidqError;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, warn};

/// Placeholder rows shown while a first page loads
pub const SKELETON_ROWS: usize = 6;

/// Query used when the search view is opened with nothing in it
pub const DEFAULT_BROWSE_QUERY: &str = "Trending";

/// Pager lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    Idle,
    FetchingFirstPage,
    FetchingNextPage,
    Exhausted,
}

/// One row of the results view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEntry {
    Skeleton,
    Item(SearchResult),
    LoadingMore,
    NoResults,
    Failed,
}

/// What a pager call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// `n` results were added to the view
    Loaded(usize),
    /// The response carried no results
    Empty,
    /// "Load more" was not allowed to start; no request was sent
    Skipped,
    /// A newer search replaced this one while the request was outstanding
    Superseded,
}

#[derive(Debug)]
struct SearchSession {
    state: PagerState,
    query: String,
    next_token: Option<String>,
    in_flight: bool,
    generation: u64,
    entries: Vec<ResultEntry>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self {
            state: PagerState::Idle,
            query: String::new(),
            next_token: None,
            in_flight: false,
            generation: 0,
            entries: Vec::new(),
        }
    }
}

impl SearchSession {
    fn results(&self) -> impl Iterator<Item = &SearchResult> {
        self.entries.iter().filter_map(|entry| match entry {
            ResultEntry::Item(result) => Some(result),
            _ => None,
        })
    }

    /// Settle state after a page arrived
    fn settle(&mut self, page: &SearchPage) {
        self.in_flight = false;
        if page.results.is_empty() {
            self.next_token = None;
            self.state = PagerState::Exhausted;
            return;
        }
        self.next_token = page.continuation().map(str::to_string);
        self.state = if self.next_token.is_some() {
            PagerState::Idle
        } else {
            PagerState::Exhausted
        };
    }
}

/// Paginated search over the service
pub struct SearchPager {
    service: Arc<dyn VideoService>,
    session: Mutex<SearchSession>,
}

impl SearchPager {
    pub fn new(service: Arc<dyn VideoService>) -> Self {
        Self {
            service,
            session: Mutex::new(SearchSession::default()),
        }
    }

    fn session(&self) -> MutexGuard<'_, SearchSession> {
        // a panic while holding the lock leaves plain data behind; keep going
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a new search, discarding previous results.
    ///
    /// An empty query is rejected without a request.
    pub async fn search(&self, query: &str) -> Result<PageOutcome, VidqError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(VidqError::EmptyInput("Please enter a search query"));
        }

        let generation = {
            let mut session = self.session();
            session.generation += 1;
            session.query = query.to_string();
            session.next_token = None;
            session.in_flight = true;
            session.state = PagerState::FetchingFirstPage;
            session.entries = vec![ResultEntry::Skeleton; SKELETON_ROWS];
            session.generation
        };

        debug!("Searching for {:?}", query);
        let response = self.service.search(query, "").await;

        let mut session = self.session();
        if session.generation != generation {
            debug!("Dropping first page of superseded search {:?}", query);
            return Ok(PageOutcome::Superseded);
        }

        match response {
            Ok(page) => {
                session.settle(&page);
                if page.results.is_empty() {
                    session.entries = vec![ResultEntry::NoResults];
                    return Ok(PageOutcome::Empty);
                }
                let count = page.results.len();
                session.entries = page.results.into_iter().map(ResultEntry::Item).collect();
                Ok(PageOutcome::Loaded(count))
            }
            Err(e) => {
                error!("Search for {:?} failed: {}", query, e);
                session.in_flight = false;
                session.state = PagerState::Idle;
                session.entries = vec![ResultEntry::Failed];
                Err(e)
            }
        }
    }

    /// Start the default browse search when nothing has been searched yet
    pub async fn browse(&self) -> Result<PageOutcome, VidqError> {
        if !self.session().entries.is_empty() {
            return Ok(PageOutcome::Skipped);
        }
        self.search(DEFAULT_BROWSE_QUERY).await
    }

    /// Fetch the next page.
    ///
    /// A no-op unless a continuation token is present and no fetch is in
    /// flight. Failures remove the loading row and are only logged.
    pub async fn load_more(&self) -> PageOutcome {
        let (query, token, generation) = {
            let mut session = self.session();
            let token = match (&session.next_token, session.in_flight) {
                (Some(token), false) => token.clone(),
                _ => return PageOutcome::Skipped,
            };
            session.in_flight = true;
            session.state = PagerState::FetchingNextPage;
            session.entries.push(ResultEntry::LoadingMore);
            (session.query.clone(), token, session.generation)
        };

        debug!("Loading next page of {:?}", query);
        let response = self.service.search(&query, &token).await;

        let mut session = self.session();
        if session.generation != generation {
            return PageOutcome::Superseded;
        }
        session
            .entries
            .retain(|entry| !matches!(entry, ResultEntry::LoadingMore));

        match response {
            Ok(page) => {
                session.settle(&page);
                let count = page.results.len();
                session
                    .entries
                    .extend(page.results.into_iter().map(ResultEntry::Item));
                if count == 0 {
                    PageOutcome::Empty
                } else {
                    PageOutcome::Loaded(count)
                }
            }
            Err(e) => {
                warn!("Next page of {:?} failed: {}", query, e);
                session.in_flight = false;
                session.state = PagerState::Idle;
                PageOutcome::Empty
            }
        }
    }

    pub fn state(&self) -> PagerState {
        self.session().state
    }

    pub fn query(&self) -> String {
        self.session().query.clone()
    }

    pub fn has_more(&self) -> bool {
        self.session().next_token.is_some()
    }

    pub fn is_in_flight(&self) -> bool {
        self.session().in_flight
    }

    /// Rows of the results view in display order
    pub fn entries(&self) -> Vec<ResultEntry> {
        self.session().entries.clone()
    }

    /// Loaded results in server order
    pub fn results(&self) -> Vec<SearchResult> {
        self.session().results().cloned().collect()
    }

    /// Result at a zero-based position among loaded results
    pub fn result_at(&self, index: usize) -> Option<SearchResult> {
        self.session().results().nth(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubService;

    fn result(n: usize) -> SearchResult {
        SearchResult {
            id: Some(format!("v{}", n)),
            title: format!("Video {}", n),
            url: format!("https://v.example/watch?v={}", n),
            thumbnail: None,
        }
    }

    fn page(range: std::ops::Range<usize>, token: Option<&str>) -> SearchPage {
        SearchPage {
            results: range.map(result).collect(),
            next_page_token: token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_empty_query_sends_nothing() {
        let service = Arc::new(StubService::default());
        let pager = SearchPager::new(service.clone());

        assert!(pager.search("  ").await.unwrap_err().is_user_input());
        assert_eq!(service.calls("search"), 0);
        assert_eq!(pager.state(), PagerState::Idle);
    }

    #[tokio::test]
    async fn test_first_page_then_next_page() {
        let service = Arc::new(StubService::default());
        service.push_page(Ok(page(0..3, Some("P2"))));
        service.push_page(Ok(page(3..5, Some("P3"))));
        let pager = SearchPager::new(service.clone());

        assert_eq!(pager.search("cats").await.unwrap(), PageOutcome::Loaded(3));
        assert_eq!(pager.state(), PagerState::Idle);
        assert!(pager.has_more());

        assert_eq!(pager.load_more().await, PageOutcome::Loaded(2));
        let titles: Vec<_> = pager.results().into_iter().map(|r| r.title).collect();
        assert_eq!(
            titles,
            vec!["Video 0", "Video 1", "Video 2", "Video 3", "Video 4"]
        );
        assert_eq!(
            service.searches(),
            vec![
                ("cats".to_string(), String::new()),
                ("cats".to_string(), "P2".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_load_more_sends_one_request() {
        let service = Arc::new(StubService::default());
        service.push_page(Ok(page(0..2, Some("P2"))));
        service.push_page(Ok(page(2..4, Some("P3"))));
        let pager = Arc::new(SearchPager::new(service.clone()));
        pager.search("cats").await.unwrap();

        let gate = service.gate_search();
        let first = tokio::spawn({
            let pager = pager.clone();
            async move { pager.load_more().await }
        });
        while !pager.is_in_flight() {
            tokio::task::yield_now().await;
        }

        assert_eq!(pager.load_more().await, PageOutcome::Skipped);
        assert_eq!(pager.state(), PagerState::FetchingNextPage);
        assert_eq!(pager.entries().last(), Some(&ResultEntry::LoadingMore));

        gate.add_permits(1);
        assert_eq!(first.await.unwrap(), PageOutcome::Loaded(2));
        assert_eq!(service.calls("search"), 2);
        assert!(!pager.entries().contains(&ResultEntry::LoadingMore));
    }

    #[tokio::test]
    async fn test_zero_results_renders_one_placeholder() {
        let service = Arc::new(StubService::default());
        service.push_page(Ok(SearchPage {
            results: vec![],
            next_page_token: Some("IGNORED".to_string()),
        }));
        let pager = SearchPager::new(service.clone());

        assert_eq!(pager.search("zzzz").await.unwrap(), PageOutcome::Empty);
        assert_eq!(pager.entries(), vec![ResultEntry::NoResults]);
        assert_eq!(pager.state(), PagerState::Exhausted);

        assert_eq!(pager.load_more().await, PageOutcome::Skipped);
        assert_eq!(service.calls("search"), 1);
    }

    #[tokio::test]
    async fn test_missing_token_exhausts() {
        let service = Arc::new(StubService::default());
        service.push_page(Ok(page(0..2, None)));
        let pager = SearchPager::new(service.clone());

        assert_eq!(pager.search("cats").await.unwrap(), PageOutcome::Loaded(2));
        assert_eq!(pager.state(), PagerState::Exhausted);
        assert_eq!(pager.load_more().await, PageOutcome::Skipped);
        assert_eq!(service.calls("search"), 1);
    }

    #[tokio::test]
    async fn test_new_search_restarts_after_exhaustion() {
        let service = Arc::new(StubService::default());
        service.push_page(Ok(page(0..1, Some(""))));
        service.push_page(Ok(page(5..6, Some("P2"))));
        let pager = SearchPager::new(service.clone());

        pager.search("one").await.unwrap();
        assert_eq!(pager.state(), PagerState::Exhausted);

        pager.search("two").await.unwrap();
        assert_eq!(pager.state(), PagerState::Idle);
        assert_eq!(pager.results(), vec![result(5)]);
        assert_eq!(pager.query(), "two");
    }

    #[tokio::test]
    async fn test_first_page_failure_shows_failed_row() {
        let service = Arc::new(StubService::default());
        service.push_page(Err(VidqError::Server("quota".to_string())));
        let pager = SearchPager::new(service.clone());

        assert!(pager.search("cats").await.is_err());
        assert_eq!(pager.entries(), vec![ResultEntry::Failed]);
        assert!(!pager.is_in_flight());
    }

    #[tokio::test]
    async fn test_next_page_failure_is_silent() {
        let service = Arc::new(StubService::default());
        service.push_page(Ok(page(0..2, Some("P2"))));
        service.push_page(Err(VidqError::Server("flaky".to_string())));
        service.push_page(Ok(page(2..3, None)));
        let pager = SearchPager::new(service.clone());
        pager.search("cats").await.unwrap();

        assert_eq!(pager.load_more().await, PageOutcome::Empty);
        assert_eq!(pager.results().len(), 2);
        assert!(!pager.entries().contains(&ResultEntry::LoadingMore));
        assert!(!pager.is_in_flight());

        // the token survives, so the user can scroll again
        assert_eq!(pager.load_more().await, PageOutcome::Loaded(1));
        assert_eq!(service.searches()[2].1, "P2");
    }

    #[tokio::test]
    async fn test_skeleton_rows_while_first_page_loads() {
        let service = Arc::new(StubService::default());
        service.push_page(Ok(page(0..1, None)));
        let gate = service.gate_search();
        let pager = Arc::new(SearchPager::new(service.clone()));

        let pending = tokio::spawn({
            let pager = pager.clone();
            async move { pager.search("cats").await }
        });
        while pager.state() != PagerState::FetchingFirstPage {
            tokio::task::yield_now().await;
        }
        assert_eq!(pager.entries(), vec![ResultEntry::Skeleton; SKELETON_ROWS]);

        gate.add_permits(1);
        pending.await.unwrap().unwrap();
        assert_eq!(pager.entries(), vec![ResultEntry::Item(result(0))]);
    }

    #[tokio::test]
    async fn test_superseded_first_page_is_discarded() {
        let service = Arc::new(StubService::default());
        service.push_page(Ok(page(0..1, Some("OLD"))));
        service.push_page(Ok(page(9..10, None)));
        let gate = service.gate_search();
        let pager = Arc::new(SearchPager::new(service.clone()));

        let stale = tokio::spawn({
            let pager = pager.clone();
            async move { pager.search("old").await }
        });
        while service.calls("search") < 1 {
            tokio::task::yield_now().await;
        }
        let fresh = tokio::spawn({
            let pager = pager.clone();
            async move { pager.search("new").await }
        });
        while service.calls("search") < 2 {
            tokio::task::yield_now().await;
        }

        gate.add_permits(2);
        let outcomes = (stale.await.unwrap().unwrap(), fresh.await.unwrap().unwrap());
        assert_eq!(outcomes.0, PageOutcome::Superseded);
        assert_eq!(pager.query(), "new");
        assert_eq!(pager.results().len(), 1);
    }

    #[tokio::test]
    async fn test_browse_only_runs_on_empty_view() {
        let service = Arc::new(StubService::default());
        service.push_page(Ok(page(0..1, None)));
        let pager = SearchPager::new(service.clone());

        pager.browse().await.unwrap();
        assert_eq!(service.searches()[0].0, DEFAULT_BROWSE_QUERY);
        assert_eq!(pager.browse().await.unwrap(), PageOutcome::Skipped);
        assert_eq!(service.calls("search"), 1);
    }
}
