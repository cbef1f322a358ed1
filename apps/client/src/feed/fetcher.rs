use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::buckets::{Bucket, FeedBuckets, SharedBuckets};
use super::filter::{Filter, FilterSnapshot};
use super::lock;
use super::social::OptimisticActionCoordinator;
use super::token::{ContinuationToken, PageCursor};
use crate::api::{FeedBackend, FeedQuery, FeedResponse};
use crate::errors::{ClientError, ErrorKind};
use crate::models::TemplateItem;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Fetching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another page request is already outstanding.
    InFlight,
    /// Nothing left to page through.
    Exhausted,
}

/// What a `reset` or `load_more` call did to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { received: usize, has_more: bool },
    Skipped(SkipReason),
    /// A newer `reset` started while this request was outstanding; its
    /// response was dropped.
    Stale,
}

#[derive(Debug)]
struct FetchState {
    phase: FetchPhase,
    generation: u64,
    filter: Option<Filter>,
    token: ContinuationToken,
    has_more: bool,
    last_failure: Option<ErrorKind>,
}

impl Default for FetchState {
    fn default() -> Self {
        Self {
            phase: FetchPhase::Idle,
            generation: 0,
            filter: None,
            token: ContinuationToken::default(),
            has_more: false,
            last_failure: None,
        }
    }
}

/// Pages `GET /templates` into public and private buckets.
///
/// At most one request is outstanding at a time. Every `reset` starts a new
/// generation; a response that comes back for an older generation is dropped
/// without touching the buckets. Locks are never held across an `.await`.
pub struct PaginatedFeedFetcher {
    backend: Arc<dyn FeedBackend>,
    session: SessionStore,
    page_size: u32,
    buckets: SharedBuckets,
    state: Mutex<FetchState>,
}

/// Clears `Fetching` if the request future is dropped before it settles.
struct InFlight<'a> {
    fetcher: &'a PaginatedFeedFetcher,
    generation: u64,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock(&self.fetcher.state);
        if state.generation == self.generation && state.phase == FetchPhase::Fetching {
            debug!(generation = self.generation, "feed request abandoned");
            state.phase = FetchPhase::Idle;
        }
    }
}

impl PaginatedFeedFetcher {
    pub fn new(backend: Arc<dyn FeedBackend>, session: SessionStore, page_size: u32) -> Self {
        Self {
            backend,
            session,
            page_size: page_size.max(1),
            buckets: SharedBuckets::default(),
            state: Mutex::new(FetchState::default()),
        }
    }

    /// A coordinator mutating this fetcher's buckets.
    pub fn coordinator(&self) -> OptimisticActionCoordinator {
        OptimisticActionCoordinator::new(self.backend.clone(), self.session.clone(), self.buckets.clone())
    }

    /// Drop everything and fetch the first page for `filter`.
    ///
    /// Runs even while another request is in flight; that request's response
    /// will come back as `Stale`.
    pub async fn reset(&self, filter: Filter) -> Result<FetchOutcome, ClientError> {
        let filter = filter.resolved(self.session.is_authenticated());
        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.phase = FetchPhase::Fetching;
            state.filter = Some(filter.clone());
            state.token = ContinuationToken::default();
            state.has_more = false;
            state.last_failure = None;
            state.generation
        };
        let epoch = lock(&self.buckets).restart();
        debug!(generation, epoch, "resetting feed: {:?}", filter);

        let query = FeedQuery {
            filter,
            page_size: self.page_size,
            cursor: PageCursor::Start,
        };
        self.fetch(generation, query).await
    }

    /// Fetch the page after the stored token.
    ///
    /// A no-op while a request is in flight or when nothing is left.
    pub async fn load_more(&self) -> Result<FetchOutcome, ClientError> {
        let (generation, query) = {
            let mut state = lock(&self.state);
            if state.phase == FetchPhase::Fetching {
                return Ok(FetchOutcome::Skipped(SkipReason::InFlight));
            }
            let filter = match (&state.filter, state.has_more) {
                (Some(filter), true) => filter.clone(),
                _ => return Ok(FetchOutcome::Skipped(SkipReason::Exhausted)),
            };
            if state.token.is_exhausted() {
                state.has_more = false;
                return Ok(FetchOutcome::Skipped(SkipReason::Exhausted));
            }
            state.phase = FetchPhase::Fetching;
            state.last_failure = None;
            let query = FeedQuery {
                filter,
                page_size: self.page_size,
                cursor: state.token.cursor(),
            };
            (state.generation, query)
        };
        self.fetch(generation, query).await
    }

    /// Re-run `reset` for every published filter until the sender goes away.
    /// A filter change that lands mid-request abandons that request.
    pub async fn follow(&self, mut filters: watch::Receiver<FilterSnapshot>) {
        loop {
            let snapshot = filters.borrow_and_update().clone();
            tokio::select! {
                result = self.reset(snapshot.filter) => {
                    if let Err(e) = result {
                        warn!("Feed reset for filter v{} failed: {}", snapshot.version, e);
                    }
                    if filters.changed().await.is_err() {
                        break;
                    }
                }
                changed = filters.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    debug!(version = snapshot.version, "filter superseded mid-request");
                }
            }
        }
    }

    async fn fetch(&self, generation: u64, query: FeedQuery) -> Result<FetchOutcome, ClientError> {
        let mut guard = InFlight {
            fetcher: self,
            generation,
            armed: true,
        };
        let result = self.backend.list_templates(&query).await;
        guard.armed = false;
        self.settle(generation, &query.cursor, result)
    }

    fn settle(
        &self,
        generation: u64,
        cursor: &PageCursor,
        result: Result<FeedResponse, ClientError>,
    ) -> Result<FetchOutcome, ClientError> {
        let mut state = lock(&self.state);
        if state.generation != generation {
            debug!(generation, current = state.generation, "dropping stale feed page");
            return Ok(FetchOutcome::Stale);
        }
        state.phase = FetchPhase::Idle;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Feed page request failed: {}", e);
                state.last_failure = Some(e.kind());
                return Err(e);
            }
        };

        let page_size = self.page_size as usize;
        let (public_open, private_open) = cursor.open_sublists();
        let mut buckets = lock(&self.buckets);
        let mut received = 0;
        let mut full_page = false;

        let token = match response {
            FeedResponse::Single { items, next_token } => {
                if public_open || private_open {
                    received = items.len();
                    full_page = items.len() >= page_size;
                    for item in items {
                        let bucket = Bucket::from(item.visibility);
                        buckets.extend(bucket, [item]);
                    }
                }
                ContinuationToken::single(next_token)
            }
            FeedResponse::Mixed {
                public_items,
                private_items,
                public_token,
                private_token,
            } => {
                let mut take = |open: bool, bucket: Bucket, items: Vec<TemplateItem>, token: String| {
                    if !open {
                        if !items.is_empty() {
                            debug!("ignoring {} items from exhausted {:?} list", items.len(), bucket);
                        }
                        return String::new();
                    }
                    received += items.len();
                    // a sub-list that just returned an empty token is closed
                    full_page |= !token.is_empty() && items.len() >= page_size;
                    buckets.extend(bucket, items);
                    token
                };
                let public = take(public_open, Bucket::Public, public_items, public_token);
                let private = take(private_open, Bucket::Private, private_items, private_token);
                ContinuationToken::mixed(&public, &private)
            }
        };

        state.has_more = full_page || !token.is_exhausted();
        info!(
            "Feed page applied: {} items, next token {:?}, has_more={}",
            received,
            token.as_str(),
            state.has_more
        );
        state.token = token;
        Ok(FetchOutcome::Applied {
            received,
            has_more: state.has_more,
        })
    }

    pub fn phase(&self) -> FetchPhase {
        lock(&self.state).phase
    }

    pub fn is_fetching(&self) -> bool {
        self.phase() == FetchPhase::Fetching
    }

    pub fn has_more(&self) -> bool {
        lock(&self.state).has_more
    }

    pub fn token(&self) -> ContinuationToken {
        lock(&self.state).token.clone()
    }

    /// The filter of the current generation, after session resolution.
    pub fn filter(&self) -> Option<Filter> {
        lock(&self.state).filter.clone()
    }

    /// Why the last request of this generation failed, if it did.
    pub fn last_failure(&self) -> Option<ErrorKind> {
        lock(&self.state).last_failure
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// A copy of both buckets for rendering.
    pub fn snapshot(&self) -> FeedBuckets {
        lock(&self.buckets).clone()
    }

    pub fn buckets(&self) -> SharedBuckets {
        self.buckets.clone()
    }

    /// Remove a template from the rendered feed without refetching.
    pub fn evict(&self, template_id: &str) -> usize {
        lock(&self.buckets).evict(template_id)
    }
}
