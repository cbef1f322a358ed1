//! Feed synchronization: the active filter, paged retrieval into public and
//! private buckets, and optimistic like/favorite toggles on bucket items.

use std::sync::{Mutex, MutexGuard};

pub mod buckets;
pub mod fetcher;
pub mod filter;
pub mod social;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use buckets::{Bucket, FeedBuckets, SharedBuckets};
pub use fetcher::{FetchOutcome, FetchPhase, PaginatedFeedFetcher, SkipReason};
pub use filter::{Filter, FilterSnapshot, FilterState, FilterUpdate, VisibilityFilter};
pub use social::{OptimisticActionCoordinator, PendingToggle};
pub use token::{ContinuationToken, PageCursor, SEPARATOR};

/// Locks are only held for short synchronous sections, so a poisoned lock
/// still guards consistent data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
