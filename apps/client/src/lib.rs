//! Client library for the Awesome Prompt backend.
//!
//! The `feed` module keeps a paged template feed in sync with the active
//! filter and applies like/favorite toggles optimistically. `api` holds the
//! REST transport the feed runs on.

pub mod api;
pub mod config;
pub mod content;
pub mod errors;
pub mod feed;
pub mod models;
pub mod session;

pub use api::{FeedBackend, HttpApi};
pub use config::Config;
pub use errors::{ClientError, ErrorKind};
pub use feed::{FilterState, OptimisticActionCoordinator, PaginatedFeedFetcher};
pub use session::{Session, SessionStore};
