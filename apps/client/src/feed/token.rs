//! Continuation tokens for the template feed.
//!
//! A single-list view hands back one opaque cursor. The mixed view pages the
//! public and the private list independently and the two sub-tokens are kept
//! as one string joined by [`SEPARATOR`]. An empty sub-token marks that
//! sub-list as exhausted.

use std::fmt;

pub const SEPARATOR: char = ':';

/// The continuation value stored between page requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn single(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn mixed(public: &str, private: &str) -> Self {
        Self(format!("{public}{SEPARATOR}{private}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Some((public, private))` when this is a combined mixed-view token.
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once(SEPARATOR)
    }

    /// True when no sub-list has anything left to page through.
    pub fn is_exhausted(&self) -> bool {
        match self.split() {
            Some((public, private)) => public.is_empty() && private.is_empty(),
            None => self.0.is_empty(),
        }
    }

    /// The cursor to send for the page after this token.
    pub fn cursor(&self) -> PageCursor {
        match self.split() {
            Some((public, private)) => PageCursor::Mixed {
                public: public.to_string(),
                private: private.to_string(),
            },
            None => PageCursor::Single(self.0.clone()),
        }
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the next page request starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Start,
    Single(String),
    Mixed { public: String, private: String },
}

impl PageCursor {
    /// Value of the `page_token` query parameter, if any.
    pub fn page_token(&self) -> Option<String> {
        match self {
            PageCursor::Start => None,
            PageCursor::Single(token) if token.is_empty() => None,
            PageCursor::Single(token) => Some(token.clone()),
            PageCursor::Mixed { public, private } => {
                Some(ContinuationToken::mixed(public, private).0)
            }
        }
    }

    /// Which sub-lists can still yield items: `(public, private)`.
    /// A single-list cursor reports the same answer for both halves.
    pub fn open_sublists(&self) -> (bool, bool) {
        match self {
            PageCursor::Start => (true, true),
            PageCursor::Single(token) => (!token.is_empty(), !token.is_empty()),
            PageCursor::Mixed { public, private } => (!public.is_empty(), !private.is_empty()),
        }
    }
}
