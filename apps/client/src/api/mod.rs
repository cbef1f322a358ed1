//! Transport layer: the only place that talks to the REST backend.
//!
//! The feed components depend on the `FeedBackend` trait rather than on
//! `HttpApi`, so they can be driven by an in-memory backend in tests.

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::ClientError;
use crate::feed::filter::Filter;
use crate::feed::token::PageCursor;
use crate::models::{SocialKind, TemplateItem};

mod auth;
mod catalog;
mod http;
mod prompts;
mod templates;

pub use catalog::{SidebarData, DEFAULT_VISIBLE_CATEGORIES};
pub use http::HttpApi;
pub use templates::{ForkResponse, TemplateDetails, UpdateTemplateResponse};

/// One page request against `GET /templates`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub filter: Filter,
    pub page_size: u32,
    pub cursor: PageCursor,
}

impl FeedQuery {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = self.filter.to_query();
        query.push(("page_size", self.page_size.to_string()));
        if let Some(token) = self.cursor.page_token() {
            query.push(("page_token", token));
        }
        query
    }
}

/// A feed page, tagged by the shape the server answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedResponse {
    Single {
        items: Vec<TemplateItem>,
        next_token: String,
    },
    Mixed {
        public_items: Vec<TemplateItem>,
        private_items: Vec<TemplateItem>,
        public_token: String,
        private_token: String,
    },
}

/// Wire form of the listing body. Presence of either private field marks
/// the mixed view; both lists may arrive as `null`.
#[derive(Debug, Deserialize)]
pub(crate) struct ListTemplatesBody {
    #[serde(default)]
    templates: Option<Vec<TemplateItem>>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    private_templates: Option<Vec<TemplateItem>>,
    #[serde(default)]
    private_next_page_token: Option<String>,
}

impl From<ListTemplatesBody> for FeedResponse {
    fn from(body: ListTemplatesBody) -> Self {
        let mixed = body.private_templates.is_some() || body.private_next_page_token.is_some();
        if mixed {
            FeedResponse::Mixed {
                public_items: body.templates.unwrap_or_default(),
                private_items: body.private_templates.unwrap_or_default(),
                public_token: body.next_page_token.unwrap_or_default(),
                private_token: body.private_next_page_token.unwrap_or_default(),
            }
        } else {
            FeedResponse::Single {
                items: body.templates.unwrap_or_default(),
                next_token: body.next_page_token.unwrap_or_default(),
            }
        }
    }
}

/// Server answer to a like/favorite toggle. Either field may be missing,
/// in which case the optimistic value stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocialToggle {
    pub active: Option<bool>,
    pub count: Option<i64>,
}

/// The slice of the backend the feed components need.
#[async_trait]
pub trait FeedBackend: Send + Sync {
    async fn list_templates(&self, query: &FeedQuery) -> Result<FeedResponse, ClientError>;

    async fn toggle_social(&self, template_id: &str, kind: SocialKind) -> Result<SocialToggle, ClientError>;

    async fn delete_template(&self, template_id: &str) -> Result<(), ClientError>;

    async fn fork_template(&self, template_id: &str) -> Result<TemplateItem, ClientError>;
}
