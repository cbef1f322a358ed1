//! In-memory `FeedBackend` with scripted answers for fetcher and coordinator tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::lock;
use crate::api::{FeedBackend, FeedQuery, FeedResponse, SocialToggle};
use crate::errors::ClientError;
use crate::models::{SocialKind, TemplateItem, UserProfile, Visibility};
use crate::session::{Session, SessionStore};

pub(crate) fn item(id: &str, visibility: Visibility) -> TemplateItem {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "owner_id": "alice",
        "title": format!("Template {id}"),
        "visibility": visibility,
    }))
    .expect("valid template fixture")
}

pub(crate) fn items(prefix: &str, n: usize, visibility: Visibility) -> Vec<TemplateItem> {
    (0..n).map(|i| item(&format!("{prefix}{i}"), visibility)).collect()
}

pub(crate) fn signed_in() -> SessionStore {
    SessionStore::in_memory(Session::authenticated(
        "tok-1",
        UserProfile {
            id: "alice".into(),
            email: "alice@example.com".into(),
            display_name: "Alice".into(),
            avatar: None,
        },
    ))
}

pub(crate) fn anonymous() -> SessionStore {
    SessionStore::in_memory(Session::anonymous())
}

struct Scripted<T> {
    result: Result<T, ClientError>,
    gate: Option<Arc<Notify>>,
}

impl<T> Scripted<T> {
    async fn release(self) -> Result<T, ClientError> {
        match self.gate {
            Some(gate) => gate.notified().await,
            // always suspend once so concurrent callers interleave
            None => tokio::task::yield_now().await,
        }
        self.result
    }
}

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    pages: Mutex<VecDeque<Scripted<FeedResponse>>>,
    toggles: Mutex<VecDeque<Scripted<SocialToggle>>>,
    deletes: Mutex<VecDeque<Result<(), ClientError>>>,
    queries: Mutex<Vec<FeedQuery>>,
    toggle_calls: Mutex<Vec<(String, SocialKind)>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_page(&self, result: Result<FeedResponse, ClientError>) {
        lock(&self.pages).push_back(Scripted { result, gate: None });
    }

    pub(crate) fn push_gated_page(&self, result: Result<FeedResponse, ClientError>, gate: Arc<Notify>) {
        lock(&self.pages).push_back(Scripted {
            result,
            gate: Some(gate),
        });
    }

    pub(crate) fn push_toggle(&self, result: Result<SocialToggle, ClientError>) {
        lock(&self.toggles).push_back(Scripted { result, gate: None });
    }

    pub(crate) fn push_gated_toggle(&self, result: Result<SocialToggle, ClientError>, gate: Arc<Notify>) {
        lock(&self.toggles).push_back(Scripted {
            result,
            gate: Some(gate),
        });
    }

    pub(crate) fn push_delete(&self, result: Result<(), ClientError>) {
        lock(&self.deletes).push_back(result);
    }

    pub(crate) fn queries(&self) -> Vec<FeedQuery> {
        lock(&self.queries).clone()
    }

    pub(crate) fn toggle_calls(&self) -> Vec<(String, SocialKind)> {
        lock(&self.toggle_calls).clone()
    }
}

fn unscripted() -> ClientError {
    ClientError::Api {
        status: 500,
        message: "no scripted response".into(),
    }
}

#[async_trait]
impl FeedBackend for ScriptedBackend {
    async fn list_templates(&self, query: &FeedQuery) -> Result<FeedResponse, ClientError> {
        lock(&self.queries).push(query.clone());
        let next = lock(&self.pages).pop_front();
        match next {
            Some(scripted) => scripted.release().await,
            None => Err(unscripted()),
        }
    }

    async fn toggle_social(&self, template_id: &str, kind: SocialKind) -> Result<SocialToggle, ClientError> {
        lock(&self.toggle_calls).push((template_id.to_string(), kind));
        let next = lock(&self.toggles).pop_front();
        match next {
            Some(scripted) => scripted.release().await,
            None => Ok(SocialToggle::default()),
        }
    }

    async fn delete_template(&self, _template_id: &str) -> Result<(), ClientError> {
        tokio::task::yield_now().await;
        lock(&self.deletes).pop_front().unwrap_or(Ok(()))
    }

    async fn fork_template(&self, template_id: &str) -> Result<TemplateItem, ClientError> {
        tokio::task::yield_now().await;
        Ok(item(&format!("{template_id}-fork"), Visibility::Private))
    }
}
