use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use super::{FeedBackend, FeedQuery, FeedResponse, ListTemplatesBody, SocialToggle};
use crate::api::templates::ForkResponse;
use crate::config::Config;
use crate::errors::ClientError;
use crate::models::{SocialKind, TemplateItem};
use crate::session::SessionStore;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToggleBody {
    #[serde(default)]
    is_liked: Option<bool>,
    #[serde(default)]
    is_favorited: Option<bool>,
    #[serde(default, alias = "likes_count")]
    like_count: Option<i64>,
    #[serde(default, alias = "favorites_count")]
    favorite_count: Option<i64>,
}

impl ToggleBody {
    fn for_kind(&self, kind: SocialKind) -> SocialToggle {
        match kind {
            SocialKind::Like => SocialToggle {
                active: self.is_liked,
                count: self.like_count,
            },
            SocialKind::Favorite => SocialToggle {
                active: self.is_favorited,
                count: self.favorite_count,
            },
        }
    }
}

/// REST client for the prompt backend.
/// Attaches the session's bearer token to every request and turns any 401
/// into a process-wide logout through the shared `SessionStore`.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration, session: SessionStore) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_config(config: &Config, session: SessionStore) -> Result<Self, ClientError> {
        Self::new(config.api_url.clone(), config.request_timeout, session)
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.session.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and decodes a JSON body on success.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.send(builder).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Sends the request and discards the body on success.
    pub(crate) async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ClientError> {
        self.send(builder).await.map(|_| ())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await.map_err(|e| {
            warn!("Request failed before a response arrived: {e}");
            ClientError::from(e)
        })?;

        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url().path());
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not read error body for status {}: {e}", status);
                String::new()
            }
        };
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or(body);

        Err(match status {
            StatusCode::UNAUTHORIZED => {
                self.session.handle_unauthenticated();
                ClientError::Unauthenticated
            }
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::BAD_REQUEST => ClientError::invalid("request", message),
            _ => {
                warn!("API returned {}: {}", status, message);
                ClientError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        })
    }
}

#[async_trait]
impl FeedBackend for HttpApi {
    async fn list_templates(&self, query: &FeedQuery) -> Result<FeedResponse, ClientError> {
        let builder = self.request(Method::GET, "/templates").query(&query.to_query());
        let body: ListTemplatesBody = self.send_json(builder).await?;
        Ok(body.into())
    }

    async fn toggle_social(&self, template_id: &str, kind: SocialKind) -> Result<SocialToggle, ClientError> {
        let path = format!("/templates/{}/{}", template_id, kind.path_segment());
        let body: ToggleBody = self.send_json(self.request(Method::POST, &path)).await?;
        Ok(body.for_kind(kind))
    }

    async fn delete_template(&self, template_id: &str) -> Result<(), ClientError> {
        let path = format!("/templates/{template_id}");
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn fork_template(&self, template_id: &str) -> Result<TemplateItem, ClientError> {
        let path = format!("/templates/{template_id}/fork");
        let body: ForkResponse = self.send_json(self.request(Method::POST, &path)).await?;
        Ok(body.template)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::RawQuery;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::feed::filter::{Filter, VisibilityFilter};
    use crate::feed::token::PageCursor;
    use crate::models::UserProfile;
    use crate::session::Session;

    /// Serve `router` on an ephemeral port and return its base URL.
    pub(crate) async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api/v1")
    }

    pub(crate) fn logged_in() -> SessionStore {
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

    pub(crate) fn api(base: String, session: SessionStore) -> HttpApi {
        HttpApi::new(base, Duration::from_secs(10), session).unwrap()
    }

    #[tokio::test]
    async fn test_list_sends_bearer_and_query() {
        let router = Router::new().route(
            "/api/v1/templates",
            get(|headers: HeaderMap, RawQuery(query): RawQuery| async move {
                assert_eq!(headers["authorization"], "Bearer tok-1");
                assert_eq!(query.as_deref(), Some("page_size=20&page_token=20%3A"));
                Json(json!({
                    "templates": [{"id": "a", "visibility": "VISIBILITY_PUBLIC"}],
                    "next_page_token": "",
                    "private_templates": [{"id": "b", "visibility": "VISIBILITY_PRIVATE"}],
                    "private_next_page_token": "40"
                }))
            }),
        );
        let api = api(serve(router).await, logged_in());

        let query = FeedQuery {
            filter: Filter {
                visibility: VisibilityFilter::Unset,
                ..Default::default()
            },
            page_size: 20,
            cursor: PageCursor::Mixed {
                public: "20".into(),
                private: "".into(),
            },
        };
        match api.list_templates(&query).await.unwrap() {
            FeedResponse::Mixed {
                public_items,
                private_items,
                public_token,
                private_token,
            } => {
                assert_eq!(public_items[0].id, "a");
                assert_eq!(private_items[0].id, "b");
                assert_eq!(public_token, "");
                assert_eq!(private_token, "40");
            }
            other => panic!("expected mixed view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let router = Router::new().route(
            "/api/v1/templates/:id/like",
            post(|| async { (AxumStatus::UNAUTHORIZED, Json(json!({"message": "token expired"}))) }),
        );
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let session = logged_in().with_unauthenticated_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let api = api(serve(router).await, session.clone());

        let err = api.toggle_social("tpl-1", SocialKind::Like).await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthenticated));
        assert!(!session.is_authenticated());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let router = Router::new()
            .route(
                "/api/v1/templates/:id",
                delete(|| async { (AxumStatus::NOT_FOUND, Json(json!({"message": "template not found"}))) }),
            )
            .route(
                "/api/v1/templates/:id/favorite",
                post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let api = api(serve(router).await, logged_in());

        match api.delete_template("gone").await.unwrap_err() {
            ClientError::NotFound(msg) => assert_eq!(msg, "template not found"),
            other => panic!("unexpected {other:?}"),
        }
        match api.toggle_social("x", SocialKind::Favorite).await.unwrap_err() {
            ClientError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreadable_error_body_keeps_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // promises 64 body bytes, sends 7, then hangs up
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 64\r\n\r\npartial")
                .await
                .unwrap();
        });
        let api = api(format!("http://{addr}/api/v1"), logged_in());

        match api.delete_template("tpl-1").await.unwrap_err() {
            ClientError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_toggle_reads_authoritative_counts() {
        let router = Router::new().route(
            "/api/v1/templates/:id/like",
            post(|| async { Json(json!({"is_liked": true, "like_count": 42})) }),
        );
        let api = api(serve(router).await, logged_in());

        let toggle = api.toggle_social("tpl-1", SocialKind::Like).await.unwrap();
        assert_eq!(toggle.active, Some(true));
        assert_eq!(toggle.count, Some(42));
    }

    #[tokio::test]
    async fn test_hung_request_times_out() {
        let router = Router::new().route(
            "/api/v1/templates",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(Value::Null)
            }),
        );
        let base = serve(router).await;
        let api = HttpApi::new(base, Duration::from_millis(100), logged_in()).unwrap();

        let query = FeedQuery {
            filter: Filter::default(),
            page_size: 20,
            cursor: PageCursor::Start,
        };
        let err = api.list_templates(&query).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout));
    }
}
