use reqwest::Method;
use tracing::info;

use super::HttpApi;
use crate::errors::ClientError;
use crate::models::{
    AuthResponse, LoginRequest, RegisterRequest, SendVerificationCodeRequest, UpdateProfileRequest,
    UpdatedProfile, UserProfile,
};

impl HttpApi {
    /// Exchange credentials for a token and store it in the session.
    pub async fn login(&self, request: &LoginRequest) -> Result<UserProfile, ClientError> {
        let body: AuthResponse = self
            .send_json(self.request(Method::POST, "/login").json(request))
            .await?;
        let user = UserProfile {
            id: body.id,
            email: request.email.clone(),
            display_name: body.display_name.unwrap_or_default(),
            avatar: body.avatar,
        };
        self.session().login_success(body.token, user.clone())?;
        Ok(user)
    }

    /// Create an account; a successful registration is also a login.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ClientError> {
        let body: AuthResponse = self
            .send_json(self.request(Method::POST, "/register").json(request))
            .await?;
        // the register response may omit the display name; the form has it
        let user = UserProfile {
            id: body.id,
            email: request.email.clone(),
            display_name: body
                .display_name
                .unwrap_or_else(|| request.display_name.clone()),
            avatar: body.avatar,
        };
        info!("Registered user {}", user.id);
        self.session().login_success(body.token, user.clone())?;
        Ok(user)
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.session().logout()
    }

    /// Ask the backend to mail a registration code to `email`.
    pub async fn send_verification_code(&self, email: &str, language: Option<&str>) -> Result<(), ClientError> {
        let request = SendVerificationCodeRequest {
            email: email.trim().to_string(),
            language: language.map(str::to_string),
        };
        self.send_empty(self.request(Method::POST, "/send-verification-code").json(&request))
            .await
    }

    /// Fetch the signed-in user's profile and refresh the stored session with it.
    pub async fn get_profile(&self) -> Result<UserProfile, ClientError> {
        let token = self.session().bearer().ok_or(ClientError::Unauthenticated)?;
        let user: UserProfile = self.send_json(self.request(Method::GET, "/profile")).await?;
        self.session().login_success(token, user.clone())?;
        Ok(user)
    }

    /// Save profile edits. The echoed fields are merged over the stored user,
    /// which keeps the email, and the session is re-established with the result.
    pub async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<UserProfile, ClientError> {
        let token = self.session().bearer().ok_or(ClientError::Unauthenticated)?;
        let body: UpdatedProfile = self
            .send_json(self.request(Method::PUT, "/profile").json(request))
            .await?;
        let mut user = self.session().user().unwrap_or_else(|| UserProfile {
            id: body.id.clone(),
            email: String::new(),
            display_name: String::new(),
            avatar: None,
        });
        user.id = body.id;
        if let Some(display_name) = body.display_name {
            user.display_name = display_name;
        }
        if body.avatar.is_some() {
            user.avatar = body.avatar;
        }
        info!("Updated profile for {}", user.id);
        self.session().login_success(token, user.clone())?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tempfile::tempdir;

    use super::*;
    use crate::api::http::tests::{api, logged_in, serve};
    use crate::session::{Session, SessionStore};

    #[tokio::test]
    async fn test_login_stores_session() {
        let router = Router::new().route(
            "/api/v1/login",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["email"], "alice");
                Json(json!({"token": "tok-9", "id": "alice", "display_name": "Alice"}))
            }),
        );
        let session = SessionStore::in_memory(Session::anonymous());
        let api = api(serve(router).await, session.clone());

        let user = api
            .login(&LoginRequest {
                email: "alice".into(),
                password: "s3cretpass".into(),
            })
            .await
            .unwrap();
        assert_eq!(user.display_name, "Alice");
        assert_eq!(session.bearer().as_deref(), Some("tok-9"));
    }

    #[tokio::test]
    async fn test_register_falls_back_to_form_display_name() {
        let router = Router::new().route(
            "/api/v1/register",
            post(|| async { Json(json!({"token": "tok-2", "id": "bob"})) }),
        );
        let session = SessionStore::in_memory(Session::anonymous());
        let api = api(serve(router).await, session.clone());

        let user = api
            .register(&RegisterRequest {
                id: "bob".into(),
                email: "bob@example.com".into(),
                password: "hunter22x".into(),
                display_name: "Bob".into(),
                verification_code: None,
            })
            .await
            .unwrap();
        assert_eq!(user.display_name, "Bob");
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_anonymous() {
        let router = Router::new().route(
            "/api/v1/login",
            post(|| async { (StatusCode::BAD_REQUEST, Json(json!({"message": "invalid credentials"}))) }),
        );
        let session = SessionStore::in_memory(Session::anonymous());
        let api = api(serve(router).await, session.clone());

        let err = api
            .login(&LoginRequest {
                email: "alice".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_send_verification_code_posts_email_and_language() {
        let router = Router::new().route(
            "/api/v1/send-verification-code",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body, json!({"email": "bob@example.com", "language": "fr"}));
                Json(json!({}))
            }),
        );
        let api = api(serve(router).await, SessionStore::in_memory(Session::anonymous()));

        api.send_verification_code(" bob@example.com ", Some("fr")).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_verification_code_omits_missing_language() {
        let router = Router::new().route(
            "/api/v1/send-verification-code",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body, json!({"email": "bob@example.com"}));
                (StatusCode::BAD_REQUEST, Json(json!({"message": "email already registered"})))
            }),
        );
        let api = api(serve(router).await, SessionStore::in_memory(Session::anonymous()));

        let err = api.send_verification_code("bob@example.com", None).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_profile_refreshes_session() {
        let router = Router::new().route(
            "/api/v1/profile",
            get(|headers: HeaderMap| async move {
                assert_eq!(headers["authorization"], "Bearer tok-1");
                Json(json!({
                    "id": "alice", "email": "alice@example.com",
                    "display_name": "Alice Liddell", "avatar": "https://img/a.png"
                }))
            }),
        );
        let session = logged_in();
        let api = api(serve(router).await, session.clone());

        let user = api.get_profile().await.unwrap();
        assert_eq!(user.display_name, "Alice Liddell");
        assert_eq!(session.user(), Some(user));
        assert_eq!(session.bearer().as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_get_profile_needs_a_session() {
        let router = Router::new().route("/api/v1/profile", get(|| async { Json(json!({"id": "x"})) }));
        let api = api(serve(router).await, SessionStore::in_memory(Session::anonymous()));

        let err = api.get_profile().await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_update_profile_sends_only_set_fields_and_relogs() {
        let router = Router::new().route(
            "/api/v1/profile",
            put(|Json(body): Json<Value>| async move {
                assert_eq!(body, json!({"display_name": "Al"}));
                Json(json!({"id": "alice", "display_name": "Al", "avatar": "https://img/a.png"}))
            }),
        );
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let session = SessionStore::open(path.clone());
        session
            .login_success(
                "tok-1",
                UserProfile {
                    id: "alice".into(),
                    email: "alice@example.com".into(),
                    display_name: "Alice".into(),
                    avatar: Some("https://img/a.png".into()),
                },
            )
            .unwrap();
        let api = api(serve(router).await, session.clone());

        let user = api
            .update_profile(&UpdateProfileRequest {
                display_name: Some("Al".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(user.display_name, "Al");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.avatar.as_deref(), Some("https://img/a.png"));

        // persisted too, so a restart sees the new name
        let reopened = SessionStore::open(path.clone());
        assert_eq!(reopened.user().map(|u| u.display_name).as_deref(), Some("Al"));
        assert_eq!(reopened.bearer().as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_old_profile() {
        let router = Router::new().route(
            "/api/v1/profile",
            put(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "db down") }),
        );
        let session = logged_in();
        let api = api(serve(router).await, session.clone());

        let err = api
            .update_profile(&UpdateProfileRequest {
                display_name: Some("Al".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
        assert_eq!(session.user().map(|u| u.display_name).as_deref(), Some("Alice"));
    }
}
