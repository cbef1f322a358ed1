//! Authenticated session state, shared by the transport and the feed components.
//!
//! A `SessionStore` is constructed once and cloned into whatever needs it.
//! When a file path is configured the token and profile are mirrored to disk
//! so a later process starts already logged in.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::errors::ClientError;
use crate::models::UserProfile;

/// Credentials of the current user, or nothing for an anonymous visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: Some(token.into()),
            user: Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

/// On-disk form. Both halves must be present for a restore to count.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
    user: UserProfile,
}

type UnauthenticatedHook = Arc<dyn Fn() + Send + Sync>;

struct Inner {
    session: RwLock<Session>,
    path: Option<PathBuf>,
    on_unauthenticated: RwLock<Option<UnauthenticatedHook>>,
}

/// Cheaply clonable handle to the process session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.read())
            .field("path", &self.inner.path)
            .finish()
    }
}

impl SessionStore {
    fn build(session: Session, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: RwLock::new(session),
                path,
                on_unauthenticated: RwLock::new(None),
            }),
        }
    }

    /// A store that never touches the filesystem.
    pub fn in_memory(session: Session) -> Self {
        Self::build(session, None)
    }

    /// Restore the session persisted at `path`.
    /// A missing file yields an anonymous session; an unreadable one is
    /// removed and also yields an anonymous session.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = match restore(&path) {
            Ok(Some(persisted)) => {
                info!("Restored session for user {}", persisted.user.id);
                Session::authenticated(persisted.token, persisted.user)
            }
            Ok(None) => Session::anonymous(),
            Err(e) => {
                error!("Failed to restore session from {}: {e}", path.display());
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("Could not remove corrupt session file: {e}");
                }
                Session::anonymous()
            }
        };
        Self::build(session, Some(path))
    }

    /// Install the callback fired after a 401 has cleared the credentials.
    pub fn with_unauthenticated_hook(self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        *self
            .inner
            .on_unauthenticated
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(hook));
        self
    }

    pub fn current(&self) -> Session {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn bearer(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read().user.clone()
    }

    pub fn login_success(&self, token: impl Into<String>, user: UserProfile) -> Result<(), ClientError> {
        let session = Session::authenticated(token, user);
        if let (Some(path), Some(token), Some(user)) = (&self.inner.path, &session.token, &session.user) {
            persist(path, token, user)?;
        }
        info!("Logged in as {}", session.user_id().unwrap_or_default());
        *self.write() = session;
        Ok(())
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        *self.write() = Session::anonymous();
        if let Some(path) = &self.inner.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Clear credentials process-wide and notify the installed hook.
    pub fn handle_unauthenticated(&self) {
        warn!("Server rejected credentials; clearing session");
        if let Err(e) = self.logout() {
            error!("Failed to clear persisted session: {e}");
        }
        let hook = self
            .inner
            .on_unauthenticated
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.session.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.session.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn restore(path: &Path) -> Result<Option<PersistedSession>, ClientError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

fn persist(path: &Path, token: &str, user: &UserProfile) -> Result<(), ClientError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(&PersistedSession {
        token: token.to_string(),
        user: user.clone(),
    })?;
    std::fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn alice() -> UserProfile {
        UserProfile {
            id: "alice".into(),
            email: "alice@example.com".into(),
            display_name: "Alice".into(),
            avatar: None,
        }
    }

    #[test]
    fn test_login_persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::open(&path);
        assert!(!store.is_authenticated());
        store.login_success("tok-1", alice()).unwrap();

        let reopened = SessionStore::open(&path);
        assert_eq!(reopened.bearer().as_deref(), Some("tok-1"));
        assert_eq!(reopened.user().unwrap().id, "alice");
    }

    #[test]
    fn test_logout_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::open(&path);
        store.login_success("tok-1", alice()).unwrap();

        store.logout().unwrap();
        assert!(!path.exists());
        assert!(!store.is_authenticated());
        // second logout is a no-op
        store.logout().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SessionStore::open(&path);
        assert!(!store.is_authenticated());
        assert!(!path.exists());
    }

    #[test]
    fn test_unauthenticated_clears_and_notifies() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let store = SessionStore::in_memory(Session::authenticated("tok", alice()))
            .with_unauthenticated_hook(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        store.handle_unauthenticated();
        assert!(!store.is_authenticated());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::in_memory(Session::anonymous());
        let other = store.clone();
        store.login_success("tok", alice()).unwrap();
        assert!(other.is_authenticated());
    }
}
