//! Process-wide session accessor.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::domain::UserSummary;

use super::error::SessionError;
use super::store::{SessionData, SessionStore};

/// Shared handle to the current session.
///
/// Clones share the same session. Every change is written through to the
/// store before it becomes visible, so a restart picks up where the last
/// process left off.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<SessionData>>>,
    store: SessionStore,
}

impl SessionHandle {
    /// Load the session from `store`.
    pub fn load(store: SessionStore) -> Self {
        let data = store.load();
        if let Some(d) = &data {
            info!(user = %d.user.email, "restored session");
        }
        Self {
            inner: Arc::new(RwLock::new(data)),
            store,
        }
    }

    /// The current session, if logged in.
    pub async fn current(&self) -> Option<SessionData> {
        self.inner.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Start a session after a successful login.
    pub async fn establish(&self, data: SessionData) -> Result<(), SessionError> {
        let mut guard = self.inner.write().await;
        self.store.save(&data)?;
        info!(user = %data.user.email, "logged in");
        *guard = Some(data);
        Ok(())
    }

    /// Replace the stored user summary (after a profile update).
    ///
    /// Does nothing when logged out.
    pub async fn update_user(&self, user: UserSummary) -> Result<(), SessionError> {
        let mut guard = self.inner.write().await;
        let Some(current) = guard.as_ref() else {
            return Ok(());
        };

        let updated = SessionData {
            token: current.token.clone(),
            user,
        };
        self.store.save(&updated)?;
        *guard = Some(updated);
        Ok(())
    }

    /// End the session.
    pub async fn clear(&self) -> Result<(), SessionError> {
        let mut guard = self.inner.write().await;
        self.store.clear()?;
        if guard.take().is_some() {
            info!("logged out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use tempfile::tempdir;

    fn data(name: &str) -> SessionData {
        SessionData {
            token: "tok".into(),
            user: UserSummary {
                id: UserId::new("u1"),
                name: name.into(),
                email: "asha@example.com".into(),
            },
        }
    }

    #[tokio::test]
    async fn survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let handle = SessionHandle::load(SessionStore::new(&path));
        assert!(!handle.is_authenticated().await);
        handle.establish(data("Asha")).await.unwrap();

        let reloaded = SessionHandle::load(SessionStore::new(&path));
        assert_eq!(reloaded.current().await, Some(data("Asha")));
    }

    #[tokio::test]
    async fn clear_ends_session_everywhere() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let handle = SessionHandle::load(SessionStore::new(&path));
        let other = handle.clone();
        handle.establish(data("Asha")).await.unwrap();
        assert!(other.is_authenticated().await);

        other.clear().await.unwrap();
        assert!(!handle.is_authenticated().await);
        assert_eq!(SessionHandle::load(SessionStore::new(&path)).current().await, None);
    }

    #[tokio::test]
    async fn update_user_keeps_token() {
        let dir = tempdir().unwrap();
        let handle = SessionHandle::load(SessionStore::new(dir.path().join("s.json")));
        handle.establish(data("Asha")).await.unwrap();

        handle.update_user(data("Asha R").user).await.unwrap();
        let current = handle.current().await.unwrap();
        assert_eq!(current.token, "tok");
        assert_eq!(current.user.name, "Asha R");
    }

    #[tokio::test]
    async fn update_user_when_logged_out_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        let handle = SessionHandle::load(SessionStore::new(&path));

        handle.update_user(data("Asha").user).await.unwrap();
        assert!(!handle.is_authenticated().await);
        assert!(!path.exists());
    }
}
