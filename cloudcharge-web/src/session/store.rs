//! File-backed session storage.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::UserSummary;

use super::error::SessionError;

/// What a login leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user: UserSummary,
}

/// Persists the session as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the stored session.
    ///
    /// Returns `None` if there is no session file. An unreadable or corrupt
    /// file is logged and also treated as "logged out".
    pub fn load(&self) -> Option<SessionData> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read session file");
                return None;
            }
        };

        match serde_json::from_str::<SessionData>(&contents) {
            Ok(data) if !data.token.is_empty() => Some(data),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt session file");
                None
            }
        }
    }

    /// Write the session, creating parent directories as needed.
    pub fn save(&self, data: &SessionData) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::Io {
                message: format!("failed to create session directory: {}", e),
            })?;
        }

        let json = serde_json::to_string_pretty(data)?;

        std::fs::write(&self.path, json).map_err(|e| SessionError::Io {
            message: format!("failed to write session file: {}", e),
        })
    }

    /// Delete the stored session. Deleting a missing file is not an error.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Io {
                message: format!("failed to remove session file: {}", e),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use tempfile::tempdir;

    fn data() -> SessionData {
        SessionData {
            token: "jwt-token".into(),
            user: UserSummary {
                id: UserId::new("u1"),
                name: "Asha".into(),
                email: "asha@example.com".into(),
            },
        }
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        store.save(&data()).unwrap();
        assert_eq!(store.load(), Some(data()));
    }

    #[test]
    fn missing_file_is_logged_out() {
        let store = SessionStore::new("/nonexistent/path/session.json");
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_file_is_logged_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(SessionStore::new(&path).load(), None);
    }

    #[test]
    fn empty_token_is_logged_out() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut d = data();
        d.token.clear();
        store.save(&d).unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn clear_removes_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&data()).unwrap();

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        SessionStore::new(&path).save(&data()).unwrap();
        assert!(path.exists());
    }
}
