//! Session storage error types.

/// Errors from persisting the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading or writing the session file failed
    #[error("session file error: {message}")]
    Io { message: String },

    /// The session couldn't be serialised
    #[error("session encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
