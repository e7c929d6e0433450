//! Backend API error types.

/// Errors from talking to the CloudCharge backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token missing, expired or rejected
    #[error("unauthorized: please log in again")]
    Unauthorized,

    /// The backend answered with an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body didn't match the expected shape
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// The session token can't be sent as a header
    #[error("invalid session token")]
    InvalidToken,
}

impl ApiError {
    /// The message to show a user, preferring what the backend said.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Api { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            ApiError::Http(e) if e.is_timeout() => {
                "The server took too long to respond. Try again.".to_string()
            }
            ApiError::Http(_) => "Could not reach the server. Try again.".to_string(),
            _ => "Something went wrong. Try again.".to_string(),
        }
    }
}
