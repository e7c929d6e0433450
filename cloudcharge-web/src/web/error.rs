//! Application error type.

use askama::Template;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{error, warn};

use crate::api::ApiError;
use crate::session::SessionError;

use super::dto::{ErrorResponse, Notice};
use super::templates::ErrorTemplate;

/// Application error type.
///
/// Renders as an HTML error page. Wrap it in [`JsonError`] for endpoints
/// that answer JSON.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    /// The backend failed or could not be reached
    Upstream { message: String },
    /// The backend no longer accepts the session's token
    SessionExpired,
    Internal { message: String },
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message.clone()),
            AppError::Upstream { message } => (StatusCode::BAD_GATEWAY, message.clone()),
            AppError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                Notice::SessionExpired.message().to_string(),
            ),
            AppError::Internal { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
        }
    }

    fn log(&self, status: StatusCode, message: &str) {
        if status.is_server_error() {
            error!(%status, reason = message, "request failed");
        } else {
            warn!(%status, reason = message, "request rejected");
        }
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        match &e {
            ApiError::Unauthorized | ApiError::InvalidToken => AppError::SessionExpired,
            ApiError::Api { status: 404, .. } => AppError::NotFound {
                message: e.user_message(),
            },
            _ => AppError::Upstream {
                message: e.user_message(),
            },
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Internal {
            message: format!("Template error: {e}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::SessionExpired) {
            return Redirect::to(&Notice::SessionExpired.redirect_to("/login")).into_response();
        }

        let (status, message) = self.status_and_message();
        self.log(status, &message);

        let page = ErrorTemplate {
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message,
        };
        let html = page
            .render()
            .unwrap_or_else(|e| format!("Template error: {e}"));
        (status, Html(html)).into_response()
    }
}

/// An [`AppError`] answered as `{ "error": ... }`.
#[derive(Debug)]
pub struct JsonError(pub AppError);

impl From<AppError> for JsonError {
    fn from(e: AppError) -> Self {
        JsonError(e)
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let (status, message) = self.0.status_and_message();
        self.0.log(status, &message);
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
