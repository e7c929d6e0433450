//! Session gate for authenticated pages.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::api::ApiClient;
use crate::session::SessionData;

use super::state::AppState;

/// The logged-in user, plus a client that acts as them.
///
/// Extracting this from a request without a session redirects to `/login`.
pub struct CurrentUser {
    pub session: SessionData,
    pub api: ApiClient,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Response> {
        let Some(session) = state.session.current().await else {
            debug!(path = %parts.uri.path(), "no session, redirecting to login");
            return Err(Redirect::to("/login").into_response());
        };

        match state.api_for(&session) {
            Ok(api) => Ok(CurrentUser { session, api }),
            Err(e) => Err(state.api_failure(e).await.into_response()),
        }
    }
}
