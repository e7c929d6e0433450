//! Application state for the web layer.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::api::{ApiClient, ApiError};
use crate::feed::StationFeed;
use crate::pricing::Tariff;
use crate::session::{SessionData, SessionHandle};

use super::error::AppError;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Backend client without credentials
    pub api: ApiClient,

    /// The logged-in user, if any
    pub session: SessionHandle,

    /// Latest station list
    pub feed: StationFeed,

    /// Booking cost parameters
    pub tariff: Arc<Tariff>,

    /// How long pages let the browser look for a position fix
    pub geolocation_timeout: Duration,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        api: ApiClient,
        session: SessionHandle,
        feed: StationFeed,
        tariff: Tariff,
        geolocation_timeout: Duration,
    ) -> Self {
        Self {
            api,
            session,
            feed,
            tariff: Arc::new(tariff),
            geolocation_timeout,
        }
    }

    /// A client that acts on behalf of the session's user.
    pub fn api_for(&self, session: &SessionData) -> Result<ApiClient, ApiError> {
        self.api.with_token(&session.token)
    }

    /// Convert a backend failure into a page error.
    ///
    /// A rejected token ends the session, so the next page load goes back
    /// to the login form instead of failing again.
    pub async fn api_failure(&self, err: ApiError) -> AppError {
        if matches!(err, ApiError::Unauthorized | ApiError::InvalidToken) {
            if let Err(e) = self.session.clear().await {
                warn!(error = %e, "could not clear expired session");
            }
            return AppError::SessionExpired;
        }
        AppError::from(err)
    }

    /// Refresh the station feed, logging rather than failing.
    pub async fn refresh_stations(&self) {
        if let Err(e) = self.feed.refresh().await {
            warn!(error = %e, "on-demand station refresh failed");
        }
    }
}
