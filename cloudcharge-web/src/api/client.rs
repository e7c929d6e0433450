//! CloudCharge backend HTTP client.
//!
//! One method per backend endpoint. Responses are checked and decoded in
//! one place so that every endpoint maps failures to [`ApiError`] the same
//! way.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::{Booking, BookingId, Station, StationId, Swap, SwapId, UserId, UserSummary};

use super::convert::{
    bookings_from_dtos, stations_from_values, swap_from_dto, swaps_from_dtos, user_from_dto,
};
use super::error::ApiError;
use super::types::{
    BookingDto, CreateBookingRequest, CreateSwapRequest, CreateSwapResponse, DepositRequest,
    ErrorBody, LoginRequest, LoginResponse, RegisterRequest, SwapDto,
    UpdateProfileRequest, UpdateProfileResponse,
};

/// Default backend base URL (a locally running backend).
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// How much of an unparseable body to keep for diagnostics.
const BODY_SNIPPET_CHARS: usize = 500;

/// Configuration for the API client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, without a trailing slash
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Create a config for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs: 30,
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// CloudCharge backend client.
///
/// Cheap to clone. [`ApiClient::with_token`] returns a copy that sends the
/// session's bearer token with every request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    auth: Option<HeaderValue>,
}

impl ApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: Arc::from(config.base_url),
            auth: None,
        })
    }

    /// A copy of this client that authenticates as the given token.
    pub fn with_token(&self, token: &str) -> Result<Self, ApiError> {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| ApiError::InvalidToken)?;
        value.set_sensitive(true);

        Ok(Self {
            http: self.http.clone(),
            base_url: Arc::clone(&self.base_url),
            auth: Some(value),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.auth {
            Some(value) => builder.header(AUTHORIZATION, value.clone()),
            None => builder,
        }
    }

    /// Turn a non-success response into an error.
    async fn check(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Without a token a 401 is a plain failure (e.g. wrong password),
        // not an expired session.
        if self.auth.is_some()
            && (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN)
        {
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or(body);

        warn!(status = status.as_u16(), %message, "backend returned an error");

        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.check(builder.send().await?).await?;
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| ApiError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(BODY_SNIPPET_CHARS).collect()),
        })
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.check(builder.send().await?).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// `POST /api/users/register`
    pub async fn register(&self, req: &RegisterRequest) -> Result<(), ApiError> {
        debug!(email = %req.email, "registering user");
        self.send_empty(self.request(Method::POST, "/api/users/register").json(req))
            .await
    }

    /// `POST /api/users/login`. Returns the token and user summary.
    pub async fn login(&self, req: &LoginRequest) -> Result<(String, UserSummary), ApiError> {
        debug!(email = %req.email, "logging in");
        let res: LoginResponse = self
            .send_json(self.request(Method::POST, "/api/users/login").json(req))
            .await?;
        Ok((res.token, user_from_dto(res.user)))
    }

    /// `PUT /api/users/:id`. Returns the updated user summary.
    pub async fn update_profile(
        &self,
        user: &UserId,
        req: &UpdateProfileRequest,
    ) -> Result<UserSummary, ApiError> {
        let path = format!("/api/users/{}", user.as_str());
        let res: UpdateProfileResponse =
            self.send_json(self.request(Method::PUT, &path).json(req)).await?;
        Ok(user_from_dto(res.updated_user))
    }

    // ------------------------------------------------------------------
    // Stations
    // ------------------------------------------------------------------

    /// `GET /api/stations`
    pub async fn fetch_stations(&self) -> Result<Vec<Station>, ApiError> {
        // The backend has been seen to answer `null` for an empty collection
        let records: Option<Vec<serde_json::Value>> =
            self.send_json(self.request(Method::GET, "/api/stations")).await?;
        Ok(stations_from_values(records.unwrap_or_default()))
    }

    // ------------------------------------------------------------------
    // Bookings
    // ------------------------------------------------------------------

    /// `POST /api/bookings`
    pub async fn create_booking(&self, req: &CreateBookingRequest) -> Result<(), ApiError> {
        debug!(station = %req.station_id, "creating booking");
        self.send_empty(self.request(Method::POST, "/api/bookings").json(req))
            .await
    }

    /// `GET /api/bookings/user/:id`
    pub async fn fetch_user_bookings(&self, user: &UserId) -> Result<Vec<Booking>, ApiError> {
        let path = format!("/api/bookings/user/{}", user.as_str());
        let dtos: Option<Vec<BookingDto>> = self.send_json(self.request(Method::GET, &path)).await?;
        Ok(bookings_from_dtos(dtos.unwrap_or_default()))
    }

    /// `DELETE /api/bookings/:id`
    pub async fn cancel_booking(&self, booking: &BookingId) -> Result<(), ApiError> {
        debug!(booking = %booking, "cancelling booking");
        let path = format!("/api/bookings/{}", booking.as_str());
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    // ------------------------------------------------------------------
    // Swaps
    // ------------------------------------------------------------------

    /// `POST /api/swaps`. Returns the new swap if the backend echoed it.
    pub async fn create_swap(
        &self,
        user: &UserId,
        source: &StationId,
    ) -> Result<Option<Swap>, ApiError> {
        debug!(station = %source, "borrowing battery");
        let req = CreateSwapRequest {
            user_id: user.as_str().to_string(),
            source_station: source.as_str().to_string(),
        };
        let res: CreateSwapResponse = self
            .send_json(self.request(Method::POST, "/api/swaps").json(&req))
            .await?;
        Ok(swap_from_dto(res.swap))
    }

    /// `GET /api/swaps/user/:id`
    pub async fn fetch_user_swaps(&self, user: &UserId) -> Result<Vec<Swap>, ApiError> {
        let path = format!("/api/swaps/user/{}", user.as_str());
        let dtos: Option<Vec<SwapDto>> = self.send_json(self.request(Method::GET, &path)).await?;
        Ok(swaps_from_dtos(dtos.unwrap_or_default()))
    }

    /// `GET /api/swaps/active/:id`
    ///
    /// `null`, an empty body and 404 all mean there is no active swap.
    pub async fn fetch_active_swap(&self, user: &UserId) -> Result<Option<Swap>, ApiError> {
        let path = format!("/api/swaps/active/{}", user.as_str());
        let response = self.request(Method::GET, &path).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = self.check(response).await?.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let dto: Option<SwapDto> = serde_json::from_str(&body).map_err(|e| ApiError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(BODY_SNIPPET_CHARS).collect()),
        })?;

        Ok(dto.and_then(swap_from_dto))
    }

    /// `PUT /api/swaps/:id/deposit`
    pub async fn deposit_swap(&self, swap: &SwapId, destination: &StationId) -> Result<(), ApiError> {
        debug!(swap = %swap, station = %destination, "depositing battery");
        let path = format!("/api/swaps/{}/deposit", swap.as_str());
        let req = DepositRequest {
            destination_station: destination.as_str().to_string(),
        };
        self.send_empty(self.request(Method::PUT, &path).json(&req))
            .await
    }

    /// `PATCH /api/swaps/:id/cancel`
    pub async fn cancel_swap(&self, swap: &SwapId) -> Result<(), ApiError> {
        debug!(swap = %swap, "cancelling swap");
        let path = format!("/api/swaps/{}/cancel", swap.as_str());
        self.send_empty(self.request(Method::PATCH, &path)).await
    }
}
