//! Data transfer objects for web requests and responses.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{GeoPoint, StationId};
use crate::rank::RankedStation;

/// `datetime-local` input format, with and without seconds.
const DATETIME_LOCAL: &str = "%Y-%m-%dT%H:%M";
const DATETIME_LOCAL_SECS: &str = "%Y-%m-%dT%H:%M:%S";

// ============================================================================
// Browser position
// ============================================================================

/// Position the geolocation script appends to a page URL.
///
/// Values are kept as strings so a malformed one degrades to "unavailable"
/// instead of failing the whole request.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PositionQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    /// `0` once the browser has given up on a fix
    pub located: Option<String>,
}

/// Where the page is in the geolocation handshake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationState {
    /// The page has not asked the browser yet.
    Pending,
    /// Denied, timed out, unsupported or malformed.
    Unavailable,
    Known(GeoPoint),
}

impl LocationState {
    pub fn position(&self) -> Option<&GeoPoint> {
        match self {
            LocationState::Known(p) => Some(p),
            _ => None,
        }
    }
}

impl PositionQuery {
    pub fn location(&self) -> LocationState {
        let parse = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<f64>())
        };

        match (parse(&self.lat), parse(&self.lng)) {
            (Some(Ok(lat)), Some(Ok(lng))) => GeoPoint::new(lat, lng)
                .map(LocationState::Known)
                .unwrap_or(LocationState::Unavailable),
            (None, None) if self.located.as_deref() != Some("0") => LocationState::Pending,
            _ => LocationState::Unavailable,
        }
    }
}

// ============================================================================
// Notices
// ============================================================================

/// Confirmation shown after a redirect, carried as `?notice=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Registered,
    LoggedOut,
    SessionExpired,
    BookingCreated,
    BookingCancelled,
    Borrowed,
    Deposited,
    SwapCancelled,
    ProfileUpdated,
}

impl Notice {
    /// Parse a query value. Unknown values are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "registered" => Notice::Registered,
            "logged_out" => Notice::LoggedOut,
            "session_expired" => Notice::SessionExpired,
            "booking_created" => Notice::BookingCreated,
            "booking_cancelled" => Notice::BookingCancelled,
            "borrowed" => Notice::Borrowed,
            "deposited" => Notice::Deposited,
            "swap_cancelled" => Notice::SwapCancelled,
            "profile_updated" => Notice::ProfileUpdated,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Notice::Registered => "registered",
            Notice::LoggedOut => "logged_out",
            Notice::SessionExpired => "session_expired",
            Notice::BookingCreated => "booking_created",
            Notice::BookingCancelled => "booking_cancelled",
            Notice::Borrowed => "borrowed",
            Notice::Deposited => "deposited",
            Notice::SwapCancelled => "swap_cancelled",
            Notice::ProfileUpdated => "profile_updated",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notice::Registered => "Registration successful! Please log in.",
            Notice::LoggedOut => "You have been logged out.",
            Notice::SessionExpired => "Your session has expired. Please log in again.",
            Notice::BookingCreated => "Booking Successful!",
            Notice::BookingCancelled => "Booking cancelled successfully.",
            Notice::Borrowed => "Battery borrowed successfully! You can deposit it later.",
            Notice::Deposited => "Battery deposited successfully!",
            Notice::SwapCancelled => "Swap cancelled successfully.",
            Notice::ProfileUpdated => "Profile updated successfully!",
        }
    }

    /// Whether this notice reports a problem rather than a success.
    pub fn is_warning(&self) -> bool {
        matches!(self, Notice::SessionExpired)
    }

    /// Redirect target carrying this notice.
    pub fn redirect_to(&self, path: &str) -> String {
        format!("{path}?notice={}", self.as_str())
    }
}

/// Query accepted by pages that can show a notice.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
    /// Booked duration, for the booking confirmation
    pub hours: Option<String>,
    /// Estimated cost, for the booking confirmation
    pub total: Option<String>,
}

impl NoticeQuery {
    pub fn notice(&self) -> Option<Notice> {
        self.notice.as_deref().and_then(Notice::parse)
    }
}

// ============================================================================
// Page queries and forms
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct BookingQuery {
    /// Station to preselect, e.g. from a map popup
    pub station: Option<String>,
    /// `1` to list every ranked station instead of the nearest few
    pub all: Option<String>,
}

impl BookingQuery {
    pub fn show_all(&self) -> bool {
        self.all.as_deref() == Some("1")
    }

    pub fn station(&self) -> Option<StationId> {
        non_empty(&self.station).map(StationId::new)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// `1` to show the history view
    pub history: Option<String>,
}

impl HistoryQuery {
    pub fn show_history(&self) -> bool {
        self.history.as_deref() == Some("1")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EditQuery {
    /// `1` to open the profile form for editing
    pub edit: Option<String>,
}

impl EditQuery {
    pub fn editing(&self) -> bool {
        self.edit.as_deref() == Some("1")
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    /// Left blank to keep the current password
    #[serde(default)]
    pub password: Option<String>,
}

impl ProfileForm {
    /// The password exactly as typed, unless the field was left blank.
    pub fn new_password(&self) -> Option<String> {
        self.password.clone().filter(|p| !p.trim().is_empty())
    }
}

/// What the booking form's submit button asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    /// Re-render with a cost estimate, send nothing.
    Estimate,
    #[default]
    Book,
}

#[derive(Debug, Deserialize)]
pub struct BookingForm {
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub action: BookingAction,
}

impl BookingForm {
    pub fn station(&self) -> Option<StationId> {
        non_empty(&self.station).map(StationId::new)
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start.as_deref().and_then(parse_datetime_local)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end.as_deref().and_then(parse_datetime_local)
    }
}

/// A station picked from a list (borrow or deposit).
#[derive(Debug, Deserialize)]
pub struct StationForm {
    pub station: String,
}

// ============================================================================
// JSON responses
// ============================================================================

/// Query for `GET /api/stations/nearest`.
#[derive(Debug, Default, Deserialize)]
pub struct NearestQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

impl NearestQuery {
    pub fn location(&self) -> LocationState {
        PositionQuery {
            lat: self.lat.clone(),
            lng: self.lng.clone(),
            located: None,
        }
        .location()
    }
}

/// A station in the nearest-stations response.
#[derive(Debug, Serialize)]
pub struct NearestStationResult {
    pub id: String,
    pub name: String,
    pub status: String,
    pub distance_km: f64,
    pub price_per_kwh: Option<f64>,
    pub charged_batteries: u32,
}

impl NearestStationResult {
    pub fn from_ranked(ranked: &RankedStation) -> Self {
        let s = &ranked.station;
        Self {
            id: s.id.as_str().to_string(),
            name: s.name.clone(),
            status: s.status.label().to_string(),
            distance_km: ranked.distance_km,
            price_per_kwh: s.price_per_kwh,
            charged_batteries: s.batteries.charged,
        }
    }
}

/// Response for `GET /api/stations/nearest`.
#[derive(Debug, Serialize)]
pub struct NearestResponse {
    /// True when no position was given; `stations` is then empty.
    pub awaiting_location: bool,
    pub stations: Vec<NearestStationResult>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a `datetime-local` value as local time.
///
/// "Local" is the server's timezone; see `AppConfig::bind`.
///
/// Returns `None` for blank or malformed input, and for local times that
/// do not exist (skipped by a DST change).
pub fn parse_datetime_local(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let naive = NaiveDateTime::parse_from_str(value, DATETIME_LOCAL)
        .or_else(|_| NaiveDateTime::parse_from_str(value, DATETIME_LOCAL_SECS))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}
