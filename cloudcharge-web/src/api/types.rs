//! Wire types for the CloudCharge backend.
//!
//! These mirror the JSON the backend sends and accepts. Station records are
//! read leniently: a field of the wrong shape reads as absent and numbers
//! are kept as raw JSON, so a single odd record can't fail a whole list.
//! Validation happens in `convert`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Read an optional field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A station record from `GET /api/stations`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDto {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    /// Number or numeric string.
    pub price_per_kwh: Option<Value>,
    pub charged_batteries: Option<Value>,
    pub charging_batteries: Option<Value>,
    pub total_batteries: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<LocationDto>,
    /// Flat coordinates some older records carry instead of `location`.
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
}

/// GeoJSON-style location: `coordinates` is `[lng, lat]`.
///
/// Coordinates are kept as raw JSON values because older records store
/// them as strings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocationDto {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub coordinates: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub address: Option<String>,
}

/// A station reference: either a bare id or a populated document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StationRefDto {
    Id(String),
    Populated {
        #[serde(rename = "_id")]
        id: String,
        name: Option<String>,
    },
}

/// A user as returned by login and profile update.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserDto {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// A booking from `GET /api/bookings/user/:id`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub station: Option<StationRefDto>,
    /// Denormalised name some responses carry alongside `station`.
    pub station_name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
}

/// A swap from the swap endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub source_station: Option<StationRefDto>,
    pub destination_station: Option<StationRefDto>,
    pub swap_cost: Option<f64>,
    pub swapped_at: Option<DateTime<Utc>>,
    /// Older records only have `time`.
    pub time: Option<DateTime<Utc>>,
    pub status: String,
}

/// Body of `POST /api/users/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/users/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDto,
}

/// Body of `PUT /api/users/:id`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileResponse {
    pub updated_user: UserDto,
}

/// Body of `POST /api/bookings`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub user_id: String,
    pub station_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Body of `POST /api/swaps`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwapRequest {
    pub user_id: String,
    pub source_station: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSwapResponse {
    pub swap: SwapDto,
}

/// Body of `PUT /api/swaps/:id/deposit`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub destination_station: String,
}

/// Error body the backend sends with 4xx/5xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}
