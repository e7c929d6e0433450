//! CloudCharge backend API client.
//!
//! Everything the client knows comes from here: stations, bookings, swaps
//! and account operations. The backend speaks camelCase JSON with
//! Mongo-style `_id` fields; [`types`] mirrors that wire format and
//! [`convert`] turns it into `domain` types.
//!
//! All endpoints hang off a single configurable base URL.

mod client;
mod convert;
mod error;
mod types;

pub use client::{ApiClient, ApiConfig, DEFAULT_BASE_URL};
pub use convert::{
    booking_from_dto, bookings_from_dtos, station_from_dto, stations_from_values, swap_from_dto,
    swaps_from_dtos, user_from_dto,
};
pub use error::ApiError;
pub use types::{
    BookingDto, CreateBookingRequest, CreateSwapRequest, CreateSwapResponse, DepositRequest,
    LocationDto, LoginRequest, LoginResponse, RegisterRequest, StationDto, StationRefDto, SwapDto,
    UpdateProfileRequest, UpdateProfileResponse, UserDto,
};
