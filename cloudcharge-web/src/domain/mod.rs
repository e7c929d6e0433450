//! Domain types for the CloudCharge client.
//!
//! These types are the validated, client-side view of what the backend
//! returns. Wire quirks (Mongo-style ids, GeoJSON coordinate order,
//! populated-or-bare references) are resolved in `api::convert` so that
//! everything here can be trusted as-is.

mod booking;
mod geo;
mod station;
mod swap;
mod user;

pub use booking::{
    Booking, BookingBoard, BookingDraft, BookingId, BookingRejection, BookingStatus, ValidBooking,
};
pub use geo::{EARTH_RADIUS_KM, GeoPoint, InvalidGeoPoint, haversine_km};
pub use station::{Station, StationId, StationRef, StationStatus, SwapInventory};
pub use swap::{Swap, SwapId, SwapPhase, SwapRejection, SwapStatus};
pub use user::{UserId, UserSummary};
