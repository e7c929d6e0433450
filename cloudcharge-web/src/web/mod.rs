//! Web layer for the CloudCharge client.
//!
//! Server-rendered pages for stations, bookings, swaps and the user's
//! account, plus a small JSON endpoint for nearest-station lookups.

mod auth;
mod dto;
mod error;
mod routes;
mod state;
pub mod templates;

pub use auth::CurrentUser;
pub use dto::*;
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
