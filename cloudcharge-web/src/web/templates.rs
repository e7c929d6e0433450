//! Askama templates for the web frontend.

use std::time::Duration;

use askama::Template;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::domain::{
    Booking, BookingStatus, GeoPoint, Station, StationStatus, Swap, SwapStatus, UserSummary,
};
use crate::pricing::CostEstimate;
use crate::rank::RankedStation;

use super::dto::{LocationState, Notice, NoticeQuery};

/// Map centre when the user's position is unknown.
const DEFAULT_MAP_CENTER: (f64, f64) = (20.5937, 78.9629);
const DEFAULT_MAP_ZOOM: u8 = 5;
const LOCATED_MAP_ZOOM: u8 = 13;

/// Shown in place of a station name the backend did not populate.
pub const UNKNOWN_STATION: &str = "Unknown";

// ============================================================================
// Public Templates (extend base.html)
// ============================================================================

#[derive(Template)]
#[template(path = "landing.html")]
pub struct LandingTemplate;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub flash: Option<Flash>,
    pub email: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub flash: Option<Flash>,
    pub name: String,
    pub email: String,
}

/// Error page.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub message: String,
}

// ============================================================================
// App Templates (extend app.html, which adds the sidebar)
// ============================================================================

/// Home: map, quick actions and every station.
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub sidebar: Sidebar,
    pub location: LocationView,
    pub map: MapView,
    pub stations: Vec<StationRow>,
    pub stations_loaded: bool,
    /// When the station list was last fetched
    pub updated: Option<String>,
}

/// Full-page station map.
#[derive(Template)]
#[template(path = "map.html")]
pub struct MapTemplate {
    pub sidebar: Sidebar,
    pub location: LocationView,
    pub map: MapView,
    /// Stations left off the map for lack of coordinates
    pub unplaced: usize,
}

#[derive(Template)]
#[template(path = "booking.html")]
pub struct BookingTemplate {
    pub sidebar: Sidebar,
    pub location: LocationView,
    pub flash: Option<Flash>,
    /// Nearest stations, truncated unless `show_all`
    pub nearest: Vec<StationRow>,
    pub show_all: bool,
    /// More ranked stations exist than are listed
    pub has_more: bool,
    pub options: Vec<StationOption>,
    pub start: String,
    pub end: String,
    pub estimate: Option<EstimateView>,
    pub stations_loaded: bool,
}

#[derive(Template)]
#[template(path = "my_bookings.html")]
pub struct MyBookingsTemplate {
    pub sidebar: Sidebar,
    pub flash: Option<Flash>,
    pub active: Vec<BookingRow>,
    pub completed: Vec<BookingRow>,
    pub cancelled: Vec<BookingRow>,
}

#[derive(Template)]
#[template(path = "swap.html")]
pub struct SwapTemplate {
    pub sidebar: Sidebar,
    pub location: LocationView,
    pub flash: Option<Flash>,
    pub active: Option<SwapRow>,
    /// Stations to borrow from, nearest first
    pub stations: Vec<StationRow>,
    pub show_history: bool,
    pub history: Vec<SwapRow>,
}

#[derive(Template)]
#[template(path = "my_swaps.html")]
pub struct MySwapsTemplate {
    pub sidebar: Sidebar,
    pub location: LocationView,
    pub flash: Option<Flash>,
    pub active: Option<SwapRow>,
    /// Where the active battery can be deposited
    pub deposit_stations: Vec<StationRow>,
    pub show_history: bool,
    pub history: Vec<SwapRow>,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub sidebar: Sidebar,
    pub flash: Option<Flash>,
    pub name: String,
    pub email: String,
    pub editing: bool,
}

// ============================================================================
// Navigation
// ============================================================================

/// Pages listed in the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPage {
    Home,
    Map,
    Booking,
    MyBookings,
    Swap,
    MySwaps,
    Profile,
}

impl NavPage {
    pub const ALL: [NavPage; 7] = [
        NavPage::Home,
        NavPage::Map,
        NavPage::Booking,
        NavPage::MyBookings,
        NavPage::Swap,
        NavPage::MySwaps,
        NavPage::Profile,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            NavPage::Home => "/home",
            NavPage::Map => "/map",
            NavPage::Booking => "/booking",
            NavPage::MyBookings => "/my-bookings",
            NavPage::Swap => "/swap",
            NavPage::MySwaps => "/my-swaps",
            NavPage::Profile => "/profile",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NavPage::Home => "Home",
            NavPage::Map => "Station Map",
            NavPage::Booking => "Book Slot",
            NavPage::MyBookings => "My Bookings",
            NavPage::Swap => "Swap Battery",
            NavPage::MySwaps => "My Swaps",
            NavPage::Profile => "Profile",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavItem {
    pub href: &'static str,
    pub label: &'static str,
    pub current: bool,
}

/// The sidebar, with the current page highlighted.
#[derive(Debug, Clone)]
pub struct Sidebar {
    pub items: Vec<NavItem>,
    pub user_name: String,
}

impl Sidebar {
    pub fn new(current: NavPage, user: &UserSummary) -> Self {
        let items = NavPage::ALL
            .iter()
            .map(|page| NavItem {
                href: page.path(),
                label: page.label(),
                current: *page == current,
            })
            .collect();
        Self {
            items,
            user_name: user.name.clone(),
        }
    }
}

// ============================================================================
// View Models
// ============================================================================

/// An inline message at the top of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Flash {
    pub text: String,
    pub is_error: bool,
}

impl Flash {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    /// The flash for a `?notice=` redirect, if any.
    pub fn from_query(query: &NoticeQuery) -> Option<Self> {
        let notice = query.notice()?;
        let mut text = notice.message().to_string();

        if notice == Notice::BookingCreated {
            let number = |v: &Option<String>| {
                v.as_deref()
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|n| n.is_finite())
            };
            if let Some(hours) = number(&query.hours) {
                text.push_str(&format!(" Duration: {hours:.2} hrs."));
            }
            if let Some(total) = number(&query.total) {
                text.push_str(&format!(" Estimated cost: ₹{total:.2}."));
            }
        }

        Some(Self {
            text,
            is_error: notice.is_warning(),
        })
    }
}

/// Geolocation state as a page shows it.
#[derive(Debug, Clone)]
pub struct LocationView {
    /// The page should ask the browser for a position
    pub pending: bool,
    pub unavailable: bool,
    pub timeout_ms: u64,
    /// Query string that reproduces this state, e.g. `lat=1&lng=2`
    pub query: String,
}

impl LocationView {
    pub fn new(state: LocationState, timeout: Duration) -> Self {
        let query = match &state {
            LocationState::Known(p) => format!("lat={}&lng={}", p.lat(), p.lng()),
            LocationState::Unavailable => "located=0".to_string(),
            LocationState::Pending => String::new(),
        };
        Self {
            pending: state == LocationState::Pending,
            unavailable: state == LocationState::Unavailable,
            timeout_ms: timeout.as_millis() as u64,
            query,
        }
    }

    /// `path` with this location's query appended.
    pub fn link(&self, path: &str) -> String {
        match (self.query.is_empty(), path.contains('?')) {
            (true, _) => path.to_string(),
            (false, true) => format!("{path}&{}", self.query),
            (false, false) => format!("{path}?{}", self.query),
        }
    }
}

/// A station in a list.
#[derive(Debug, Clone)]
pub struct StationRow {
    pub id: String,
    pub name: String,
    pub status: &'static str,
    pub status_class: &'static str,
    pub address: Option<String>,
    pub distance: Option<String>,
    pub price: Option<String>,
    pub charged: u32,
    pub charging: u32,
    pub total: u32,
    pub has_charged: bool,
}

impl StationRow {
    pub fn from_station(station: &Station) -> Self {
        Self {
            id: station.id.as_str().to_string(),
            name: station.name.clone(),
            status: station.status.label(),
            status_class: station_status_class(station.status),
            address: station.address.clone(),
            distance: None,
            price: station.price_per_kwh.map(|p| format!("₹{p:.2}/kWh")),
            charged: station.batteries.charged,
            charging: station.batteries.charging,
            total: station.batteries.total,
            has_charged: station.batteries.has_charged(),
        }
    }

    pub fn from_ranked(ranked: &RankedStation) -> Self {
        Self {
            distance: Some(format!("{:.2} km", ranked.distance_km)),
            ..Self::from_station(&ranked.station)
        }
    }

    pub fn booking_link(&self) -> String {
        format!("/booking?station={}", self.id)
    }
}

/// An entry in the booking form's station dropdown.
#[derive(Debug, Clone)]
pub struct StationOption {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

impl StationOption {
    pub fn new(station: &Station, selected: bool) -> Self {
        let price = station
            .price_per_kwh
            .map(|p| format!(" · ₹{p:.2}/kWh"))
            .unwrap_or_default();
        Self {
            id: station.id.as_str().to_string(),
            label: format!("{}{price} ({})", station.name, station.status.label()),
            selected,
        }
    }
}

/// A cost estimate, formatted.
#[derive(Debug, Clone)]
pub struct EstimateView {
    pub hours: String,
    pub energy: String,
    pub price: String,
    pub total: String,
}

impl EstimateView {
    pub fn new(estimate: &CostEstimate) -> Self {
        Self {
            hours: estimate.hours_display(),
            energy: format!("{:.2}", estimate.energy_kwh),
            price: format!("{:.2}", estimate.price_per_kwh),
            total: estimate.total_display(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingRow {
    pub id: String,
    pub station: String,
    pub start: String,
    pub end: String,
    pub hours: String,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl BookingRow {
    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            id: booking.id.as_str().to_string(),
            station: booking.station.display_name(UNKNOWN_STATION).to_string(),
            start: format_timestamp(&booking.start),
            end: format_timestamp(&booking.end),
            hours: format!("{:.2}", booking.duration_hours()),
            status: booking.status.label(),
            status_class: booking_status_class(booking.status),
        }
    }

    pub fn cancel_action(&self) -> String {
        format!("/my-bookings/{}/cancel", self.id)
    }
}

#[derive(Debug, Clone)]
pub struct SwapRow {
    pub id: String,
    pub source: String,
    pub destination: Option<String>,
    pub cost: String,
    pub swapped_at: String,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl SwapRow {
    pub fn from_swap(swap: &Swap) -> Self {
        Self {
            id: swap.id.as_str().to_string(),
            source: swap.source.display_name(UNKNOWN_STATION).to_string(),
            destination: swap
                .destination
                .as_ref()
                .map(|d| d.display_name(UNKNOWN_STATION).to_string()),
            cost: format!("{:.2}", swap.cost),
            swapped_at: swap
                .swapped_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
            status: swap.status.label(),
            status_class: swap_status_class(swap.status),
        }
    }
}

/// Everything `map.js` needs, serialized into the page.
#[derive(Debug, Clone)]
pub struct MapView {
    /// JSON, safe to embed in a `<script>` element
    pub data: String,
    pub placed: usize,
}

#[derive(Debug, Serialize)]
struct MapData<'a> {
    center: [f64; 2],
    zoom: u8,
    user: Option<[f64; 2]>,
    markers: Vec<MapMarker<'a>>,
}

#[derive(Debug, Serialize)]
struct MapMarker<'a> {
    name: &'a str,
    lat: f64,
    lng: f64,
    status: &'static str,
    color: &'static str,
    address: Option<&'a str>,
    price: Option<f64>,
    book_url: String,
}

impl MapView {
    /// Markers for every placeable station, centred on the user if known.
    pub fn new(stations: &[Station], user: Option<&GeoPoint>) -> Self {
        let markers: Vec<MapMarker<'_>> = stations
            .iter()
            .filter_map(|s| {
                let p = s.position?;
                Some(MapMarker {
                    name: &s.name,
                    lat: p.lat(),
                    lng: p.lng(),
                    status: s.status.label(),
                    color: marker_color(s.status),
                    address: s.address.as_deref(),
                    price: s.price_per_kwh,
                    book_url: format!("/booking?station={}", s.id),
                })
            })
            .collect();

        let (center, zoom) = match user {
            Some(p) => ([p.lat(), p.lng()], LOCATED_MAP_ZOOM),
            None => ([DEFAULT_MAP_CENTER.0, DEFAULT_MAP_CENTER.1], DEFAULT_MAP_ZOOM),
        };

        let placed = markers.len();
        let data = MapData {
            center,
            zoom,
            user: user.map(|p| [p.lat(), p.lng()]),
            markers,
        };

        Self {
            data: script_safe_json(&data),
            placed,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn station_status_class(status: StationStatus) -> &'static str {
    match status {
        StationStatus::Available => "available",
        StationStatus::Charging => "charging",
        StationStatus::Unavailable => "unavailable",
    }
}

fn marker_color(status: StationStatus) -> &'static str {
    match status {
        StationStatus::Available => "green",
        StationStatus::Charging => "yellow",
        StationStatus::Unavailable => "red",
    }
}

fn booking_status_class(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Confirmed => "confirmed",
        BookingStatus::Charging => "charging",
        BookingStatus::Completed => "completed",
        BookingStatus::Cancelled => "cancelled",
    }
}

fn swap_status_class(status: SwapStatus) -> &'static str {
    match status {
        SwapStatus::Active => "active",
        SwapStatus::Completed => "completed",
        SwapStatus::Cancelled => "cancelled",
    }
}

/// Format a timestamp in local time for display.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%d %b %Y, %H:%M")
        .to_string()
}

/// Serialize for embedding inside `<script>`: no `<`, `>` or `&` survive.
fn script_safe_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
