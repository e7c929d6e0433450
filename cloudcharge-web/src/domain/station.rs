//! Charging/swap station types.

use std::fmt;

use super::geo::GeoPoint;

/// Backend identifier of a station.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StationId(String);

impl StationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operating status reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationStatus {
    Available,
    Charging,
    /// Offline, under maintenance, or any status the client doesn't recognise.
    Unavailable,
}

impl StationStatus {
    /// Parse the backend's status string.
    ///
    /// Matching is case-insensitive. Anything other than "available" or
    /// "charging" is treated as unavailable, which is also how the map and
    /// list colour unknown statuses.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => StationStatus::Available,
            "charging" => StationStatus::Charging,
            _ => StationStatus::Unavailable,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StationStatus::Available => "Available",
            StationStatus::Charging => "Charging",
            StationStatus::Unavailable => "Unavailable",
        }
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Battery-swap counters for a station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapInventory {
    pub charged: u32,
    pub charging: u32,
    pub total: u32,
}

impl SwapInventory {
    /// Whether a charged battery can be borrowed here.
    pub fn has_charged(&self) -> bool {
        self.charged > 0
    }
}

/// A station as the client sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    /// `None` when the backend record has missing or malformed coordinates.
    pub position: Option<GeoPoint>,
    pub address: Option<String>,
    pub status: StationStatus,
    /// Energy price per kWh, if the station publishes one.
    pub price_per_kwh: Option<f64>,
    pub batteries: SwapInventory,
}

impl Station {
    /// Create a station with no position, price or batteries.
    pub fn new(id: StationId, name: impl Into<String>, status: StationStatus) -> Self {
        Self {
            id,
            name: name.into(),
            position: None,
            address: None,
            status,
            price_per_kwh: None,
            batteries: SwapInventory::default(),
        }
    }

    pub fn with_position(mut self, position: GeoPoint) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_price(mut self, price_per_kwh: f64) -> Self {
        self.price_per_kwh = Some(price_per_kwh);
        self
    }

    pub fn with_batteries(mut self, batteries: SwapInventory) -> Self {
        self.batteries = batteries;
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// A reference to a station held by a booking or swap.
///
/// The backend sometimes populates the referenced station and sometimes
/// returns only its id, so the name is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRef {
    pub id: StationId,
    pub name: Option<String>,
}

impl StationRef {
    pub fn new(id: StationId, name: Option<String>) -> Self {
        Self { id, name }
    }

    /// The name to show, falling back to the given placeholder.
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }
}
