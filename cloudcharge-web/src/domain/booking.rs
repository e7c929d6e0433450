//! Charging slot bookings.

use std::fmt;

use chrono::{DateTime, Utc};

use super::station::{Station, StationId, StationRef};

/// Backend identifier of a booking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookingId(String);

impl BookingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Booking status. Transitions are owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Confirmed,
    Charging,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Parse the backend's status string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Some(BookingStatus::Confirmed),
            "charging" => Some(BookingStatus::Charging),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" | "canceled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Charging => "Charging",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    /// Confirmed and charging bookings are still "live".
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Charging)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A reserved charging interval at a station.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: BookingId,
    pub station: StationRef,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
}

impl Booking {
    /// Booked duration in hours.
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }
}

/// Bookings split the way the "My Bookings" page shows them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingBoard {
    /// Confirmed or charging.
    pub active: Vec<Booking>,
    pub completed: Vec<Booking>,
    pub cancelled: Vec<Booking>,
}

impl BookingBoard {
    /// Partition bookings by status, preserving backend order within each group.
    pub fn from_bookings(bookings: impl IntoIterator<Item = Booking>) -> Self {
        let mut board = BookingBoard::default();
        for booking in bookings {
            match booking.status {
                BookingStatus::Confirmed | BookingStatus::Charging => board.active.push(booking),
                BookingStatus::Completed => board.completed.push(booking),
                BookingStatus::Cancelled => board.cancelled.push(booking),
            }
        }
        board
    }

    /// Everything that is no longer active.
    pub fn history(&self) -> impl Iterator<Item = &Booking> {
        self.completed.iter().chain(self.cancelled.iter())
    }

    pub fn is_active(&self, id: &BookingId) -> bool {
        self.active.iter().any(|b| &b.id == id)
    }
}

/// Why a booking form was rejected before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingRejection {
    #[error("Please select station and time range.")]
    Incomplete,

    #[error("Invalid station selected.")]
    UnknownStation,

    #[error("End time must be after start time.")]
    NonPositiveDuration,
}

/// What the user has filled in on the booking form so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub station: Option<StationId>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// A draft that passed validation against the known stations.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidBooking<'a> {
    pub station: &'a Station,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ValidBooking<'_> {
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }
}

impl BookingDraft {
    /// The selected station, if it is one of `stations`.
    pub fn selected_station<'a>(&self, stations: &'a [Station]) -> Option<&'a Station> {
        let id = self.station.as_ref()?;
        stations.iter().find(|s| &s.id == id)
    }

    /// Check the draft before submission.
    ///
    /// Checks run in the order the form reports them: missing fields, then an
    /// unknown station, then a non-positive interval.
    pub fn validate<'a>(&self, stations: &'a [Station]) -> Result<ValidBooking<'a>, BookingRejection> {
        let (Some(_), Some(start), Some(end)) = (&self.station, self.start, self.end) else {
            return Err(BookingRejection::Incomplete);
        };

        let station = self
            .selected_station(stations)
            .ok_or(BookingRejection::UnknownStation)?;

        if end <= start {
            return Err(BookingRejection::NonPositiveDuration);
        }

        Ok(ValidBooking { station, start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StationStatus;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, 0).unwrap()
    }

    fn booking(id: &str, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(id),
            station: StationRef::new(StationId::new("st-1"), Some("Indiranagar".into())),
            start: at(10, 0),
            end: at(11, 30),
            status,
        }
    }

    fn stations() -> Vec<Station> {
        vec![
            Station::new(StationId::new("st-1"), "Indiranagar", StationStatus::Available),
            Station::new(StationId::new("st-2"), "Whitefield", StationStatus::Charging),
        ]
    }

    #[test]
    fn status_parse() {
        assert_eq!(BookingStatus::parse("Confirmed"), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse("canceled"), Some(BookingStatus::Cancelled));
        assert_eq!(BookingStatus::parse("Pending"), None);
    }

    #[test]
    fn duration_hours() {
        assert_eq!(booking("b", BookingStatus::Confirmed).duration_hours(), 1.5);
    }

    #[test]
    fn board_partitions_by_status() {
        let board = BookingBoard::from_bookings(vec![
            booking("a", BookingStatus::Confirmed),
            booking("b", BookingStatus::Completed),
            booking("c", BookingStatus::Charging),
            booking("d", BookingStatus::Cancelled),
        ]);

        let ids = |v: &[Booking]| v.iter().map(|b| b.id.as_str().to_string()).collect::<Vec<_>>();
        assert_eq!(ids(&board.active), ["a", "c"]);
        assert_eq!(ids(&board.completed), ["b"]);
        assert_eq!(ids(&board.cancelled), ["d"]);
        assert_eq!(board.history().count(), 2);
    }

    #[test]
    fn cancelled_booking_moves_to_history_on_refresh() {
        let before = BookingBoard::from_bookings(vec![booking("a", BookingStatus::Confirmed)]);
        assert!(before.is_active(&BookingId::new("a")));

        // What the backend returns after DELETE /api/bookings/a
        let after = BookingBoard::from_bookings(vec![booking("a", BookingStatus::Cancelled)]);
        assert!(!after.is_active(&BookingId::new("a")));
        assert!(after.history().any(|b| b.id.as_str() == "a"));
    }

    #[test]
    fn draft_incomplete() {
        let draft = BookingDraft {
            station: Some(StationId::new("st-1")),
            start: Some(at(10, 0)),
            end: None,
        };
        assert_eq!(draft.validate(&stations()), Err(BookingRejection::Incomplete));
        assert_eq!(
            BookingDraft::default().validate(&stations()),
            Err(BookingRejection::Incomplete)
        );
    }

    #[test]
    fn draft_unknown_station() {
        let draft = BookingDraft {
            station: Some(StationId::new("nope")),
            start: Some(at(10, 0)),
            end: Some(at(11, 0)),
        };
        assert_eq!(draft.validate(&stations()), Err(BookingRejection::UnknownStation));
    }

    #[test]
    fn draft_non_positive_duration() {
        let stations = stations();
        let same = BookingDraft {
            station: Some(StationId::new("st-2")),
            start: Some(at(10, 0)),
            end: Some(at(10, 0)),
        };
        assert_eq!(same.validate(&stations), Err(BookingRejection::NonPositiveDuration));

        let backwards = BookingDraft {
            end: Some(at(9, 0)),
            ..same
        };
        assert_eq!(
            backwards.validate(&stations),
            Err(BookingRejection::NonPositiveDuration)
        );
    }

    #[test]
    fn draft_valid() {
        let stations = stations();
        let draft = BookingDraft {
            station: Some(StationId::new("st-2")),
            start: Some(at(10, 0)),
            end: Some(at(11, 30)),
        };
        let valid = draft.validate(&stations).unwrap();
        assert_eq!(valid.station.name, "Whitefield");
        assert_eq!(valid.duration_hours(), 1.5);
    }

    #[test]
    fn rejection_messages() {
        assert_eq!(
            BookingRejection::Incomplete.to_string(),
            "Please select station and time range."
        );
        assert_eq!(
            BookingRejection::NonPositiveDuration.to_string(),
            "End time must be after start time."
        );
    }
}
