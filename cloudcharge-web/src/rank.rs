//! Nearest-station ranking.
//!
//! Every page that lists stations "nearest first" goes through
//! [`nearest_stations`]. Stations whose coordinates could not be resolved
//! are dropped, and an unknown user position yields
//! [`NearestStations::AwaitingLocation`] instead of a made-up order.

use crate::domain::{GeoPoint, Station};

/// A station annotated with its distance from the user.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedStation {
    pub station: Station,
    pub distance_km: f64,
}

/// Result of ranking stations against a possibly-unknown position.
#[derive(Debug, Clone, PartialEq)]
pub enum NearestStations {
    /// No position yet (pending, denied or timed out). Nothing is ranked.
    AwaitingLocation,
    /// Stations with known coordinates, nearest first.
    Ranked(Vec<RankedStation>),
}

impl NearestStations {
    pub fn is_awaiting_location(&self) -> bool {
        matches!(self, NearestStations::AwaitingLocation)
    }

    /// Ranked stations, or an empty slice while awaiting location.
    pub fn ranked(&self) -> &[RankedStation] {
        match self {
            NearestStations::Ranked(ranked) => ranked,
            NearestStations::AwaitingLocation => &[],
        }
    }

    pub fn into_ranked(self) -> Vec<RankedStation> {
        match self {
            NearestStations::Ranked(ranked) => ranked,
            NearestStations::AwaitingLocation => Vec::new(),
        }
    }
}

/// Rank `stations` by great-circle distance from `origin`.
///
/// Stations without a resolved position are silently left out. The sort is
/// stable, so stations at the same distance keep their backend order.
pub fn rank_by_distance(origin: &GeoPoint, stations: &[Station]) -> Vec<RankedStation> {
    let mut ranked: Vec<RankedStation> = stations
        .iter()
        .filter_map(|station| {
            let position = station.position?;
            Some(RankedStation {
                station: station.clone(),
                distance_km: origin.distance_km(&position),
            })
        })
        .collect();

    // Distances are finite: GeoPoint rejects non-finite coordinates
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    ranked
}

/// Rank stations if the user's position is known.
pub fn nearest_stations(origin: Option<&GeoPoint>, stations: &[Station]) -> NearestStations {
    match origin {
        Some(origin) => NearestStations::Ranked(rank_by_distance(origin, stations)),
        None => NearestStations::AwaitingLocation,
    }
}
