//! Conversion from wire DTOs to domain types.
//!
//! Records that can't be represented (unknown booking/swap status) are
//! dropped with a warning instead of failing the whole response. Stations
//! are always kept; an unusable position just becomes `None`.

use tracing::warn;

use crate::domain::{
    Booking, BookingId, BookingStatus, GeoPoint, Station, StationId, StationRef, StationStatus,
    Swap, SwapId, SwapInventory, SwapStatus, UserId, UserSummary,
};

use super::types::{BookingDto, LocationDto, StationDto, StationRefDto, SwapDto, UserDto};

/// Read a number, accepting numeric strings.
fn number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// A battery counter. Negative or unreadable counts are zero, fractions truncate.
fn count(value: Option<&serde_json::Value>) -> u32 {
    value
        .and_then(number)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u32)
        .unwrap_or(0)
}

/// Resolve a station's position.
///
/// GeoJSON `location.coordinates` (`[lng, lat]`) wins; flat
/// `latitude`/`longitude` are the fallback.
fn resolve_position(
    location: Option<&LocationDto>,
    lat: Option<&serde_json::Value>,
    lng: Option<&serde_json::Value>,
) -> Option<GeoPoint> {
    let from_geojson = location
        .and_then(|l| l.coordinates.as_deref())
        .filter(|c| c.len() >= 2)
        .and_then(|c| {
            let lng = number(&c[0])?;
            let lat = number(&c[1])?;
            GeoPoint::from_geojson(lng, lat).ok()
        });

    from_geojson.or_else(|| GeoPoint::new(number(lat?)?, number(lng?)?).ok())
}

pub fn station_from_dto(dto: StationDto) -> Station {
    let position = resolve_position(
        dto.location.as_ref(),
        dto.latitude.as_ref(),
        dto.longitude.as_ref(),
    );
    let address = dto
        .location
        .and_then(|l| l.address)
        .filter(|a| !a.trim().is_empty());

    Station {
        id: StationId::new(dto.id),
        name: dto.name.unwrap_or_default(),
        position,
        address,
        status: dto
            .status
            .as_deref()
            .map(StationStatus::parse)
            .unwrap_or(StationStatus::Unavailable),
        price_per_kwh: dto.price_per_kwh.as_ref().and_then(number),
        batteries: SwapInventory {
            charged: count(dto.charged_batteries.as_ref()),
            charging: count(dto.charging_batteries.as_ref()),
            total: count(dto.total_batteries.as_ref()),
        },
    }
}

/// Convert a raw station list record by record.
///
/// A record that isn't a station at all (no `_id`) is dropped with a
/// warning; the rest of the list is kept.
pub fn stations_from_values(values: Vec<serde_json::Value>) -> Vec<Station> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<StationDto>(value) {
            Ok(dto) => Some(station_from_dto(dto)),
            Err(e) => {
                warn!(error = %e, "dropping unreadable station record");
                None
            }
        })
        .collect()
}

fn station_ref(dto: StationRefDto, fallback_name: Option<String>) -> StationRef {
    match dto {
        StationRefDto::Id(id) => StationRef::new(StationId::new(id), fallback_name),
        StationRefDto::Populated { id, name } => {
            StationRef::new(StationId::new(id), name.or(fallback_name))
        }
    }
}

pub fn booking_from_dto(dto: BookingDto) -> Option<Booking> {
    let Some(status) = BookingStatus::parse(&dto.status) else {
        warn!(booking = %dto.id, status = %dto.status, "dropping booking with unknown status");
        return None;
    };

    let station = match dto.station {
        Some(r) => station_ref(r, dto.station_name),
        None => StationRef::new(StationId::new(""), dto.station_name),
    };

    Some(Booking {
        id: BookingId::new(dto.id),
        station,
        start: dto.start_time,
        end: dto.end_time,
        status,
    })
}

pub fn bookings_from_dtos(dtos: Vec<BookingDto>) -> Vec<Booking> {
    dtos.into_iter().filter_map(booking_from_dto).collect()
}

pub fn swap_from_dto(dto: SwapDto) -> Option<Swap> {
    let Some(status) = SwapStatus::parse(&dto.status) else {
        warn!(swap = %dto.id, status = %dto.status, "dropping swap with unknown status");
        return None;
    };

    let source = match dto.source_station {
        Some(r) => station_ref(r, None),
        None => StationRef::new(StationId::new(""), None),
    };

    Some(Swap {
        id: SwapId::new(dto.id),
        source,
        destination: dto.destination_station.map(|r| station_ref(r, None)),
        cost: dto.swap_cost.filter(|c| c.is_finite()).unwrap_or(0.0),
        swapped_at: dto.swapped_at.or(dto.time),
        status,
    })
}

pub fn swaps_from_dtos(dtos: Vec<SwapDto>) -> Vec<Swap> {
    dtos.into_iter().filter_map(swap_from_dto).collect()
}

pub fn user_from_dto(dto: UserDto) -> UserSummary {
    UserSummary {
        id: UserId::new(dto.id),
        name: dto.name,
        email: dto.email,
    }
}
