//! Geographic points and great-circle distance.

use std::fmt;

/// Earth's mean radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Error returned when a latitude/longitude pair is not a usable position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid position: {reason}")]
pub struct InvalidGeoPoint {
    reason: &'static str,
}

/// A WGS84 latitude/longitude pair in degrees.
///
/// Construction rejects non-finite values and anything outside
/// `[-90, 90]` / `[-180, 180]`, so a `GeoPoint` is always safe to feed
/// into [`haversine_km`].
///
/// # Examples
///
/// ```
/// use cloudcharge_web::domain::GeoPoint;
///
/// let delhi = GeoPoint::new(28.6139, 77.2090).unwrap();
/// assert_eq!(delhi.lat(), 28.6139);
///
/// assert!(GeoPoint::new(91.0, 0.0).is_err());
/// assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude in degrees.
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidGeoPoint> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(InvalidGeoPoint {
                reason: "coordinates must be finite numbers",
            });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidGeoPoint {
                reason: "latitude must be within [-90, 90]",
            });
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(InvalidGeoPoint {
                reason: "longitude must be within [-180, 180]",
            });
        }
        Ok(Self { lat, lng })
    }

    /// Create a point from a GeoJSON position, which is `[lng, lat]`.
    pub fn from_geojson(lng: f64, lat: f64) -> Result<Self, InvalidGeoPoint> {
        Self::new(lat, lng)
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Great-circle distance to another point in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self, other)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// Haversine great-circle distance between two points, in kilometres.
///
/// Uses a spherical Earth of radius [`EARTH_RADIUS_KM`]. That is well inside
/// the precision needed to decide which charging station is nearest.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    let h = h.clamp(0.0, 1.0);

    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}
