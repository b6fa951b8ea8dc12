/// A geodetic look-at point in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude: wrap_longitude(longitude),
        }
    }
}

/// Wraps a longitude into [-180, 180).
pub fn wrap_longitude(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Signed shortest angular difference `to - from` in degrees, in [-180, 180).
pub fn shortest_longitude_delta(from_deg: f64, to_deg: f64) -> f64 {
    wrap_longitude(to_deg - from_deg)
}
