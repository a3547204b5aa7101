//! Great-circle distance between two coordinates.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Degrees north (negative = south).
    pub latitude: f64,
    /// Degrees east (negative = west).
    pub longitude: f64,
}

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Haversine great-circle distance in kilometres, rounded to two decimals
/// (display precision of the demo).
pub fn distance_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let distance = 2.0 * EARTH_RADIUS_KM * h.sqrt().asin();

    (distance * 100.0).round() / 100.0
}
