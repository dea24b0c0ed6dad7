//! Geographic utilities: great-circle distance, coordinate validity, and
//! small metric offsets around a reference point.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude (approximately constant).
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Check that a latitude/longitude pair is finite and within range.
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Haversine distance in meters between two coordinates.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    // Clamp guards against rounding pushing `a` just past 1.0 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

/// Convert a distance in meters to degrees of longitude at a latitude.
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let meters_per_deg_lng = METERS_PER_DEG_LAT * latitude.to_radians().cos();
    if meters_per_deg_lng.abs() < 1e-10 {
        return 0.0;
    }
    meters / meters_per_deg_lng
}

/// Move a coordinate by `north` and `east` meters (flat-earth approximation,
/// fine for offsets of a few kilometres).
pub fn offset_coordinate(latitude: f64, longitude: f64, north: f64, east: f64) -> (f64, f64) {
    let new_lat = latitude + north / METERS_PER_DEG_LAT;
    let new_lng = longitude + meters_to_degrees(east, latitude);
    (new_lat, new_lng)
}
