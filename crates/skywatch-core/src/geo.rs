//! Spatial math for distance, bearing and path projection.

use crate::error::CoreError;
use crate::models::AircraftState;

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Reject NaN, infinite and out-of-range coordinates.
pub fn validate_coords(lat: f64, lon: f64) -> Result<(), CoreError> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(CoreError::NonFiniteCoordinate);
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(CoreError::LatitudeOutOfRange(lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(CoreError::LongitudeOutOfRange(lon));
    }
    Ok(())
}

/// Great-circle distance between two points in nautical miles (haversine).
pub fn distance_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Bearing from point 1 to point 2 in radians, 0 = north, π/2 = east.
///
/// Identical points yield 0 rather than NaN.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_nm` - Distance in nautical miles
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_nm: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_nm.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_nm / EARTH_RADIUS_NM;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Project the flight path of an aircraft `steps` points forward,
/// extrapolating linearly along the current heading at the current speed.
///
/// Each step advances `step_secs` seconds of flight. Returns exactly
/// `steps` (lon, lat) points; a stationary aircraft projects onto its
/// current position.
pub fn project_path(state: &AircraftState, steps: usize, step_secs: f64) -> Vec<(f64, f64)> {
    let heading_rad = state.heading_deg.to_radians();
    let nm_per_step = state.speed_kt.max(0.0) * step_secs.max(0.0) / 3600.0;

    let mut points = Vec::with_capacity(steps);
    let (mut lat, mut lon) = (state.lat, state.lon);
    for _ in 0..steps {
        let next = offset_by_bearing(lat, lon, nm_per_step, heading_rad);
        lat = next.0;
        lon = next.1;
        points.push((lon, lat));
    }
    points
}
