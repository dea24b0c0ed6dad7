//! Fix-to-fix distance and uncertainty estimation.
//!
//! Pure functions; the engine decides which pairs of fixes they are applied to.

use crate::geo_utils::haversine_distance;
use crate::{FixSample, OdometerError, Result};

/// Great-circle distance in meters between two fixes.
///
/// Fails with [`OdometerError::InvalidCoordinate`] if either fix is out of range.
///
/// # Example
/// ```
/// use tripmeter::{FixSample, distance_between};
///
/// let a = FixSample::new(0.0, 0.0, 5.0, 0);
/// let b = FixSample::new(0.0, 0.001, 5.0, 10_000);
/// let d = distance_between(&a, &b).unwrap();
/// assert!((d - 111.19).abs() < 0.01);
/// ```
pub fn distance_between(a: &FixSample, b: &FixSample) -> Result<f64> {
    for fix in [a, b] {
        if !fix.is_valid() {
            return Err(OdometerError::InvalidCoordinate {
                latitude: fix.latitude,
                longitude: fix.longitude,
            });
        }
    }
    Ok(haversine_distance(
        a.latitude,
        a.longitude,
        b.latitude,
        b.longitude,
    ))
}

/// Combined uncertainty of a fix-to-fix distance: `sqrt(acc_a² + acc_b²)`.
///
/// Treats the two accuracy radii as independent bounds and keeps the
/// conservative upper estimate. Both fixes must have known accuracy.
pub fn propagated_error(a: &FixSample, b: &FixSample) -> f64 {
    a.horizontal_accuracy.hypot(b.horizontal_accuracy)
}

/// Speed in m/s implied by covering `distance` between the two fix timestamps.
///
/// Returns `f64::INFINITY` when `b` is not later than `a`.
pub fn implied_speed(a: &FixSample, b: &FixSample, distance: f64) -> f64 {
    let dt_ms = b.timestamp_ms.saturating_sub(a.timestamp_ms);
    if dt_ms <= 0 {
        return f64::INFINITY;
    }
    distance / (dt_ms as f64 / 1000.0)
}
