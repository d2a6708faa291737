//! Validation for caller-supplied query parameters.
//!
//! Everything here produces `GeoQueryError::Validation`, which the facade
//! returns before touching either store.

use crate::compute::distance::{EARTH_RADIUS_KM, ensure_no_wrap};
use crate::error::{GeoQueryError, Result};
use crate::query::PropertyFilters;
use geoquery_types::{GeoBounds, GeoPoint};
use std::f64::consts::PI;

/// Highest zoom level accepted by cluster queries.
pub const MAX_ZOOM: u8 = 24;

/// Build a `GeoPoint` from raw latitude/longitude, mapping range errors to
/// validation errors.
///
/// # Examples
///
/// ```
/// use geoquery::compute::validation::validate_lat_lng;
///
/// assert!(validate_lat_lng(55.7558, 37.6176).is_ok());
/// assert!(validate_lat_lng(95.0, 37.6176).is_err());
/// assert!(validate_lat_lng(55.7558, f64::NAN).is_err());
/// ```
pub fn validate_lat_lng(lat: f64, lng: f64) -> Result<GeoPoint> {
    Ok(GeoPoint::new(lat, lng)?)
}

/// Radius must be finite, positive and no larger than half the circumference.
pub fn validate_radius_km(radius_km: f64) -> Result<()> {
    if !radius_km.is_finite() {
        return Err(GeoQueryError::Validation(format!(
            "Radius must be finite, got: {}",
            radius_km
        )));
    }

    if radius_km <= 0.0 {
        return Err(GeoQueryError::Validation(format!(
            "Radius must be positive, got: {}",
            radius_km
        )));
    }

    let max = PI * EARTH_RADIUS_KM;
    if radius_km > max {
        return Err(GeoQueryError::Validation(format!(
            "Radius {} km exceeds half the Earth's circumference ({:.1} km)",
            radius_km, max
        )));
    }

    Ok(())
}

/// Bounds must not wrap the antimeridian.
pub fn validate_bounds(bounds: &GeoBounds) -> Result<()> {
    ensure_no_wrap(bounds)
}

pub fn validate_zoom(zoom: u8) -> Result<()> {
    if zoom > MAX_ZOOM {
        return Err(GeoQueryError::Validation(format!(
            "Zoom out of range [0, {}]: {}",
            MAX_ZOOM, zoom
        )));
    }
    Ok(())
}

/// Price bounds must be finite and ordered.
pub fn validate_filters(filters: &PropertyFilters) -> Result<()> {
    for (name, value) in [("min_price", filters.min_price), ("max_price", filters.max_price)] {
        if let Some(v) = value
            && !v.is_finite()
        {
            return Err(GeoQueryError::Validation(format!(
                "{} must be finite, got: {}",
                name, v
            )));
        }
    }

    if let (Some(min), Some(max)) = (filters.min_price, filters.max_price)
        && min > max
    {
        return Err(GeoQueryError::Validation(format!(
            "min_price ({}) must be <= max_price ({})",
            min, max
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_lat_lng() {
        assert!(validate_lat_lng(55.7558, 37.6176).is_ok());
        assert!(validate_lat_lng(-33.8688, 151.2093).is_ok());

        // Edge cases
        assert!(validate_lat_lng(90.0, 180.0).is_ok());
        assert!(validate_lat_lng(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_invalid_lat_lng() {
        assert!(validate_lat_lng(90.1, 0.0).is_err());
        assert!(validate_lat_lng(0.0, 180.1).is_err());
        assert!(validate_lat_lng(f64::NAN, 0.0).is_err());
        assert!(validate_lat_lng(0.0, f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_radius() {
        assert!(validate_radius_km(5.0).is_ok());
        assert!(validate_radius_km(0.001).is_ok());
        assert!(validate_radius_km(0.0).is_err());
        assert!(validate_radius_km(-1.0).is_err());
        assert!(validate_radius_km(f64::NAN).is_err());
        assert!(validate_radius_km(f64::INFINITY).is_err());
        assert!(validate_radius_km(25_000.0).is_err());
    }

    #[test]
    fn test_zoom() {
        assert!(validate_zoom(0).is_ok());
        assert!(validate_zoom(16).is_ok());
        assert!(validate_zoom(MAX_ZOOM).is_ok());
        assert!(validate_zoom(MAX_ZOOM + 1).is_err());
    }

    #[test]
    fn test_filters() {
        assert!(validate_filters(&PropertyFilters::default()).is_ok());
        assert!(validate_filters(&PropertyFilters::new().with_price_range(Some(1.0), Some(2.0))).is_ok());
        assert!(validate_filters(&PropertyFilters::new().with_price_range(Some(3.0), Some(2.0))).is_err());
        assert!(validate_filters(&PropertyFilters::new().with_price_range(Some(f64::NAN), None)).is_err());
    }

    #[test]
    fn test_bounds() {
        let ok = GeoBounds::new(1.0, 0.0, 1.0, 0.0).unwrap();
        assert!(validate_bounds(&ok).is_ok());
        let wrap = GeoBounds::new(1.0, 0.0, -179.0, 179.0).unwrap();
        assert!(validate_bounds(&wrap).is_err());
    }
}
