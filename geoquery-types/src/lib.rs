//! # geoquery-types
//!
//! Validated geographic value types shared by the geoquery service.
//!
//! - **[`GeoPoint`]**: a latitude/longitude pair that is always in range
//! - **[`GeoBounds`]**: a north/south/east/west envelope with `south <= north`
//!
//! Both types validate on construction and on deserialization, so a value of
//! either type is always usable without re-checking.
//!
//! ## Examples
//!
//! ```rust
//! use geoquery_types::{GeoBounds, GeoPoint};
//!
//! let kremlin = GeoPoint::new(55.7520, 37.6175).unwrap();
//! let moscow = GeoBounds::new(55.95, 55.55, 37.95, 37.30).unwrap();
//! assert!(moscow.south() <= kremlin.lat() && kremlin.lat() <= moscow.north());
//! ```

pub mod bounds;
pub mod point;

pub use bounds::GeoBounds;
pub use point::GeoPoint;

use thiserror::Error;

/// Reasons a coordinate or envelope is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("{field} must be finite, got: {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("latitude out of range [-90.0, 90.0]: {0}")]
    LatitudeOutOfRange(f64),

    #[error("longitude out of range [-180.0, 180.0]: {0}")]
    LongitudeOutOfRange(f64),

    #[error("south ({south}) must be <= north ({north})")]
    InvertedBounds { south: f64, north: f64 },
}

pub(crate) fn check_lat(field: &'static str, value: f64) -> Result<f64, CoordinateError> {
    if !value.is_finite() {
        return Err(CoordinateError::NonFinite { field, value });
    }
    if !(-90.0..=90.0).contains(&value) {
        return Err(CoordinateError::LatitudeOutOfRange(value));
    }
    Ok(value)
}

pub(crate) fn check_lng(field: &'static str, value: f64) -> Result<f64, CoordinateError> {
    if !value.is_finite() {
        return Err(CoordinateError::NonFinite { field, value });
    }
    if !(-180.0..=180.0).contains(&value) {
        return Err(CoordinateError::LongitudeOutOfRange(value));
    }
    Ok(value)
}
