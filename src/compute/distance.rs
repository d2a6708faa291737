//! Great-circle distance and envelope math.

use crate::error::{GeoQueryError, Result};
use geoquery_types::{GeoBounds, GeoPoint};
use std::f64::consts::PI;

/// Earth radius used for every distance in this crate.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// Slack added to prefilter envelopes so floating-point noise in the envelope
// math can never exclude a point the exact distance check would accept.
const ENVELOPE_SLACK_DEG: f64 = 1e-7;

/// Haversine distance between two points, in kilometres.
///
/// # Examples
///
/// ```rust
/// use geoquery::GeoPoint;
/// use geoquery::compute::haversine_km;
///
/// let moscow = GeoPoint::new(55.7558, 37.6176).unwrap();
/// let spb = GeoPoint::new(59.9343, 30.3351).unwrap();
/// let d = haversine_km(&moscow, &spb);
/// assert!(d > 630.0 && d < 640.0);
/// ```
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let dlat = (b.lat() - a.lat()).to_radians();
    let dlng = (b.lng() - a.lng()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Inclusive containment test; a point on any edge is inside.
///
/// Only meaningful for non-wrapping bounds; callers reject antimeridian
/// envelopes with [`ensure_no_wrap`] first.
pub fn point_in_bounds(point: &GeoPoint, bounds: &GeoBounds) -> bool {
    point.lat() >= bounds.south()
        && point.lat() <= bounds.north()
        && point.lng() >= bounds.west()
        && point.lng() <= bounds.east()
}

/// Reject envelopes that cross the antimeridian.
pub fn ensure_no_wrap(bounds: &GeoBounds) -> Result<()> {
    if bounds.crosses_antimeridian() {
        log::warn!(
            "Rejecting bounds crossing the antimeridian (west {} > east {})",
            bounds.west(),
            bounds.east()
        );
        return Err(GeoQueryError::Validation(format!(
            "bounds crossing the antimeridian are not supported (west {} > east {})",
            bounds.west(),
            bounds.east()
        )));
    }
    Ok(())
}

/// A plain lat/lng rectangle used for index prefiltering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl Envelope {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat() >= self.south
            && point.lat() <= self.north
            && point.lng() >= self.west
            && point.lng() <= self.east
    }
}

/// Smallest lat/lng rectangle guaranteed to contain every point within
/// `radius_km` of `center`.
///
/// The longitude half-width is `asin(sin(d) / cos(lat))` for angular radius
/// `d`. When the circle reaches a pole or wraps across 180° the envelope
/// widens to the full longitude range instead of wrapping.
pub fn radius_envelope(center: &GeoPoint, radius_km: f64) -> Envelope {
    let angular = radius_km / EARTH_RADIUS_KM;
    if angular >= PI {
        return Envelope {
            south: -90.0,
            north: 90.0,
            west: -180.0,
            east: 180.0,
        };
    }

    let dlat = angular.to_degrees() + ENVELOPE_SLACK_DEG;
    let south = center.lat() - dlat;
    let north = center.lat() + dlat;

    if south <= -90.0 || north >= 90.0 {
        return Envelope {
            south: south.max(-90.0),
            north: north.min(90.0),
            west: -180.0,
            east: 180.0,
        };
    }

    let ratio = angular.sin() / center.lat().to_radians().cos();
    if ratio >= 1.0 {
        return Envelope {
            south,
            north,
            west: -180.0,
            east: 180.0,
        };
    }

    let dlng = ratio.asin().to_degrees() + ENVELOPE_SLACK_DEG;
    let west = center.lng() - dlng;
    let east = center.lng() + dlng;
    if west < -180.0 || east > 180.0 {
        return Envelope {
            south,
            north,
            west: -180.0,
            east: 180.0,
        };
    }

    Envelope {
        south,
        north,
        west,
        east,
    }
}
