use crate::{CoordinateError, GeoPoint, check_lat, check_lng};
use geo::Rect;
use serde::{Deserialize, Serialize};

/// A latitude/longitude envelope.
///
/// `south <= north` always holds. `west > east` is representable and means the
/// envelope crosses the antimeridian; such envelopes are not supported by the
/// query layer and are rejected there rather than silently mis-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct GeoBounds {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

#[derive(Deserialize)]
struct RawBounds {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

impl TryFrom<RawBounds> for GeoBounds {
    type Error = CoordinateError;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        GeoBounds::new(raw.north, raw.south, raw.east, raw.west)
    }
}

impl GeoBounds {
    /// Create an envelope from its four edges.
    ///
    /// # Examples
    ///
    /// ```
    /// use geoquery_types::GeoBounds;
    ///
    /// let bounds = GeoBounds::new(55.9, 55.6, 37.8, 37.4).unwrap();
    /// assert_eq!(bounds.west(), 37.4);
    ///
    /// // south above north
    /// assert!(GeoBounds::new(55.6, 55.9, 37.8, 37.4).is_err());
    /// ```
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, CoordinateError> {
        let north = check_lat("north", north)?;
        let south = check_lat("south", south)?;
        let east = check_lng("east", east)?;
        let west = check_lng("west", west)?;

        if south > north {
            return Err(CoordinateError::InvertedBounds { south, north });
        }

        Ok(Self {
            north,
            south,
            east,
            west,
        })
    }

    /// Envelope spanning two corner points, in any order.
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            north: a.lat().max(b.lat()),
            south: a.lat().min(b.lat()),
            east: a.lng().max(b.lng()),
            west: a.lng().min(b.lng()),
        }
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    /// True when `west > east`, i.e. the envelope wraps across 180°.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Midpoint of the envelope (non-wrapping interpretation).
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.south + self.north) / 2.0,
            lng: (self.west + self.east) / 2.0,
        }
    }

    /// Convert to a `geo::Rect` (x = longitude, y = latitude).
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            geo::coord! { x: self.west, y: self.south },
            geo::coord! { x: self.east, y: self.north },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bounds() {
        let b = GeoBounds::new(55.9, 55.6, 37.8, 37.4).unwrap();
        assert_eq!(b.north(), 55.9);
        assert_eq!(b.south(), 55.6);
        assert_eq!(b.east(), 37.8);
        assert_eq!(b.west(), 37.4);
        assert!(!b.crosses_antimeridian());
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(matches!(
            GeoBounds::new(10.0, 20.0, 5.0, 0.0),
            Err(CoordinateError::InvertedBounds { .. })
        ));
        assert!(GeoBounds::new(91.0, 0.0, 5.0, 0.0).is_err());
        assert!(GeoBounds::new(10.0, 0.0, 181.0, 0.0).is_err());
    }

    #[test]
    fn test_antimeridian_is_representable() {
        let b = GeoBounds::new(10.0, -10.0, -170.0, 170.0).unwrap();
        assert!(b.crosses_antimeridian());
    }

    #[test]
    fn test_from_corners_and_center() {
        let a = GeoPoint::new(56.0, 38.0).unwrap();
        let b = GeoPoint::new(55.0, 37.0).unwrap();
        let bounds = GeoBounds::from_corners(a, b);
        assert_eq!(bounds, GeoBounds::new(56.0, 55.0, 38.0, 37.0).unwrap());

        let c = bounds.center();
        assert_eq!(c.lat(), 55.5);
        assert_eq!(c.lng(), 37.5);
    }

    #[test]
    fn test_to_rect() {
        let rect = GeoBounds::new(40.8, 40.7, -73.9, -74.0).unwrap().to_rect();
        assert_eq!(rect.min().x, -74.0);
        assert_eq!(rect.min().y, 40.7);
        assert_eq!(rect.max().x, -73.9);
        assert_eq!(rect.max().y, 40.8);
    }
}
