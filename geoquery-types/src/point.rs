use crate::{CoordinateError, check_lat, check_lng};
use serde::{Deserialize, Serialize};

/// A geographic point in decimal degrees.
///
/// Latitude is always within `[-90, 90]` and longitude within `[-180, 180]`;
/// the only way to obtain a `GeoPoint` is through a validating constructor
/// (or deserialization, which runs the same checks).
///
/// # Examples
///
/// ```
/// use geoquery_types::GeoPoint;
///
/// let moscow = GeoPoint::new(55.7558, 37.6176).unwrap();
/// assert_eq!(moscow.lat(), 55.7558);
/// assert_eq!(moscow.lng(), 37.6176);
///
/// assert!(GeoPoint::new(95.0, 37.6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct GeoPoint {
    pub(crate) lat: f64,
    pub(crate) lng: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = CoordinateError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.lat, raw.lng)
    }
}

impl GeoPoint {
    /// Create a point, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        Ok(Self {
            lat: check_lat("latitude", lat)?,
            lng: check_lng("longitude", lng)?,
        })
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Convert to a `geo::Point` (x = longitude, y = latitude).
    pub fn to_point(&self) -> geo::Point<f64> {
        geo::Point::new(self.lng, self.lat)
    }

    /// Arithmetic mean of a set of points, or `None` when the set is empty.
    ///
    /// Points are summed in iteration order, so callers that need a
    /// reproducible result must supply a reproducible order.
    pub fn centroid<I>(points: I) -> Option<GeoPoint>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut count = 0usize;
        let (mut lat_sum, mut lng_sum) = (0.0, 0.0);
        for point in points {
            lat_sum += point.lat;
            lng_sum += point.lng;
            count += 1;
        }
        if count == 0 {
            return None;
        }

        let n = count as f64;
        Some(GeoPoint {
            lat: (lat_sum / n).clamp(-90.0, 90.0),
            lng: (lng_sum / n).clamp(-180.0, 180.0),
        })
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        point.to_point()
    }
}

impl TryFrom<geo::Point<f64>> for GeoPoint {
    type Error = CoordinateError;

    fn try_from(point: geo::Point<f64>) -> Result<Self, Self::Error> {
        GeoPoint::new(point.y(), point.x())
    }
}
