//! Query descriptions: filters, the loose caller-facing spec, and the
//! validated shapes the stores execute.

use crate::compute::validation::{
    validate_bounds, validate_filters, validate_radius_km, validate_zoom,
};
use crate::error::{GeoQueryError, Result};
use crate::record::PropertyAttributes;
use geoquery_types::{GeoBounds, GeoPoint};
use serde::{Deserialize, Serialize};

/// Non-spatial filters. Every set field must match; price bounds are
/// inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropertyFilters {
    pub region_id: Option<i64>,
    pub property_class_id: Option<i64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl PropertyFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region_id: i64) -> Self {
        self.region_id = Some(region_id);
        self
    }

    pub fn with_property_class(mut self, property_class_id: i64) -> Self {
        self.property_class_id = Some(property_class_id);
        self
    }

    pub fn with_price_range(mut self, min_price: Option<f64>, max_price: Option<f64>) -> Self {
        self.min_price = min_price;
        self.max_price = max_price;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, attrs: &PropertyAttributes) -> bool {
        if let Some(region) = self.region_id
            && attrs.region_id != Some(region)
        {
            return false;
        }
        if let Some(class) = self.property_class_id
            && attrs.property_class_id != Some(class)
        {
            return false;
        }
        if let Some(min) = self.min_price
            && attrs.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && attrs.price > max
        {
            return false;
        }
        true
    }
}

/// Caller-facing query where the shape is given by optional fields.
///
/// Exactly one of `(center, radius_km)` or `bounds` must be present;
/// [`SpatialQuerySpec::validate`] turns it into a [`SpatialQuery`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpatialQuerySpec {
    pub center: Option<GeoPoint>,
    pub radius_km: Option<f64>,
    pub bounds: Option<GeoBounds>,
    pub filters: PropertyFilters,
}

impl SpatialQuerySpec {
    pub fn radius(center: GeoPoint, radius_km: f64) -> Self {
        Self {
            center: Some(center),
            radius_km: Some(radius_km),
            ..Self::default()
        }
    }

    pub fn bounds(bounds: GeoBounds) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::default()
        }
    }

    pub fn with_filters(mut self, filters: PropertyFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn validate(&self) -> Result<SpatialQuery> {
        match (self.center, self.radius_km, self.bounds) {
            (Some(center), Some(radius_km), None) => {
                SpatialQuery::radius(center, radius_km, self.filters)
            }
            (None, None, Some(bounds)) => SpatialQuery::bounds(bounds, self.filters),
            (Some(_), None, None) | (None, Some(_), None) => Err(GeoQueryError::Validation(
                "radius queries need both center and radius_km".to_string(),
            )),
            (None, None, None) => Err(GeoQueryError::Validation(
                "query needs either center and radius_km, or bounds".to_string(),
            )),
            (_, _, Some(_)) => Err(GeoQueryError::Validation(
                "query cannot combine a radius with bounds".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryShape {
    Radius { center: GeoPoint, radius_km: f64 },
    Bounds(GeoBounds),
}

/// A validated spatial query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialQuery {
    shape: QueryShape,
    filters: PropertyFilters,
}

impl SpatialQuery {
    pub fn radius(center: GeoPoint, radius_km: f64, filters: PropertyFilters) -> Result<Self> {
        validate_radius_km(radius_km)?;
        validate_filters(&filters)?;
        Ok(Self {
            shape: QueryShape::Radius { center, radius_km },
            filters,
        })
    }

    pub fn bounds(bounds: GeoBounds, filters: PropertyFilters) -> Result<Self> {
        validate_bounds(&bounds)?;
        validate_filters(&filters)?;
        Ok(Self {
            shape: QueryShape::Bounds(bounds),
            filters,
        })
    }

    pub fn shape(&self) -> &QueryShape {
        &self.shape
    }

    pub fn filters(&self) -> &PropertyFilters {
        &self.filters
    }

    pub fn is_radius(&self) -> bool {
        matches!(self.shape, QueryShape::Radius { .. })
    }
}

/// A validated cluster request for one map viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterQuery {
    bounds: GeoBounds,
    zoom: u8,
    filters: PropertyFilters,
}

impl ClusterQuery {
    pub fn new(bounds: GeoBounds, zoom: u8, filters: PropertyFilters) -> Result<Self> {
        validate_bounds(&bounds)?;
        validate_zoom(zoom)?;
        validate_filters(&filters)?;
        Ok(Self {
            bounds,
            zoom,
            filters,
        })
    }

    pub fn bounds(&self) -> &GeoBounds {
        &self.bounds
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn filters(&self) -> &PropertyFilters {
        &self.filters
    }

    /// The bounds search whose result this clustering partitions.
    pub fn as_bounds_query(&self) -> SpatialQuery {
        SpatialQuery {
            shape: QueryShape::Bounds(self.bounds),
            filters: self.filters,
        }
    }
}

/// One property returned by a radius or bounds search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyMatch {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl PropertyMatch {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            distance_km: None,
        }
    }

    pub fn at_distance(id: i64, distance_km: f64) -> Self {
        Self {
            id,
            distance_km: Some(distance_km),
        }
    }
}

/// Canonical order then cap: by distance when present, then by id.
pub(crate) fn finalize_matches(matches: &mut Vec<PropertyMatch>, cap: usize) {
    matches.sort_by(|a, b| {
        let by_distance = match (a.distance_km, b.distance_km) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => std::cmp::Ordering::Equal,
        };
        by_distance.then(a.id.cmp(&b.id))
    });
    matches.dedup_by_key(|m| m.id);
    matches.truncate(cap);
}
