//! GeoJSON export for map clients.
//!
//! Cluster cells become Point features at their centroid carrying the
//! aggregates as properties. Positions are `[lng, lat]` as GeoJSON requires.

use crate::cluster::ClusterCell;
use crate::error::{GeoQueryError, Result};
use crate::query::PropertyMatch;
use geoquery_types::GeoPoint;
use ::geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

fn point_geometry(point: &GeoPoint) -> Geometry {
    Geometry::new(Value::Point(vec![point.lng(), point.lat()]))
}

fn feature(geometry: Geometry, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn object(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

/// One Point feature per cell.
pub fn clusters_to_feature_collection(cells: &[ClusterCell]) -> FeatureCollection {
    let features = cells
        .iter()
        .map(|cell| {
            feature(
                point_geometry(&cell.centroid),
                object(json!({
                    "count": cell.count,
                    "min_price": cell.min_price,
                    "max_price": cell.max_price,
                    "avg_price": cell.avg_price,
                    "member_ids": cell.member_ids,
                })),
            )
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn clusters_to_geojson_string(cells: &[ClusterCell]) -> Result<String> {
    serde_json::to_string(&clusters_to_feature_collection(cells))
        .map_err(|e| GeoQueryError::Serialization(format!("Failed to serialize clusters: {}", e)))
}

/// Point features for search matches.
///
/// `locate` maps an id to its position; matches it cannot place are left
/// out.
pub fn matches_to_feature_collection<F>(matches: &[PropertyMatch], mut locate: F) -> FeatureCollection
where
    F: FnMut(i64) -> Option<GeoPoint>,
{
    let features = matches
        .iter()
        .filter_map(|m| {
            let point = locate(m.id)?;
            let mut properties = object(json!({ "id": m.id }));
            if let Some(distance) = m.distance_km {
                properties.insert("distance_km".to_string(), json!(distance));
            }
            Some(feature(point_geometry(&point), properties))
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
