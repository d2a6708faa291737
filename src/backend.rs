//! Downstream collaborators.
//!
//! The query core talks to two things it does not own:
//! - [`SpatialBackend`]: a spatially-indexed store with native within-distance,
//!   within-envelope and grid aggregation support
//! - [`RowSource`]: the plain row store, read in bounded batches of active rows
//!
//! Both traits return `Send` futures so the facade can run on a
//! multi-threaded runtime. [`NoIndex`] stands in when no spatial index is
//! deployed; every call to it fails, which sends each request to the fallback
//! path.

use crate::cluster::ClusterCell;
use crate::query::{PropertyFilters, PropertyMatch};
use crate::record::PropertyRecord;
use geoquery_types::{GeoBounds, GeoPoint};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Failures reported by a downstream collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend does not support {0}")]
    Unsupported(&'static str),

    #[error("backend query failed: {0}")]
    Query(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A store that can answer spatial predicates natively.
///
/// Implementations push `filters` down and return at most `limit` matches.
/// Order does not matter; the indexed store re-sorts. Radius matches must
/// carry `distance_km` computed with the Haversine formula on a 6371 km
/// sphere.
pub trait SpatialBackend: Send + Sync {
    fn within_distance(
        &self,
        center: GeoPoint,
        radius_km: f64,
        filters: &PropertyFilters,
        limit: usize,
    ) -> impl Future<Output = BackendResult<Vec<PropertyMatch>>> + Send;

    /// Matches inside `bounds`, edges inclusive.
    fn within_envelope(
        &self,
        bounds: GeoBounds,
        filters: &PropertyFilters,
        limit: usize,
    ) -> impl Future<Output = BackendResult<Vec<PropertyMatch>>> + Send;

    /// One cell per occupied grid square inside `bounds`, keyed by
    /// `(floor(lat * cells_per_degree), floor(lng * cells_per_degree))`.
    fn grid_aggregate(
        &self,
        bounds: GeoBounds,
        cells_per_degree: f64,
        filters: &PropertyFilters,
    ) -> impl Future<Output = BackendResult<Vec<ClusterCell>>> + Send;
}

/// Bounded access to active property rows.
pub trait RowSource: Send + Sync {
    /// Up to `limit` rows with `is_active == true`, in ascending id order.
    fn fetch_active(
        &self,
        limit: usize,
    ) -> impl Future<Output = BackendResult<Vec<PropertyRecord>>> + Send;
}

impl<T: SpatialBackend + ?Sized> SpatialBackend for Arc<T> {
    fn within_distance(
        &self,
        center: GeoPoint,
        radius_km: f64,
        filters: &PropertyFilters,
        limit: usize,
    ) -> impl Future<Output = BackendResult<Vec<PropertyMatch>>> + Send {
        (**self).within_distance(center, radius_km, filters, limit)
    }

    fn within_envelope(
        &self,
        bounds: GeoBounds,
        filters: &PropertyFilters,
        limit: usize,
    ) -> impl Future<Output = BackendResult<Vec<PropertyMatch>>> + Send {
        (**self).within_envelope(bounds, filters, limit)
    }

    fn grid_aggregate(
        &self,
        bounds: GeoBounds,
        cells_per_degree: f64,
        filters: &PropertyFilters,
    ) -> impl Future<Output = BackendResult<Vec<ClusterCell>>> + Send {
        (**self).grid_aggregate(bounds, cells_per_degree, filters)
    }
}

impl<T: RowSource + ?Sized> RowSource for Arc<T> {
    fn fetch_active(
        &self,
        limit: usize,
    ) -> impl Future<Output = BackendResult<Vec<PropertyRecord>>> + Send {
        (**self).fetch_active(limit)
    }
}

/// Active rows held in memory, for callers that already have them loaded.
impl RowSource for Vec<PropertyRecord> {
    async fn fetch_active(&self, limit: usize) -> BackendResult<Vec<PropertyRecord>> {
        let mut rows: Vec<PropertyRecord> =
            self.iter().filter(|r| r.is_active).cloned().collect();
        rows.sort_by_key(|r| r.id);
        rows.truncate(limit);
        Ok(rows)
    }
}

/// The backend used when no spatial index is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIndex;

const NO_INDEX: &str = "no spatial index configured";

impl SpatialBackend for NoIndex {
    async fn within_distance(
        &self,
        _center: GeoPoint,
        _radius_km: f64,
        _filters: &PropertyFilters,
        _limit: usize,
    ) -> BackendResult<Vec<PropertyMatch>> {
        Err(BackendError::Unavailable(NO_INDEX.to_string()))
    }

    async fn within_envelope(
        &self,
        _bounds: GeoBounds,
        _filters: &PropertyFilters,
        _limit: usize,
    ) -> BackendResult<Vec<PropertyMatch>> {
        Err(BackendError::Unavailable(NO_INDEX.to_string()))
    }

    async fn grid_aggregate(
        &self,
        _bounds: GeoBounds,
        _cells_per_degree: f64,
        _filters: &PropertyFilters,
    ) -> BackendResult<Vec<ClusterCell>> {
        Err(BackendError::Unavailable(NO_INDEX.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_index_is_unavailable() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let err = NoIndex
            .within_distance(center, 1.0, &PropertyFilters::new(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));

        let bounds = GeoBounds::new(1.0, 0.0, 1.0, 0.0).unwrap();
        assert!(NoIndex.grid_aggregate(bounds, 1.0, &PropertyFilters::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_vec_row_source_filters_inactive_and_caps() {
        let rows = vec![
            PropertyRecord::new(3, "POINT(0 0)", 1.0),
            PropertyRecord::new(1, "POINT(0 0)", 1.0).with_active(false),
            PropertyRecord::new(2, "POINT(0 0)", 1.0),
            PropertyRecord::new(4, "POINT(0 0)", 1.0),
        ];
        let fetched = rows.fetch_active(2).await.unwrap();
        let ids: Vec<i64> = fetched.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let shared = Arc::new(rows);
        assert_eq!(shared.fetch_active(10).await.unwrap().len(), 3);
    }
}
