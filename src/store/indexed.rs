use super::SpatialStore;
use crate::backend::SpatialBackend;
use crate::config::Config;
use crate::context::QueryContext;
use crate::error::{GeoQueryError, Result};
use crate::query::{PropertyMatch, QueryShape, SpatialQuery, finalize_matches};

/// Store backed by a spatially-indexed backend.
///
/// Every backend failure comes back as `UpstreamUnavailable`, which is the
/// facade's cue to retry the request on the fallback path.
#[derive(Debug, Clone)]
pub struct IndexedSpatialStore<B> {
    backend: B,
    radius_cap: usize,
    bounds_cap: usize,
}

impl<B: SpatialBackend> IndexedSpatialStore<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        Self {
            backend,
            radius_cap: config.radius_result_cap,
            bounds_cap: config.bounds_result_cap,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: SpatialBackend> SpatialStore for IndexedSpatialStore<B> {
    async fn query(&self, query: &SpatialQuery, ctx: &QueryContext) -> Result<Vec<PropertyMatch>> {
        ctx.check()?;

        let (result, cap) = match *query.shape() {
            QueryShape::Radius { center, radius_km } => (
                self.backend
                    .within_distance(center, radius_km, query.filters(), self.radius_cap)
                    .await,
                self.radius_cap,
            ),
            QueryShape::Bounds(bounds) => (
                self.backend
                    .within_envelope(bounds, query.filters(), self.bounds_cap)
                    .await,
                self.bounds_cap,
            ),
        };

        let mut matches =
            result.map_err(|e| GeoQueryError::UpstreamUnavailable(e.to_string()))?;
        finalize_matches(&mut matches, cap);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoIndex;
    use crate::query::PropertyFilters;
    use crate::record::PropertyRecord;
    use crate::spatial_index::PropertyIndex;
    use geoquery_types::{GeoBounds, GeoPoint};
    use std::sync::Arc;

    fn index() -> Arc<PropertyIndex> {
        Arc::new(PropertyIndex::from_records((0..20).map(|i| {
            let lat = 55.70 + i as f64 * 0.005;
            PropertyRecord::new(i, format!("POINT(37.6 {})", lat), 1_000.0 * i as f64)
        })))
    }

    #[tokio::test]
    async fn test_radius_query_capped_by_config() {
        let config = Config::default().with_radius_result_cap(5);
        let store = IndexedSpatialStore::new(index(), &config);
        let center = GeoPoint::new(55.70, 37.6).unwrap();
        let query = SpatialQuery::radius(center, 50.0, PropertyFilters::new()).unwrap();

        let matches = store.query(&query, &QueryContext::new()).await.unwrap();
        let ids: Vec<i64> = matches.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_bounds_query_sorted_by_id() {
        let store = IndexedSpatialStore::new(index(), &Config::default());
        let bounds = GeoBounds::new(55.722, 55.699, 37.7, 37.5).unwrap();
        let query = SpatialQuery::bounds(bounds, PropertyFilters::new()).unwrap();

        let matches = store.query(&query, &QueryContext::new()).await.unwrap();
        let ids: Vec<i64> = matches.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert!(matches.iter().all(|m| m.distance_km.is_none()));
    }

    #[tokio::test]
    async fn test_backend_failure_is_upstream_unavailable() {
        let store = IndexedSpatialStore::new(NoIndex, &Config::default());
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let query = SpatialQuery::radius(center, 1.0, PropertyFilters::new()).unwrap();

        let err = store.query(&query, &QueryContext::new()).await.unwrap_err();
        assert!(matches!(err, GeoQueryError::UpstreamUnavailable(_)));
    }
}
