//! Zoom-dependent grid clustering for map markers.
//!
//! A viewport is cut into square cells whose size depends on the zoom level
//! (see [`crate::compute::grid`]). Every occupied cell becomes one
//! [`ClusterCell`] carrying the member count, price range, mean price,
//! centroid and member ids.
//!
//! [`IndexedClusterAggregator`] pushes the grouping down to the backend;
//! [`FallbackClusterAggregator`] groups the fallback bounds result in memory.
//! For the same snapshot both produce the same cells with the same
//! aggregates.

use crate::backend::{RowSource, SpatialBackend};
use crate::compute::grid::{GridAccumulator, cells_per_degree, rank_cells};
use crate::config::Config;
use crate::context::QueryContext;
use crate::error::{GeoQueryError, Result};
use crate::query::ClusterQuery;
use crate::store::{FallbackScan, FallbackSpatialStore};
use geoquery_types::GeoPoint;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// One map marker: the aggregate of every property in a grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCell {
    /// Arithmetic mean of member coordinates.
    pub centroid: GeoPoint,
    pub count: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
    /// Ascending.
    pub member_ids: Vec<i64>,
}

/// Group the properties inside a viewport into ranked cells.
///
/// Results are ordered by `count` descending, ties by smallest member id,
/// and capped at `cluster_cell_cap`.
pub trait ClusterAggregator: Send + Sync {
    fn aggregate(
        &self,
        query: &ClusterQuery,
        ctx: &QueryContext,
    ) -> impl Future<Output = Result<Vec<ClusterCell>>> + Send;
}

/// Aggregator that asks the backend to group by cell.
#[derive(Debug, Clone)]
pub struct IndexedClusterAggregator<B> {
    backend: B,
    cell_cap: usize,
}

impl<B: SpatialBackend> IndexedClusterAggregator<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        Self {
            backend,
            cell_cap: config.cluster_cell_cap,
        }
    }
}

impl<B: SpatialBackend> ClusterAggregator for IndexedClusterAggregator<B> {
    async fn aggregate(&self, query: &ClusterQuery, ctx: &QueryContext) -> Result<Vec<ClusterCell>> {
        ctx.check()?;

        let mut cells = self
            .backend
            .grid_aggregate(
                *query.bounds(),
                cells_per_degree(query.zoom()),
                query.filters(),
            )
            .await
            .map_err(|e| GeoQueryError::UpstreamUnavailable(e.to_string()))?;

        for cell in &mut cells {
            cell.member_ids.sort_unstable();
        }
        rank_cells(&mut cells, self.cell_cap);
        Ok(cells)
    }
}

/// Aggregator that groups the fallback bounds result in memory.
#[derive(Debug, Clone)]
pub struct FallbackClusterAggregator<R> {
    store: FallbackSpatialStore<R>,
    batch_size: usize,
    cell_cap: usize,
}

impl<R: RowSource> FallbackClusterAggregator<R> {
    pub fn new(store: FallbackSpatialStore<R>, config: &Config) -> Self {
        Self {
            store,
            batch_size: config.scan_batch_size,
            cell_cap: config.cluster_cell_cap,
        }
    }

    /// Aggregate and report how many rows were skipped as undecodable.
    pub async fn group(
        &self,
        query: &ClusterQuery,
        ctx: &QueryContext,
    ) -> Result<FallbackScan<Vec<ClusterCell>>> {
        let FallbackScan { results: hits, skipped } = self
            .store
            .collect_hits(&query.as_bounds_query(), ctx)
            .await?;

        let mut grid = GridAccumulator::for_zoom(query.zoom());
        for batch in hits.chunks(self.batch_size.max(1)) {
            ctx.check()?;
            for hit in batch {
                grid.push(hit.id, hit.point, hit.price);
            }
            tokio::task::yield_now().await;
        }
        ctx.check()?;

        log::debug!(
            "Fallback clustering at zoom {}: {} hits in {} cells",
            query.zoom(),
            hits.len(),
            grid.occupied()
        );

        let mut cells = grid.finish();
        rank_cells(&mut cells, self.cell_cap);
        Ok(FallbackScan {
            results: cells,
            skipped,
        })
    }
}

impl<R: RowSource> ClusterAggregator for FallbackClusterAggregator<R> {
    async fn aggregate(&self, query: &ClusterQuery, ctx: &QueryContext) -> Result<Vec<ClusterCell>> {
        Ok(self.group(query, ctx).await?.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoIndex;
    use crate::query::PropertyFilters;
    use crate::record::PropertyRecord;
    use crate::spatial_index::PropertyIndex;
    use geoquery_types::GeoBounds;
    use std::sync::Arc;

    fn index() -> Arc<PropertyIndex> {
        let mut records = Vec::new();
        for i in 0..10 {
            let lat = 55.70 + (i / 5) as f64 * 0.05;
            let lng = 37.50 + (i % 5) as f64 * 0.05;
            records.push(PropertyRecord::new(
                i,
                format!("POINT({} {})", lng, lat),
                10.0 * (i + 1) as f64,
            ));
        }
        records.push(PropertyRecord::new(99, "garbage", 1.0));
        Arc::new(PropertyIndex::from_records(records))
    }

    fn viewport() -> GeoBounds {
        GeoBounds::new(56.0, 55.5, 38.0, 37.0).unwrap()
    }

    fn aggregates(cells: &[ClusterCell]) -> Vec<(usize, f64, f64, f64, Vec<i64>)> {
        let mut out: Vec<_> = cells
            .iter()
            .map(|c| (c.count, c.min_price, c.max_price, c.avg_price, c.member_ids.clone()))
            .collect();
        out.sort_by(|a, b| a.4.cmp(&b.4));
        out
    }

    #[tokio::test]
    async fn test_paths_agree() {
        let config = Config::default();
        let idx = index();
        let indexed = IndexedClusterAggregator::new(idx.clone(), &config);
        let fallback =
            FallbackClusterAggregator::new(FallbackSpatialStore::new(idx, &config), &config);
        let ctx = QueryContext::new();

        for zoom in [4, 10, 12, 14, 16] {
            let query = ClusterQuery::new(viewport(), zoom, PropertyFilters::new()).unwrap();
            let a = indexed.aggregate(&query, &ctx).await.unwrap();
            let b = fallback.group(&query, &ctx).await.unwrap();
            assert_eq!(aggregates(&a), aggregates(&b.results), "zoom {}", zoom);
            assert_eq!(a, b.results, "zoom {}", zoom);
            assert_eq!(b.skipped, 1);

            let total: usize = a.iter().map(|c| c.count).sum();
            assert_eq!(total, 10);
        }
    }

    #[tokio::test]
    async fn test_low_zoom_merges_high_zoom_splits() {
        let config = Config::default();
        let indexed = IndexedClusterAggregator::new(index(), &config);
        let ctx = QueryContext::new();

        let coarse = ClusterQuery::new(viewport(), 4, PropertyFilters::new()).unwrap();
        let cells = indexed.aggregate(&coarse, &ctx).await.unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count, 10);
        assert_eq!(cells[0].min_price, 10.0);
        assert_eq!(cells[0].max_price, 100.0);
        assert_eq!(cells[0].avg_price, 55.0);

        let fine = ClusterQuery::new(viewport(), 16, PropertyFilters::new()).unwrap();
        assert_eq!(indexed.aggregate(&fine, &ctx).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_cell_cap() {
        let config = Config::default().with_cluster_cell_cap(3);
        let indexed = IndexedClusterAggregator::new(index(), &config);
        let query = ClusterQuery::new(viewport(), 16, PropertyFilters::new()).unwrap();

        let cells = indexed.aggregate(&query, &QueryContext::new()).await.unwrap();
        let firsts: Vec<i64> = cells.iter().map(|c| c.member_ids[0]).collect();
        assert_eq!(firsts, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_indexed_failure_and_cancellation() {
        let config = Config::default();
        let query = ClusterQuery::new(viewport(), 12, PropertyFilters::new()).unwrap();

        let broken = IndexedClusterAggregator::new(NoIndex, &config);
        assert!(matches!(
            broken.aggregate(&query, &QueryContext::new()).await,
            Err(GeoQueryError::UpstreamUnavailable(_))
        ));

        let fallback =
            FallbackClusterAggregator::new(FallbackSpatialStore::new(index(), &config), &config);
        let ctx = QueryContext::new();
        ctx.cancellation_token().cancel();
        assert_eq!(
            fallback.aggregate(&query, &ctx).await,
            Err(GeoQueryError::Cancelled)
        );
    }
}
