use super::SpatialStore;
use crate::backend::RowSource;
use crate::codec;
use crate::compute::distance::{haversine_km, point_in_bounds};
use crate::config::Config;
use crate::context::QueryContext;
use crate::error::Result;
use crate::query::{PropertyFilters, PropertyMatch, QueryShape, SpatialQuery, finalize_matches};
use crate::record::PropertyRecord;
use geoquery_types::GeoPoint;

/// A row that passed decoding, the spatial predicate and the filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanHit {
    pub id: i64,
    pub point: GeoPoint,
    pub price: f64,
    /// Set for radius queries.
    pub distance_km: Option<f64>,
}

/// Result of a fallback pass plus the number of rows whose coordinates did
/// not decode.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackScan<T> {
    pub results: T,
    pub skipped: usize,
}

/// Store that scans a bounded working set of rows in memory.
///
/// Per row, in order: decode (failures are counted and skipped), spatial
/// predicate, non-spatial filters. Rows are processed in batches of
/// `scan_batch_size`; cancellation is checked between batches.
#[derive(Debug, Clone)]
pub struct FallbackSpatialStore<R> {
    rows: R,
    working_set: usize,
    batch_size: usize,
    radius_cap: usize,
    bounds_cap: usize,
}

impl<R: RowSource> FallbackSpatialStore<R> {
    pub fn new(rows: R, config: &Config) -> Self {
        Self {
            rows,
            working_set: config.fallback_working_set,
            batch_size: config.scan_batch_size,
            radius_cap: config.radius_result_cap,
            bounds_cap: config.bounds_result_cap,
        }
    }

    pub fn row_source(&self) -> &R {
        &self.rows
    }

    /// Run a query and report how many rows were skipped.
    pub async fn scan(
        &self,
        query: &SpatialQuery,
        ctx: &QueryContext,
    ) -> Result<FallbackScan<Vec<PropertyMatch>>> {
        let FallbackScan { results: hits, skipped } = self.collect_hits(query, ctx).await?;

        let cap = if query.is_radius() {
            self.radius_cap
        } else {
            self.bounds_cap
        };
        let mut matches: Vec<PropertyMatch> = hits
            .into_iter()
            .map(|hit| PropertyMatch {
                id: hit.id,
                distance_km: hit.distance_km,
            })
            .collect();
        finalize_matches(&mut matches, cap);

        Ok(FallbackScan {
            results: matches,
            skipped,
        })
    }

    /// Every row of the working set that satisfies `query`, uncapped and in
    /// row-source order.
    pub async fn collect_hits(
        &self,
        query: &SpatialQuery,
        ctx: &QueryContext,
    ) -> Result<FallbackScan<Vec<ScanHit>>> {
        ctx.check()?;
        let rows = self.rows.fetch_active(self.working_set).await?;
        ctx.check()?;

        let mut hits = Vec::new();
        let mut skipped = 0;
        for batch in rows.chunks(self.batch_size.max(1)) {
            ctx.check()?;
            for row in batch {
                match evaluate(row, query.shape(), query.filters()) {
                    Verdict::Hit(hit) => hits.push(hit),
                    Verdict::Miss => {}
                    Verdict::Undecodable => skipped += 1,
                }
            }
            tokio::task::yield_now().await;
        }

        log::debug!(
            "Fallback scan: {} rows, {} hits, {} skipped",
            rows.len(),
            hits.len(),
            skipped
        );

        Ok(FallbackScan {
            results: hits,
            skipped,
        })
    }
}

enum Verdict {
    Hit(ScanHit),
    Miss,
    Undecodable,
}

fn evaluate(row: &PropertyRecord, shape: &QueryShape, filters: &PropertyFilters) -> Verdict {
    if !row.is_active {
        return Verdict::Miss;
    }

    let point = match codec::decode(&row.coordinates) {
        Ok(point) => point,
        Err(e) => {
            log::debug!("Skipping property {}: {}", row.id, e);
            return Verdict::Undecodable;
        }
    };

    let distance_km = match shape {
        QueryShape::Radius { center, radius_km } => {
            let d = haversine_km(center, &point);
            if d > *radius_km {
                return Verdict::Miss;
            }
            Some(d)
        }
        QueryShape::Bounds(bounds) => {
            if !point_in_bounds(&point, bounds) {
                return Verdict::Miss;
            }
            None
        }
    };

    if !filters.matches(&row.attributes()) {
        return Verdict::Miss;
    }

    Verdict::Hit(ScanHit {
        id: row.id,
        point,
        price: row.price,
        distance_km,
    })
}

impl<R: RowSource> SpatialStore for FallbackSpatialStore<R> {
    async fn query(&self, query: &SpatialQuery, ctx: &QueryContext) -> Result<Vec<PropertyMatch>> {
        Ok(self.scan(query, ctx).await?.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, BackendResult};
    use crate::error::GeoQueryError;
    use geoquery_types::GeoBounds;

    struct BrokenRows;

    impl RowSource for BrokenRows {
        async fn fetch_active(&self, _limit: usize) -> BackendResult<Vec<PropertyRecord>> {
            Err(BackendError::Query("connection reset".to_string()))
        }
    }

    fn rows() -> Vec<PropertyRecord> {
        let mut rows: Vec<PropertyRecord> = (1..=9)
            .map(|i| {
                let lat = 55.70 + i as f64 * 0.01;
                PropertyRecord::new(i, format!("POINT(37.6 {})", lat), 100.0 * i as f64)
            })
            .collect();
        rows.push(PropertyRecord::new(10, "not-a-point", 1.0));
        rows
    }

    fn city() -> GeoBounds {
        GeoBounds::new(56.0, 55.5, 38.0, 37.0).unwrap()
    }

    #[tokio::test]
    async fn test_skips_undecodable_rows() {
        let store = FallbackSpatialStore::new(rows(), &Config::default());
        let query = SpatialQuery::bounds(city(), PropertyFilters::new()).unwrap();

        let scan = store.scan(&query, &QueryContext::new()).await.unwrap();
        assert_eq!(scan.results.len(), 9);
        assert_eq!(scan.skipped, 1);
    }

    #[tokio::test]
    async fn test_radius_orders_by_distance() {
        let store = FallbackSpatialStore::new(rows(), &Config::default());
        let center = GeoPoint::new(55.75, 37.6).unwrap();
        let query = SpatialQuery::radius(center, 2.5, PropertyFilters::new()).unwrap();

        let matches = store.query(&query, &QueryContext::new()).await.unwrap();
        let ids: Vec<i64> = matches.iter().map(|m| m.id).collect();
        // the row at the center, then its neighbours about 1.1 km and 2.2 km out
        assert_eq!(ids[0], 5);
        assert_eq!(ids.len(), 5);
        assert!(matches.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[tokio::test]
    async fn test_filters_and_working_set() {
        let config = Config::default().with_fallback_working_set(4);
        let store = FallbackSpatialStore::new(rows(), &config);
        let query = SpatialQuery::bounds(
            city(),
            PropertyFilters::new().with_price_range(Some(200.0), None),
        )
        .unwrap();

        let matches = store.query(&query, &QueryContext::new()).await.unwrap();
        let ids: Vec<i64> = matches.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_cancelled_before_scan() {
        let store = FallbackSpatialStore::new(rows(), &Config::default());
        let query = SpatialQuery::bounds(city(), PropertyFilters::new()).unwrap();
        let ctx = QueryContext::new();
        ctx.cancellation_token().cancel();

        assert_eq!(store.query(&query, &ctx).await, Err(GeoQueryError::Cancelled));
    }

    #[tokio::test]
    async fn test_row_source_failure() {
        let store = FallbackSpatialStore::new(BrokenRows, &Config::default());
        let query = SpatialQuery::bounds(city(), PropertyFilters::new()).unwrap();

        let err = store.query(&query, &QueryContext::new()).await.unwrap_err();
        assert!(matches!(err, GeoQueryError::Backend(_)));
    }
}
