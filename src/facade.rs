//! The single entry point for spatial queries.
//!
//! Every request goes through the same state machine:
//!
//! ```text
//! validate -> indexed attempt --ok--> done
//!                  |
//!                  +--failed/timed out--> fallback --ok--> done
//!                                             |
//!                                             +--failed--> FallbackExhausted
//! ```
//!
//! Validation errors return before either path runs. There is at most one
//! indexed-to-fallback transition per request and no retry. Cancellation
//! wins over everything and never yields a partial result.

use crate::backend::{RowSource, SpatialBackend};
use crate::cluster::{ClusterAggregator, ClusterCell, FallbackClusterAggregator, IndexedClusterAggregator};
use crate::config::Config;
use crate::context::QueryContext;
use crate::error::{GeoQueryError, Result};
use crate::query::{ClusterQuery, PropertyFilters, PropertyMatch, SpatialQuery, SpatialQuerySpec};
use crate::store::{FallbackSpatialStore, IndexedSpatialStore, SpatialStore};
use geoquery_types::{GeoBounds, GeoPoint};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// Which path answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPath {
    Indexed,
    Fallback,
}

/// Results plus how they were produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome<T> {
    pub results: T,
    pub path: QueryPath,
    /// Rows skipped because their coordinates did not decode. Only the
    /// fallback path reports this; it is zero for indexed answers.
    pub skipped_records: usize,
}

impl<T> QueryOutcome<T> {
    fn indexed(results: T) -> Self {
        Self {
            results,
            path: QueryPath::Indexed,
            skipped_records: 0,
        }
    }

    fn fallback(results: T, skipped_records: usize) -> Self {
        Self {
            results,
            path: QueryPath::Fallback,
            skipped_records,
        }
    }
}

/// Radius search, bounds search and viewport clustering with silent failover
/// from the indexed backend to the in-memory fallback.
///
/// The facade holds only immutable configuration and shared handles, so one
/// instance can serve any number of concurrent requests. The indexed attempt
/// is bounded with `tokio::time::timeout`, so calls must run inside a Tokio
/// runtime with the time driver enabled.
pub struct GeoQueryFacade<B, R> {
    config: Config,
    indexed: IndexedSpatialStore<Arc<B>>,
    fallback: FallbackSpatialStore<Arc<R>>,
    indexed_clusters: IndexedClusterAggregator<Arc<B>>,
    fallback_clusters: FallbackClusterAggregator<Arc<R>>,
}

impl<B, R> Clone for GeoQueryFacade<B, R> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            indexed: self.indexed.clone(),
            fallback: self.fallback.clone(),
            indexed_clusters: self.indexed_clusters.clone(),
            fallback_clusters: self.fallback_clusters.clone(),
        }
    }
}

impl<B: SpatialBackend, R: RowSource> GeoQueryFacade<B, R> {
    /// Build a facade. See [`GeoQueryBuilder`](crate::GeoQueryBuilder) for
    /// the usual way in.
    pub fn new(backend: Arc<B>, rows: Arc<R>, config: Config) -> Result<Self> {
        config.validate()?;

        let fallback = FallbackSpatialStore::new(rows, &config);
        Ok(Self {
            indexed: IndexedSpatialStore::new(backend.clone(), &config),
            indexed_clusters: IndexedClusterAggregator::new(backend, &config),
            fallback_clusters: FallbackClusterAggregator::new(fallback.clone(), &config),
            fallback,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        self.indexed.backend()
    }

    pub fn row_source(&self) -> &R {
        self.fallback.row_source()
    }

    /// Properties within `radius_km` of `center`, nearest first.
    pub async fn radius_search(
        &self,
        center: GeoPoint,
        radius_km: f64,
        filters: PropertyFilters,
        ctx: &QueryContext,
    ) -> Result<Vec<PropertyMatch>> {
        Ok(self
            .radius_search_traced(center, radius_km, filters, ctx)
            .await?
            .results)
    }

    pub async fn radius_search_traced(
        &self,
        center: GeoPoint,
        radius_km: f64,
        filters: PropertyFilters,
        ctx: &QueryContext,
    ) -> Result<QueryOutcome<Vec<PropertyMatch>>> {
        let query = SpatialQuery::radius(center, radius_km, filters)?;
        self.run_search(&query, ctx).await
    }

    /// Properties inside `bounds` (edges inclusive), by ascending id.
    pub async fn bounds_search(
        &self,
        bounds: GeoBounds,
        filters: PropertyFilters,
        ctx: &QueryContext,
    ) -> Result<Vec<PropertyMatch>> {
        Ok(self.bounds_search_traced(bounds, filters, ctx).await?.results)
    }

    pub async fn bounds_search_traced(
        &self,
        bounds: GeoBounds,
        filters: PropertyFilters,
        ctx: &QueryContext,
    ) -> Result<QueryOutcome<Vec<PropertyMatch>>> {
        let query = SpatialQuery::bounds(bounds, filters)?;
        self.run_search(&query, ctx).await
    }

    /// Run a caller-built spec; exactly one shape must be set.
    pub async fn query(
        &self,
        spec: &SpatialQuerySpec,
        ctx: &QueryContext,
    ) -> Result<Vec<PropertyMatch>> {
        Ok(self.query_traced(spec, ctx).await?.results)
    }

    pub async fn query_traced(
        &self,
        spec: &SpatialQuerySpec,
        ctx: &QueryContext,
    ) -> Result<QueryOutcome<Vec<PropertyMatch>>> {
        let query = spec.validate()?;
        self.run_search(&query, ctx).await
    }

    /// Map markers for a viewport at `zoom`, densest cell first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use geoquery::prelude::*;
    ///
    /// # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    /// # rt.block_on(async {
    /// let index = PropertyIndex::from_records(vec![
    ///     PropertyRecord::new(1, "POINT(37.6176 55.7558)", 100.0),
    ///     PropertyRecord::new(2, "POINT(37.6180 55.7560)", 300.0),
    /// ]);
    /// let facade = GeoQueryBuilder::embedded(index).build().unwrap();
    ///
    /// let viewport = GeoBounds::new(56.0, 55.5, 38.0, 37.0).unwrap();
    /// let cells = facade
    ///     .cluster_for_view(viewport, 10, PropertyFilters::new(), &QueryContext::new())
    ///     .await
    ///     .unwrap();
    /// assert_eq!(cells.len(), 1);
    /// assert_eq!(cells[0].avg_price, 200.0);
    /// # });
    /// ```
    pub async fn cluster_for_view(
        &self,
        bounds: GeoBounds,
        zoom: u8,
        filters: PropertyFilters,
        ctx: &QueryContext,
    ) -> Result<Vec<ClusterCell>> {
        Ok(self
            .cluster_for_view_traced(bounds, zoom, filters, ctx)
            .await?
            .results)
    }

    pub async fn cluster_for_view_traced(
        &self,
        bounds: GeoBounds,
        zoom: u8,
        filters: PropertyFilters,
        ctx: &QueryContext,
    ) -> Result<QueryOutcome<Vec<ClusterCell>>> {
        let query = ClusterQuery::new(bounds, zoom, filters)?;
        ctx.check()?;

        let indexed_err = match self
            .attempt_indexed(self.indexed_clusters.aggregate(&query, ctx), ctx)
            .await
        {
            Ok(cells) => return Ok(QueryOutcome::indexed(cells)),
            Err(GeoQueryError::Cancelled) => return Err(GeoQueryError::Cancelled),
            Err(e) => e,
        };
        log::warn!(
            "Indexed clustering failed, falling back to in-memory grouping: {}",
            indexed_err
        );

        match self.fallback_clusters.group(&query, ctx).await {
            Ok(scan) => Ok(QueryOutcome::fallback(scan.results, scan.skipped)),
            Err(e) => Err(exhausted(indexed_err, e)),
        }
    }

    async fn run_search(
        &self,
        query: &SpatialQuery,
        ctx: &QueryContext,
    ) -> Result<QueryOutcome<Vec<PropertyMatch>>> {
        ctx.check()?;

        let indexed_err = match self
            .attempt_indexed(self.indexed.query(query, ctx), ctx)
            .await
        {
            Ok(matches) => return Ok(QueryOutcome::indexed(matches)),
            Err(GeoQueryError::Cancelled) => return Err(GeoQueryError::Cancelled),
            Err(e) => e,
        };
        log::warn!(
            "Indexed search failed, falling back to row scan: {}",
            indexed_err
        );

        match self.fallback.scan(query, ctx).await {
            Ok(scan) => Ok(QueryOutcome::fallback(scan.results, scan.skipped)),
            Err(e) => Err(exhausted(indexed_err, e)),
        }
    }

    /// Race the indexed attempt against the deadline and the cancellation
    /// token. A timeout is an indexed failure like any other.
    async fn attempt_indexed<T>(
        &self,
        attempt: impl Future<Output = Result<T>>,
        ctx: &QueryContext,
    ) -> Result<T> {
        let limit = ctx.timeout().unwrap_or_else(|| self.config.indexed_timeout());

        tokio::select! {
            biased;
            _ = ctx.cancellation_token().cancelled() => Err(GeoQueryError::Cancelled),
            outcome = tokio::time::timeout(limit, attempt) => match outcome {
                Ok(result) => result,
                Err(_) => Err(GeoQueryError::UpstreamUnavailable(format!(
                    "indexed attempt timed out after {:?}",
                    limit
                ))),
            },
        }
    }
}

fn exhausted(indexed: GeoQueryError, fallback: GeoQueryError) -> GeoQueryError {
    if fallback == GeoQueryError::Cancelled {
        return fallback;
    }
    log::warn!(
        "Fallback failed after indexed failure (indexed: {}; fallback: {})",
        indexed,
        fallback
    );
    GeoQueryError::FallbackExhausted {
        indexed: indexed.to_string(),
        fallback: fallback.to_string(),
    }
}
