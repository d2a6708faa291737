//! Builder for wiring a facade to its collaborators.
//!
//! A facade always has a row source for the fallback path. The spatial
//! backend is optional: without one every request is answered by the
//! fallback, which is how deployments without a spatial index run.

use crate::backend::{NoIndex, RowSource, SpatialBackend};
use crate::config::Config;
use crate::error::Result;
use crate::facade::GeoQueryFacade;
use crate::spatial_index::PropertyIndex;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`GeoQueryFacade`].
///
/// # Examples
///
/// ```rust
/// use geoquery::{Config, GeoQueryBuilder, PropertyIndex, PropertyRecord};
///
/// // no spatial index: the fallback serves everything
/// let rows = vec![PropertyRecord::new(1, "POINT(37.6176 55.7558)", 100.0)];
/// let facade = GeoQueryBuilder::new(rows).build().unwrap();
/// assert_eq!(facade.config().radius_result_cap, 500);
///
/// // rows and index from the same in-process snapshot
/// let index = PropertyIndex::from_records(vec![
///     PropertyRecord::new(1, "POINT(37.6176 55.7558)", 100.0),
/// ]);
/// let facade = GeoQueryBuilder::embedded(index)
///     .config(Config::default().with_radius_result_cap(50))
///     .build()
///     .unwrap();
/// assert_eq!(facade.config().radius_result_cap, 50);
/// ```
#[derive(Debug)]
pub struct GeoQueryBuilder<B, R> {
    backend: Arc<B>,
    rows: Arc<R>,
    config: Config,
}

impl<R: RowSource> GeoQueryBuilder<NoIndex, R> {
    /// Start from a row source, with no spatial index.
    pub fn new(rows: R) -> Self {
        Self::from_shared(Arc::new(rows))
    }

    pub fn from_shared(rows: Arc<R>) -> Self {
        Self {
            backend: Arc::new(NoIndex),
            rows,
            config: Config::default(),
        }
    }
}

impl GeoQueryBuilder<PropertyIndex, PropertyIndex> {
    /// Serve both paths from one in-process index.
    pub fn embedded(index: PropertyIndex) -> Self {
        let shared = Arc::new(index);
        Self {
            backend: shared.clone(),
            rows: shared,
            config: Config::default(),
        }
    }
}

impl<B, R> GeoQueryBuilder<B, R> {
    /// Use `backend` for the indexed path.
    pub fn indexed<I: SpatialBackend>(self, backend: I) -> GeoQueryBuilder<I, R> {
        self.indexed_shared(Arc::new(backend))
    }

    pub fn indexed_shared<I: SpatialBackend>(self, backend: Arc<I>) -> GeoQueryBuilder<I, R> {
        GeoQueryBuilder {
            backend,
            rows: self.rows,
            config: self.config,
        }
    }

    /// Set the service configuration (caps, working set, timeout).
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Override only the indexed-path timeout.
    pub fn indexed_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_indexed_timeout(timeout);
        self
    }

    /// Validate the configuration and build the facade.
    pub fn build(self) -> Result<GeoQueryFacade<B, R>>
    where
        B: SpatialBackend,
        R: RowSource,
    {
        GeoQueryFacade::new(self.backend, self.rows, self.config)
    }
}
