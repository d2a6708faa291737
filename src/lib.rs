//! Geospatial radius search, bounds search and map clustering over property
//! rows, with a spatial-index fast path and an in-memory fallback that
//! returns the same answers.
//!
//! ```rust
//! use geoquery::prelude::*;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let index = PropertyIndex::from_records(vec![
//!     PropertyRecord::new(1, "POINT(37.6176 55.7558)", 12_500_000.0),
//!     PropertyRecord::new(2, r#"{"lat": 55.7600, "lng": 37.6200}"#, 9_800_000.0),
//!     PropertyRecord::new(3, "not-a-point", 7_000_000.0),
//! ]);
//! let facade = GeoQueryBuilder::embedded(index).build()?;
//!
//! let center = GeoPoint::new(55.7558, 37.6176)?;
//! let nearby = facade
//!     .radius_search(center, 5.0, PropertyFilters::new(), &QueryContext::new())
//!     .await?;
//! assert_eq!(nearby.len(), 2);
//! # Ok::<(), GeoQueryError>(())
//! # }).unwrap();
//! ```

pub mod backend;
pub mod builder;
pub mod cluster;
pub mod codec;
pub mod compute;
pub mod config;
pub mod context;
pub mod error;
pub mod facade;
pub mod query;
pub mod record;
pub mod spatial_index;
pub mod store;

#[cfg(feature = "geojson")]
pub mod geojson;

pub use backend::{BackendError, BackendResult, NoIndex, RowSource, SpatialBackend};
pub use builder::GeoQueryBuilder;
pub use cluster::{
    ClusterAggregator, ClusterCell, FallbackClusterAggregator, IndexedClusterAggregator,
};
pub use config::Config;
pub use context::QueryContext;
pub use error::{DecodeError, DecodeReason, GeoQueryError, Result};
pub use facade::{GeoQueryFacade, QueryOutcome, QueryPath};
pub use query::{
    ClusterQuery, PropertyFilters, PropertyMatch, QueryShape, SpatialQuery, SpatialQuerySpec,
};
pub use record::{PropertyAttributes, PropertyRecord, RawCoordinates};
pub use spatial_index::{PropertyIndex, PropertyIndexStats};
pub use store::{FallbackSpatialStore, IndexedSpatialStore, SpatialStore};

pub use geoquery_types::{CoordinateError, GeoBounds, GeoPoint};

pub use tokio_util::sync::CancellationToken;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{GeoQueryBuilder, GeoQueryError, GeoQueryFacade, Result};

    pub use crate::{GeoBounds, GeoPoint};

    pub use crate::{
        ClusterCell, PropertyFilters, PropertyMatch, PropertyRecord, QueryContext, QueryPath,
        SpatialQuerySpec,
    };

    pub use crate::{Config, NoIndex, PropertyIndex, RowSource, SpatialBackend};

    pub use crate::compute::haversine_km;

    pub use std::time::Duration;
}
