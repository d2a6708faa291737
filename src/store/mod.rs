//! Radius and bounds search over property rows.
//!
//! Two implementations share one contract: for the same snapshot and the same
//! validated query they return the same ids in the same canonical order.
//!
//! - [`IndexedSpatialStore`] delegates to a [`SpatialBackend`](crate::backend::SpatialBackend)
//! - [`FallbackSpatialStore`] scans a bounded batch of rows in memory
//!
//! Picking between them is the facade's job; neither store knows about the
//! other.

mod fallback;
mod indexed;

pub use fallback::{FallbackScan, FallbackSpatialStore, ScanHit};
pub use indexed::IndexedSpatialStore;

use crate::context::QueryContext;
use crate::error::Result;
use crate::query::{PropertyMatch, SpatialQuery};
use std::future::Future;

/// Resolve a validated query into matches in canonical order, capped.
pub trait SpatialStore: Send + Sync {
    fn query(
        &self,
        query: &SpatialQuery,
        ctx: &QueryContext,
    ) -> impl Future<Output = Result<Vec<PropertyMatch>>> + Send;
}
