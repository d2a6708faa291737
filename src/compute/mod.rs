//! Compute layer: pure geometry, validation and grid math.
//!
//! Nothing in here performs I/O. Both the indexed and the fallback paths call
//! into these functions so that distances, containment and grid placement are
//! evaluated identically on either path.

pub mod distance;
pub mod grid;
pub mod validation;

pub use distance::{EARTH_RADIUS_KM, Envelope, haversine_km, point_in_bounds, radius_envelope};
pub use grid::{CellKey, cell_span_m, cells_per_degree};
