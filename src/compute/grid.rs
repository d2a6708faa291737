//! Zoom-dependent grid used for map clustering.
//!
//! Cell edge length is `2^max(0, 16 - zoom) * 100` metres: 100 m at zoom 16
//! and above, doubling for every zoom level below that. The constant is
//! empirically tuned for marker density and has no derivation behind it.
//!
//! Aggregates are computed over members sorted by id, so a cell built from the
//! same members always has bit-identical sums regardless of the order in which
//! rows arrived.

use crate::cluster::ClusterCell;
use geoquery_types::GeoPoint;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

/// Zoom level at which cells reach their finest size.
pub const BASE_ZOOM: u8 = 16;

/// Cell edge length at `BASE_ZOOM`, in metres.
pub const BASE_CELL_SPAN_M: f64 = 100.0;

/// Length of one degree of latitude, in metres.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Cell edge length in metres for a zoom level.
pub fn cell_span_m(zoom: u8) -> f64 {
    2f64.powi(i32::from(BASE_ZOOM.saturating_sub(zoom))) * BASE_CELL_SPAN_M
}

/// Grid resolution for a zoom level: higher zoom, more cells per degree.
///
/// `2^max(0, 16 - zoom) * 100` is not used as cells per degree directly.
/// It is read as a cell span in metres and converted with
/// `111_320 / span`, so zoom 4 yields a handful of city-wide cells and zoom
/// 16 separates neighbouring buildings. The constant is empirical and due for
/// recalibration against real marker density.
///
/// # Examples
///
/// ```
/// use geoquery::compute::cells_per_degree;
///
/// assert!(cells_per_degree(16) > cells_per_degree(4));
/// assert_eq!(cells_per_degree(18), cells_per_degree(16));
/// ```
pub fn cells_per_degree(zoom: u8) -> f64 {
    METERS_PER_DEGREE / cell_span_m(zoom)
}

/// Integer grid coordinates of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub row: i64,
    pub col: i64,
}

impl CellKey {
    pub fn for_point(point: &GeoPoint, cells_per_degree: f64) -> Self {
        Self {
            row: (point.lat() * cells_per_degree).floor() as i64,
            col: (point.lng() * cells_per_degree).floor() as i64,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CellMember {
    id: i64,
    point: GeoPoint,
    price: f64,
}

/// Members collected for one cell.
#[derive(Debug, Clone, Default)]
pub struct CellAccumulator {
    members: Vec<CellMember>,
}

impl CellAccumulator {
    pub fn push(&mut self, id: i64, point: GeoPoint, price: f64) {
        self.members.push(CellMember { id, point, price });
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Aggregate the cell, or `None` if nothing was pushed.
    pub fn finish(mut self) -> Option<ClusterCell> {
        self.members.sort_by_key(|m| m.id);

        let centroid = GeoPoint::centroid(self.members.iter().map(|m| m.point))?;
        let count = self.members.len();

        let mut sum = 0.0;
        let mut min_price = f64::INFINITY;
        let mut max_price = f64::NEG_INFINITY;
        for member in &self.members {
            sum += member.price;
            min_price = min_price.min(member.price);
            max_price = max_price.max(member.price);
        }

        Some(ClusterCell {
            centroid,
            count,
            min_price,
            max_price,
            avg_price: sum / count as f64,
            member_ids: self.members.iter().map(|m| m.id).collect(),
        })
    }
}

/// Request-local grid keyed by `CellKey`.
#[derive(Debug, Clone)]
pub struct GridAccumulator {
    cells_per_degree: f64,
    cells: FxHashMap<CellKey, CellAccumulator>,
}

impl GridAccumulator {
    pub fn new(cells_per_degree: f64) -> Self {
        Self {
            cells_per_degree,
            cells: FxHashMap::default(),
        }
    }

    pub fn for_zoom(zoom: u8) -> Self {
        Self::new(cells_per_degree(zoom))
    }

    pub fn push(&mut self, id: i64, point: GeoPoint, price: f64) {
        let key = CellKey::for_point(&point, self.cells_per_degree);
        self.cells.entry(key).or_default().push(id, point, price);
    }

    /// Number of occupied cells so far.
    pub fn occupied(&self) -> usize {
        self.cells.len()
    }

    /// One `ClusterCell` per occupied cell, unordered.
    pub fn finish(self) -> Vec<ClusterCell> {
        self.cells
            .into_values()
            .filter_map(CellAccumulator::finish)
            .collect()
    }
}

/// Order cells densest first and keep at most `cap`.
///
/// Ties are broken by the smallest member id; cells are disjoint, so the
/// order is total.
pub fn rank_cells(cells: &mut Vec<ClusterCell>, cap: usize) {
    cells.sort_by(|a, b| match b.count.cmp(&a.count) {
        Ordering::Equal => a.member_ids.first().cmp(&b.member_ids.first()),
        other => other,
    });
    cells.truncate(cap);
}
