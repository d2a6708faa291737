//! In-process spatial index over property rows using an R-tree.
//!
//! [`PropertyIndex`] decodes each active row once at load time and keeps the
//! resulting points in an `rstar` tree keyed on `[lng, lat]`. It implements
//! both [`SpatialBackend`] and [`RowSource`], so an embedded deployment can
//! serve the indexed path and the fallback path from the same snapshot.

use crate::backend::{BackendError, BackendResult, RowSource, SpatialBackend};
use crate::cluster::ClusterCell;
use crate::codec;
use crate::compute::distance::{haversine_km, point_in_bounds, radius_envelope};
use crate::compute::grid::GridAccumulator;
use crate::query::{PropertyFilters, PropertyMatch};
use crate::record::{PropertyAttributes, PropertyRecord};
use geoquery_types::{GeoBounds, GeoPoint};
use rstar::{AABB, RTree, RTreeObject};

/// A decoded row as stored in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedProperty {
    pub id: i64,
    pub point: GeoPoint,
    pub attributes: PropertyAttributes,
}

impl RTreeObject for IndexedProperty {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.point.lng(), self.point.lat()])
    }
}

/// R-tree backed index plus the raw rows it was built from.
#[derive(Debug, Default)]
pub struct PropertyIndex {
    tree: RTree<IndexedProperty>,
    // sorted by id, ids unique
    rows: Vec<PropertyRecord>,
}

impl PropertyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load an index. Later rows win when ids repeat.
    ///
    /// Rows whose coordinates fail to decode are kept for [`RowSource`] but
    /// left out of the tree.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use geoquery::{PropertyIndex, PropertyRecord};
    ///
    /// let index = PropertyIndex::from_records(vec![
    ///     PropertyRecord::new(1, "POINT(37.6176 55.7558)", 12_000_000.0),
    ///     PropertyRecord::new(2, "not-a-point", 9_500_000.0),
    /// ]);
    /// let stats = index.stats();
    /// assert_eq!(stats.indexed, 1);
    /// assert_eq!(stats.rejected, 1);
    /// ```
    pub fn from_records(records: impl IntoIterator<Item = PropertyRecord>) -> Self {
        let mut rows: Vec<PropertyRecord> = records.into_iter().collect();
        // stable sort keeps input order among equal ids, so the last one wins
        rows.sort_by_key(|r| r.id);
        rows.reverse();
        rows.dedup_by_key(|r| r.id);
        rows.reverse();

        let indexed: Vec<IndexedProperty> = rows.iter().filter_map(Self::index_entry).collect();

        log::debug!(
            "Built property index: {} rows, {} indexed",
            rows.len(),
            indexed.len()
        );

        Self {
            tree: RTree::bulk_load(indexed),
            rows,
        }
    }

    /// Insert or replace a row.
    pub fn insert(&mut self, record: PropertyRecord) {
        self.remove(record.id);

        if let Some(entry) = Self::index_entry(&record) {
            self.tree.insert(entry);
        }
        let pos = self.rows.partition_point(|r| r.id < record.id);
        self.rows.insert(pos, record);
    }

    /// Remove a row by id, returning it if present.
    pub fn remove(&mut self, id: i64) -> Option<PropertyRecord> {
        let pos = self.rows.binary_search_by_key(&id, |r| r.id).ok()?;
        let record = self.rows.remove(pos);
        if let Some(entry) = Self::index_entry(&record) {
            self.tree.remove(&entry);
        }
        Some(record)
    }

    pub fn get(&self, id: i64) -> Option<&PropertyRecord> {
        self.rows
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|pos| &self.rows[pos])
    }

    /// Number of rows, indexed or not.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn stats(&self) -> PropertyIndexStats {
        let active = self.rows.iter().filter(|r| r.is_active).count();
        let indexed = self.tree.size();
        PropertyIndexStats {
            rows: self.rows.len(),
            active,
            indexed,
            rejected: active - indexed,
        }
    }

    fn index_entry(record: &PropertyRecord) -> Option<IndexedProperty> {
        if !record.is_active {
            return None;
        }
        match codec::decode(&record.coordinates) {
            Ok(point) => Some(IndexedProperty {
                id: record.id,
                point,
                attributes: record.attributes(),
            }),
            Err(e) => {
                log::debug!("Not indexing property {}: {}", record.id, e);
                None
            }
        }
    }

    fn envelope_of(bounds: &GeoBounds) -> AABB<[f64; 2]> {
        AABB::from_corners(
            [bounds.west(), bounds.south()],
            [bounds.east(), bounds.north()],
        )
    }

    fn in_bounds<'a>(
        &'a self,
        bounds: &'a GeoBounds,
        filters: &'a PropertyFilters,
    ) -> impl Iterator<Item = &'a IndexedProperty> + 'a {
        self.tree
            .locate_in_envelope_intersecting(&Self::envelope_of(bounds))
            .filter(move |p| point_in_bounds(&p.point, bounds) && filters.matches(&p.attributes))
    }
}

/// Counts describing an index snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyIndexStats {
    pub rows: usize,
    pub active: usize,
    pub indexed: usize,
    /// Active rows left out because their coordinates did not decode.
    pub rejected: usize,
}

impl SpatialBackend for PropertyIndex {
    async fn within_distance(
        &self,
        center: GeoPoint,
        radius_km: f64,
        filters: &PropertyFilters,
        limit: usize,
    ) -> BackendResult<Vec<PropertyMatch>> {
        let env = radius_envelope(&center, radius_km);
        let aabb = AABB::from_corners([env.west, env.south], [env.east, env.north]);

        let mut matches: Vec<PropertyMatch> = self
            .tree
            .locate_in_envelope_intersecting(&aabb)
            .filter(|p| filters.matches(&p.attributes))
            .filter_map(|p| {
                let distance = haversine_km(&center, &p.point);
                (distance <= radius_km).then(|| PropertyMatch::at_distance(p.id, distance))
            })
            .collect();

        // the caller re-sorts, but the cap has to keep the nearest ones
        matches.sort_by(|a, b| {
            a.distance_km
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
                .then(a.id.cmp(&b.id))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn within_envelope(
        &self,
        bounds: GeoBounds,
        filters: &PropertyFilters,
        limit: usize,
    ) -> BackendResult<Vec<PropertyMatch>> {
        if bounds.crosses_antimeridian() {
            return Err(BackendError::Unsupported("envelopes crossing the antimeridian"));
        }

        let mut ids: Vec<i64> = self.in_bounds(&bounds, filters).map(|p| p.id).collect();
        ids.sort_unstable();
        ids.truncate(limit);
        Ok(ids.into_iter().map(PropertyMatch::new).collect())
    }

    async fn grid_aggregate(
        &self,
        bounds: GeoBounds,
        cells_per_degree: f64,
        filters: &PropertyFilters,
    ) -> BackendResult<Vec<ClusterCell>> {
        if bounds.crosses_antimeridian() {
            return Err(BackendError::Unsupported("envelopes crossing the antimeridian"));
        }

        let mut grid = GridAccumulator::new(cells_per_degree);
        for p in self.in_bounds(&bounds, filters) {
            grid.push(p.id, p.point, p.attributes.price);
        }
        Ok(grid.finish())
    }
}

impl RowSource for PropertyIndex {
    async fn fetch_active(&self, limit: usize) -> BackendResult<Vec<PropertyRecord>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.is_active)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, lat: f64, lng: f64, price: f64) -> PropertyRecord {
        PropertyRecord::new(id, format!("POINT({} {})", lng, lat), price)
    }

    fn sample() -> PropertyIndex {
        PropertyIndex::from_records(vec![
            record(1, 55.7558, 37.6176, 100.0),
            record(2, 55.7600, 37.6200, 200.0).with_region(77),
            record(3, 55.9000, 37.9000, 300.0),
            record(4, 59.9343, 30.3351, 400.0),
            record(5, 55.7560, 37.6180, 500.0).with_active(false),
            PropertyRecord::new(6, "not-a-point", 600.0),
        ])
    }

    #[test]
    fn test_build_and_stats() {
        let index = sample();
        assert_eq!(index.len(), 6);
        assert_eq!(
            index.stats(),
            PropertyIndexStats {
                rows: 6,
                active: 5,
                indexed: 4,
                rejected: 1,
            }
        );
    }

    #[test]
    fn test_duplicate_ids_keep_last() {
        let index = PropertyIndex::from_records(vec![
            record(1, 10.0, 10.0, 1.0),
            record(1, 20.0, 20.0, 2.0),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(1).map(|r| r.price), Some(2.0));
    }

    #[test]
    fn test_insert_replaces_and_remove() {
        let mut index = sample();
        index.insert(record(1, 0.0, 0.0, 1.0));
        assert_eq!(index.len(), 6);
        assert_eq!(index.stats().indexed, 4);

        assert!(index.remove(1).is_some());
        assert!(index.remove(1).is_none());
        assert_eq!(index.stats().indexed, 3);

        index.insert(record(0, 1.0, 1.0, 1.0));
        assert_eq!(index.rows.first().map(|r| r.id), Some(0));
    }

    #[tokio::test]
    async fn test_within_distance() {
        let index = sample();
        let center = GeoPoint::new(55.7558, 37.6176).unwrap();
        let found = index
            .within_distance(center, 5.0, &PropertyFilters::new(), 10)
            .await
            .unwrap();
        let ids: Vec<i64> = found.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(found[0].distance_km, Some(0.0));

        let filtered = index
            .within_distance(center, 5.0, &PropertyFilters::new().with_region(77), 10)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 2);

        let capped = index
            .within_distance(center, 1000.0, &PropertyFilters::new(), 2)
            .await
            .unwrap();
        let ids: Vec<i64> = capped.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_within_envelope() {
        let index = sample();
        let bounds = GeoBounds::new(56.0, 55.5, 38.0, 37.0).unwrap();
        let found = index
            .within_envelope(bounds, &PropertyFilters::new(), 10)
            .await
            .unwrap();
        let ids: Vec<i64> = found.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        // edges are inclusive
        let exact = GeoBounds::new(55.9, 55.7558, 37.9, 37.6176).unwrap();
        let found = index
            .within_envelope(exact, &PropertyFilters::new(), 10)
            .await
            .unwrap();
        assert_eq!(found.len(), 3);

        let wrapping = GeoBounds::new(10.0, -10.0, -170.0, 170.0).unwrap();
        assert!(matches!(
            index
                .within_envelope(wrapping, &PropertyFilters::new(), 10)
                .await,
            Err(BackendError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_grid_aggregate() {
        let index = sample();
        let bounds = GeoBounds::new(56.0, 55.5, 38.0, 37.0).unwrap();
        let cells = index
            .grid_aggregate(bounds, 1.0, &PropertyFilters::new())
            .await
            .unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count, 3);
        assert_eq!(cells[0].avg_price, 200.0);
    }

    #[tokio::test]
    async fn test_fetch_active() {
        let index = sample();
        let rows = index.fetch_active(100).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 6]);

        assert_eq!(index.fetch_active(2).await.unwrap().len(), 2);
    }
}
