//! # Tile Index
//!
//! Sparse flat index: `TileKey -> Tile`, kept in a `BTreeMap` so iteration
//! follows the z-order curve.
//!
//! ```text
//! position ──floor(p / tile_size)──▶ TileCoord ──zigzag+interleave──▶ TileKey
//!                                                                       │
//!   locations: item -> TileKey                         tiles: TileKey -> Tile
//! ```
//!
//! Range queries either enumerate the covered tile coordinates or, when the
//! box spans more tiles than are stored, scan the stored tiles instead.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use super::{tile_size_or_default, Rect, SpatialIndex, TileCoord, TileKey};

/// Members of a single tile, in insertion order.
#[derive(Clone, Debug)]
struct Tile<K> {
    coord: TileCoord,
    members: Vec<(K, [f64; 2])>,
}

impl<K: PartialEq> Tile<K> {
    fn new(coord: TileCoord) -> Self {
        Self {
            coord,
            members: Vec::new(),
        }
    }

    fn remove(&mut self, item: &K) -> Option<[f64; 2]> {
        let slot = self.members.iter().position(|(member, _)| member == item)?;
        Some(self.members.remove(slot).1)
    }
}

/// Flat, z-order keyed spatial index.
#[derive(Clone, Debug)]
pub struct TileIndex<K> {
    tile_size: f64,
    tiles: BTreeMap<TileKey, Tile<K>>,
    locations: HashMap<K, TileKey>,
}

impl<K> TileIndex<K>
where
    K: Copy + Eq + Hash,
{
    /// Creates an empty index.
    ///
    /// A non-positive or non-finite tile size falls back to
    /// [`DEFAULT_TILE_SIZE`](super::DEFAULT_TILE_SIZE).
    #[must_use]
    pub fn new(tile_size: f64) -> Self {
        Self {
            tile_size: tile_size_or_default(tile_size),
            tiles: BTreeMap::new(),
            locations: HashMap::new(),
        }
    }

    /// Tile edge length.
    #[inline]
    #[must_use]
    pub const fn tile_size(&self) -> f64 {
        self.tile_size
    }

    /// Key of the tile `item` is recorded in.
    #[must_use]
    pub fn tile_of(&self, item: &K) -> Option<TileKey> {
        self.locations.get(item).copied()
    }

    /// Members of the tile at `coord`, in insertion order.
    #[must_use]
    pub fn tile_members(&self, coord: TileCoord) -> Vec<K> {
        self.tiles
            .get(&TileKey::encode(coord))
            .map(|tile| tile.members.iter().map(|(item, _)| *item).collect())
            .unwrap_or_default()
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.locations.clear();
    }

    fn detach(&mut self, item: &K) -> Option<TileKey> {
        let key = self.locations.remove(item)?;
        if let Some(tile) = self.tiles.get_mut(&key) {
            tile.remove(item);
            if tile.members.is_empty() {
                self.tiles.remove(&key);
            }
        }
        Some(key)
    }

    fn attach(&mut self, item: K, position: [f64; 2]) -> TileKey {
        let coord = TileCoord::from_position(position, self.tile_size);
        let key = TileKey::encode(coord);
        self.tiles
            .entry(key)
            .or_insert_with(|| Tile::new(coord))
            .members
            .push((item, position));
        self.locations.insert(item, key);
        key
    }

    fn query(&self, rect: &Rect) -> Vec<K> {
        let (lo, hi) = rect.tile_span(self.tile_size);
        // Both widths fit in i64; their product may not.
        let span = (i64::from(hi.x) - i64::from(lo.x) + 1)
            .checked_mul(i64::from(hi.y) - i64::from(lo.y) + 1);
        let in_span = |coord: TileCoord| {
            coord.x >= lo.x && coord.x <= hi.x && coord.y >= lo.y && coord.y <= hi.y
        };

        let mut out = Vec::new();
        let mut collect = |tile: &Tile<K>| {
            out.extend(
                tile.members
                    .iter()
                    .filter(|(_, position)| rect.contains(*position))
                    .map(|(item, _)| *item),
            );
        };

        #[allow(clippy::cast_possible_wrap)]
        let stored = self.tiles.len() as i64;
        if span.map_or(true, |span| span > stored) {
            self.tiles
                .values()
                .filter(|tile| in_span(tile.coord))
                .for_each(&mut collect);
        } else {
            let mut keys: Vec<TileKey> = (lo.x..=hi.x)
                .flat_map(|x| (lo.y..=hi.y).map(move |y| TileKey::encode(TileCoord::new(x, y))))
                .filter(|key| self.tiles.contains_key(key))
                .collect();
            keys.sort_unstable();
            for key in keys {
                if let Some(tile) = self.tiles.get(&key) {
                    collect(tile);
                }
            }
        }
        out
    }
}

impl<K> Default for TileIndex<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new(super::DEFAULT_TILE_SIZE)
    }
}

impl<K> SpatialIndex<K> for TileIndex<K>
where
    K: Copy + Eq + Hash,
{
    fn insert(&mut self, item: K, position: [f64; 2]) -> bool {
        let fresh = self.detach(&item).is_none();
        self.attach(item, position);
        fresh
    }

    fn remove(&mut self, item: &K) -> bool {
        self.detach(item).is_some()
    }

    fn relocate(&mut self, item: K, position: [f64; 2]) -> bool {
        let before = self.detach(&item);
        let after = self.attach(item, position);
        before != Some(after)
    }

    fn within(&self, corner_a: [f64; 2], corner_b: [f64; 2]) -> Vec<K> {
        self.query(&Rect::from_corners(corner_a, corner_b))
    }

    fn at(&self, point: [f64; 2], tolerance: f64) -> Vec<K> {
        self.query(&Rect::around(point, tolerance))
    }

    fn all(&self) -> Vec<K> {
        self.tiles
            .values()
            .flat_map(|tile| tile.members.iter().map(|(item, _)| *item))
            .collect()
    }

    fn contains(&self, item: &K) -> bool {
        self.locations.contains_key(item)
    }

    fn position_of(&self, item: &K) -> Option<[f64; 2]> {
        let key = self.locations.get(item)?;
        self.tiles
            .get(key)?
            .members
            .iter()
            .find(|(member, _)| member == item)
            .map(|(_, position)| *position)
    }

    fn len(&self) -> usize {
        self.locations.len()
    }

    fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_insert_and_point_query() {
        let mut index = TileIndex::new(100.0);
        assert!(index.insert(1u32, [150.0, 150.0]));
        assert!(index.insert(2u32, [-30.0, 10.0]));

        assert_eq!(index.at([150.0, 150.0], 0.0), vec![1]);
        assert_eq!(index.at([-30.0, 10.0], 1.0), vec![2]);
        assert!(index.at([0.0, 0.0], 1.0).is_empty());
        assert_eq!(index.tile_of(&1), Some(TileKey::encode(TileCoord::new(1, 1))));
        assert_eq!(index.tile_of(&2), Some(TileKey::encode(TileCoord::new(-1, 0))));
    }

    #[test]
    fn test_range_is_half_open() {
        let mut index = TileIndex::new(10.0);
        index.insert('a', [0.0, 0.0]);
        index.insert('b', [10.0, 10.0]);
        index.insert('c', [5.0, 5.0]);

        let mut found = index.within([0.0, 0.0], [10.0, 10.0]);
        found.sort_unstable();
        assert_eq!(found, vec!['a', 'c']);

        // Corner order does not matter.
        let mut swapped = index.within([10.0, 10.0], [0.0, 0.0]);
        swapped.sort_unstable();
        assert_eq!(swapped, vec!['a', 'c']);
    }

    #[test]
    fn test_relocate_moves_between_tiles() {
        let mut index = TileIndex::new(100.0);
        index.insert(7u32, [10.0, 10.0]);
        assert!(index.relocate(7, [450.0, 10.0]));

        assert_eq!(index.len(), 1);
        assert_eq!(index.tile_count(), 1);
        assert!(index.tile_members(TileCoord::new(0, 0)).is_empty());
        assert_eq!(index.tile_members(TileCoord::new(4, 0)), vec![7]);
        assert_eq!(index.position_of(&7), Some([450.0, 10.0]));
    }

    #[test]
    fn test_relocate_within_tile_updates_position() {
        let mut index = TileIndex::new(100.0);
        index.insert(3u32, [10.0, 10.0]);
        assert!(!index.relocate(3, [20.0, 20.0]));
        assert_eq!(index.position_of(&3), Some([20.0, 20.0]));
        assert!(index.at([10.0, 10.0], 0.0).is_empty());
    }

    #[test]
    fn test_reinsert_moves_instead_of_duplicating() {
        let mut index = TileIndex::new(100.0);
        assert!(index.insert(1u32, [0.0, 0.0]));
        assert!(!index.insert(1u32, [500.0, 500.0]));
        assert_eq!(index.all(), vec![1]);
        assert_eq!(index.tile_count(), 1);
    }

    #[test]
    fn test_empty_tiles_are_dropped() {
        let mut index = TileIndex::new(100.0);
        index.insert(1u32, [0.0, 0.0]);
        index.insert(2u32, [50.0, 50.0]);
        assert_eq!(index.tile_count(), 1);

        assert!(index.remove(&1));
        assert_eq!(index.tile_count(), 1);
        assert!(index.remove(&2));
        assert_eq!(index.tile_count(), 0);
        assert!(index.is_empty());
        assert!(!index.remove(&2));
    }

    #[test]
    fn test_stale_position_until_relocated() {
        let mut index = TileIndex::new(100.0);
        index.insert(1u32, [0.0, 0.0]);
        // The item "moved" to 900,900 but nobody told the index.
        assert_eq!(index.at([0.0, 0.0], 0.0), vec![1]);
        assert!(index.at([900.0, 900.0], 0.0).is_empty());
        index.relocate(1, [900.0, 900.0]);
        assert_eq!(index.at([900.0, 900.0], 0.0), vec![1]);
    }

    #[test]
    fn test_tile_members_keep_insertion_order() {
        let mut index = TileIndex::new(100.0);
        for id in [5u32, 3, 9, 1] {
            index.insert(id, [f64::from(id), 1.0]);
        }
        assert_eq!(index.tile_members(TileCoord::new(0, 0)), vec![5, 3, 9, 1]);
    }

    #[test]
    fn test_huge_range_scans_stored_tiles() {
        let mut index = TileIndex::new(1.0);
        index.insert(1u32, [-1e6, -1e6]);
        index.insert(2u32, [1e6, 1e6]);
        let mut found = index.within([-1e7, -1e7], [1e7, 1e7]);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn test_saturated_span_does_not_overflow() {
        let mut index = TileIndex::new(100.0);
        index.insert(1u32, [0.0, 0.0]);
        index.insert(2u32, [-5e11, 5e11]);

        let mut found = index.within([-1e12, -1e12], [1e12, 1e12]);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);

        let mut found = index.at([0.0, 0.0], 1e12);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);

        assert_eq!(index.at([0.0, 0.0], f64::MAX).len(), 2);
    }

    #[test]
    fn test_queries_match_linear_scan() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut index = TileIndex::new(25.0);
        let mut reference = Vec::new();
        for id in 0u32..500 {
            let p = [rng.gen_range(-500.0..500.0), rng.gen_range(-500.0..500.0)];
            index.insert(id, p);
            reference.push((id, p));
        }

        for _ in 0..50 {
            let a = [rng.gen_range(-600.0..600.0), rng.gen_range(-600.0..600.0)];
            let b = [rng.gen_range(-600.0..600.0), rng.gen_range(-600.0..600.0)];
            let rect = Rect::from_corners(a, b);

            let mut expected: Vec<u32> = reference
                .iter()
                .filter(|(_, p)| rect.contains(*p))
                .map(|(id, _)| *id)
                .collect();
            let mut found = index.within(a, b);
            expected.sort_unstable();
            found.sort_unstable();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_bad_tile_size_uses_default() {
        let index: TileIndex<u32> = TileIndex::new(-5.0);
        assert_eq!(index.tile_size(), crate::spatial::DEFAULT_TILE_SIZE);
    }
}
