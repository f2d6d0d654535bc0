//! # Hierarchical Index
//!
//! Three-level nesting of ordered maps:
//!
//! ```text
//! Region (region_chunks × region_chunks chunks)
//!   └── Chunk (chunk_tiles × chunk_tiles tiles)
//!         └── Tile (items, insertion order)
//! ```
//!
//! `chunk = tile.div_euclid(chunk_tiles)`, `region = chunk.div_euclid(region_chunks)`.
//! Queries only descend into regions and chunks that overlap the box. A level
//! that loses its last member is removed on the spot.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use super::{
    tile_size_or_default, Rect, SpatialIndex, TileCoord, DEFAULT_CHUNK_TILES,
    DEFAULT_REGION_CHUNKS, DEFAULT_TILE_SIZE,
};

type Cell = (i32, i32);

#[derive(Clone, Debug)]
struct Chunk<K> {
    tiles: BTreeMap<Cell, Vec<(K, [f64; 2])>>,
}

#[derive(Clone, Debug)]
struct Region<K> {
    chunks: BTreeMap<Cell, Chunk<K>>,
}

/// Where an item is filed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Address {
    region: Cell,
    chunk: Cell,
    tile: Cell,
}

/// Region → chunk → tile spatial index.
#[derive(Clone, Debug)]
pub struct HierarchicalIndex<K> {
    tile_size: f64,
    chunk_tiles: i32,
    region_chunks: i32,
    regions: BTreeMap<Cell, Region<K>>,
    locations: HashMap<K, Address>,
    tiles: usize,
}

#[inline]
fn clamp_factor(value: u32, fallback: u32) -> i32 {
    let value = if value == 0 {
        tracing::warn!(fallback, "zero nesting factor");
        fallback
    } else {
        value
    };
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[inline]
fn parent(cell: Cell, factor: i32) -> Cell {
    (cell.0.div_euclid(factor), cell.1.div_euclid(factor))
}

#[inline]
fn cell_in(cell: Cell, lo: Cell, hi: Cell) -> bool {
    cell.0 >= lo.0 && cell.0 <= hi.0 && cell.1 >= lo.1 && cell.1 <= hi.1
}

impl<K> HierarchicalIndex<K>
where
    K: Copy + Eq + Hash,
{
    /// Creates an empty index. Zero factors fall back to the defaults.
    #[must_use]
    pub fn new(tile_size: f64, chunk_tiles: u32, region_chunks: u32) -> Self {
        Self {
            tile_size: tile_size_or_default(tile_size),
            chunk_tiles: clamp_factor(chunk_tiles, DEFAULT_CHUNK_TILES),
            region_chunks: clamp_factor(region_chunks, DEFAULT_REGION_CHUNKS),
            regions: BTreeMap::new(),
            locations: HashMap::new(),
            tiles: 0,
        }
    }

    /// Number of non-empty regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Number of non-empty chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.regions.values().map(|region| region.chunks.len()).sum()
    }

    fn address(&self, position: [f64; 2]) -> Address {
        let coord = TileCoord::from_position(position, self.tile_size);
        let tile = (coord.x, coord.y);
        let chunk = parent(tile, self.chunk_tiles);
        let region = parent(chunk, self.region_chunks);
        Address { region, chunk, tile }
    }

    fn detach(&mut self, item: &K) -> Option<Address> {
        let address = self.locations.remove(item)?;
        let Some(region) = self.regions.get_mut(&address.region) else {
            return Some(address);
        };
        if let Some(chunk) = region.chunks.get_mut(&address.chunk) {
            if let Some(members) = chunk.tiles.get_mut(&address.tile) {
                members.retain(|(member, _)| member != item);
                if members.is_empty() {
                    chunk.tiles.remove(&address.tile);
                    self.tiles -= 1;
                }
            }
            if chunk.tiles.is_empty() {
                region.chunks.remove(&address.chunk);
            }
        }
        if region.chunks.is_empty() {
            self.regions.remove(&address.region);
        }
        Some(address)
    }

    fn attach(&mut self, item: K, position: [f64; 2]) -> Address {
        let address = self.address(position);
        let members = self
            .regions
            .entry(address.region)
            .or_insert_with(|| Region { chunks: BTreeMap::new() })
            .chunks
            .entry(address.chunk)
            .or_insert_with(|| Chunk { tiles: BTreeMap::new() })
            .tiles
            .entry(address.tile)
            .or_default();
        if members.is_empty() {
            self.tiles += 1;
        }
        members.push((item, position));
        self.locations.insert(item, address);
        address
    }

    fn query(&self, rect: &Rect) -> Vec<K> {
        let lo = self.address(rect.min);
        let hi = self.address(rect.max);

        let mut out = Vec::new();
        for (cell, region) in &self.regions {
            if !cell_in(*cell, lo.region, hi.region) {
                continue;
            }
            for (cell, chunk) in &region.chunks {
                if !cell_in(*cell, lo.chunk, hi.chunk) {
                    continue;
                }
                for (cell, members) in &chunk.tiles {
                    if !cell_in(*cell, lo.tile, hi.tile) {
                        continue;
                    }
                    out.extend(
                        members
                            .iter()
                            .filter(|(_, position)| rect.contains(*position))
                            .map(|(item, _)| *item),
                    );
                }
            }
        }
        out
    }

    fn members(&self, address: &Address) -> Option<&Vec<(K, [f64; 2])>> {
        self.regions
            .get(&address.region)?
            .chunks
            .get(&address.chunk)?
            .tiles
            .get(&address.tile)
    }
}

impl<K> Default for HierarchicalIndex<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new(DEFAULT_TILE_SIZE, DEFAULT_CHUNK_TILES, DEFAULT_REGION_CHUNKS)
    }
}

impl<K> SpatialIndex<K> for HierarchicalIndex<K>
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
        before.map(|address| address.tile) != Some(after.tile)
    }

    fn within(&self, corner_a: [f64; 2], corner_b: [f64; 2]) -> Vec<K> {
        self.query(&Rect::from_corners(corner_a, corner_b))
    }

    fn at(&self, point: [f64; 2], tolerance: f64) -> Vec<K> {
        self.query(&Rect::around(point, tolerance))
    }

    fn all(&self) -> Vec<K> {
        self.regions
            .values()
            .flat_map(|region| region.chunks.values())
            .flat_map(|chunk| chunk.tiles.values())
            .flat_map(|members| members.iter().map(|(item, _)| *item))
            .collect()
    }

    fn contains(&self, item: &K) -> bool {
        self.locations.contains_key(item)
    }

    fn position_of(&self, item: &K) -> Option<[f64; 2]> {
        let address = self.locations.get(item)?;
        self.members(address)?
            .iter()
            .find(|(member, _)| member == item)
            .map(|(_, position)| *position)
    }

    fn len(&self) -> usize {
        self.locations.len()
    }

    fn tile_count(&self) -> usize {
        self.tiles
    }
}
