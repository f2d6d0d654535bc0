//! # Spatial Index
//!
//! Maps plane positions to buckets ("tiles") of items for point and range
//! queries.
//!
//! Two interchangeable strategies implement [`SpatialIndex`]:
//!
//! - [`TileIndex`]: a sparse ordered map of tiles keyed by z-order
//!   [`TileKey`]s. This is the default.
//! - [`HierarchicalIndex`]: the older region → chunk → tile nesting.
//!
//! ## Staleness
//!
//! An index records the position an item had when it was inserted or last
//! relocated. Moving an item without calling [`SpatialIndex::relocate`]
//! leaves it in its old tile, and queries keep answering from the recorded
//! position. Keeping the index fresh is the caller's job.
//!
//! ## Bounds
//!
//! Range queries ([`SpatialIndex::within`]) use the half-open box
//! `[min, max)`. Point queries ([`SpatialIndex::at`]) use the closed box
//! `[p - t, p + t]`, so a zero-tolerance query finds an item exactly at `p`.

mod hierarchy;
mod tile_index;
mod zorder;

use std::hash::Hash;

use serde::{Deserialize, Serialize};

pub use hierarchy::HierarchicalIndex;
pub use tile_index::TileIndex;
pub use zorder::{unzigzag, zigzag, TileCoord, TileKey};

/// Default tile edge length, in world units.
pub const DEFAULT_TILE_SIZE: f64 = 100.0;

/// Default number of tiles along a chunk edge (hierarchical strategy).
pub const DEFAULT_CHUNK_TILES: u32 = 5;

/// Default number of chunks along a region edge (hierarchical strategy).
pub const DEFAULT_REGION_CHUNKS: u32 = 20;

/// How a query box treats its upper edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edges {
    /// `min <= p < max` on every axis.
    HalfOpen,
    /// `min <= p <= max` on every axis.
    Closed,
}

/// Axis-aligned query box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Lower corner.
    pub min: [f64; 2],
    /// Upper corner.
    pub max: [f64; 2],
    /// Upper edge handling.
    pub edges: Edges,
}

impl Rect {
    /// Half-open box between two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: [f64; 2], b: [f64; 2]) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1])],
            max: [a[0].max(b[0]), a[1].max(b[1])],
            edges: Edges::HalfOpen,
        }
    }

    /// Closed box of half-width `tolerance` centred on `point`.
    ///
    /// Negative or non-finite tolerance is treated as 0.
    #[must_use]
    pub fn around(point: [f64; 2], tolerance: f64) -> Self {
        let t = if tolerance.is_finite() { tolerance.max(0.0) } else { 0.0 };
        Self {
            min: [point[0] - t, point[1] - t],
            max: [point[0] + t, point[1] + t],
            edges: Edges::Closed,
        }
    }

    /// Whether `p` lies inside the box.
    #[inline]
    #[must_use]
    pub fn contains(&self, p: [f64; 2]) -> bool {
        let lower = p[0] >= self.min[0] && p[1] >= self.min[1];
        match self.edges {
            Edges::HalfOpen => lower && p[0] < self.max[0] && p[1] < self.max[1],
            Edges::Closed => lower && p[0] <= self.max[0] && p[1] <= self.max[1],
        }
    }

    /// Inclusive range of tiles the box overlaps.
    #[must_use]
    pub fn tile_span(&self, tile_size: f64) -> (TileCoord, TileCoord) {
        (
            TileCoord::from_position(self.min, tile_size),
            TileCoord::from_position(self.max, tile_size),
        )
    }
}

/// Selects the index implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStrategy {
    /// Flat z-order keyed tiles.
    #[default]
    Curve,
    /// Region → chunk → tile nesting.
    Hierarchical,
}

/// Spatial index configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Tile edge length in world units.
    pub tile_size: f64,
    /// Index implementation.
    pub strategy: IndexStrategy,
    /// Tiles per chunk edge (hierarchical only).
    pub chunk_tiles: u32,
    /// Chunks per region edge (hierarchical only).
    pub region_chunks: u32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            strategy: IndexStrategy::Curve,
            chunk_tiles: DEFAULT_CHUNK_TILES,
            region_chunks: DEFAULT_REGION_CHUNKS,
        }
    }
}

impl SpatialConfig {
    /// Builds the configured index.
    #[must_use]
    pub fn build<K>(&self) -> Box<dyn SpatialIndex<K> + Send>
    where
        K: Copy + Eq + Hash + Send + 'static,
    {
        match self.strategy {
            IndexStrategy::Curve => Box::new(TileIndex::<K>::new(self.tile_size)),
            IndexStrategy::Hierarchical => Box::new(HierarchicalIndex::<K>::new(
                self.tile_size,
                self.chunk_tiles,
                self.region_chunks,
            )),
        }
    }
}

/// Sanitises a tile size, falling back to [`DEFAULT_TILE_SIZE`].
#[inline]
pub(crate) fn tile_size_or_default(tile_size: f64) -> f64 {
    if tile_size.is_finite() && tile_size > 0.0 {
        tile_size
    } else {
        tracing::warn!(tile_size, fallback = DEFAULT_TILE_SIZE, "invalid tile size");
        DEFAULT_TILE_SIZE
    }
}

/// Positional index over items of type `K`.
///
/// Every item lives in exactly one tile, or in none if it was never
/// inserted. Tiles with no members are dropped immediately.
pub trait SpatialIndex<K> {
    /// Indexes `item` at `position`.
    ///
    /// An item that is already indexed is moved instead. Returns true if the
    /// item was not indexed before.
    fn insert(&mut self, item: K, position: [f64; 2]) -> bool;

    /// Removes `item`. Returns false if it was not indexed.
    fn remove(&mut self, item: &K) -> bool;

    /// Re-buckets `item` at its new position.
    ///
    /// Equivalent to `remove` followed by `insert`. Returns true if the item
    /// changed tile.
    fn relocate(&mut self, item: K, position: [f64; 2]) -> bool;

    /// Items inside the half-open box spanned by two corners.
    ///
    /// Results are grouped by tile, and within a tile come in insertion
    /// order. The order is not stable across relocations.
    fn within(&self, corner_a: [f64; 2], corner_b: [f64; 2]) -> Vec<K>;

    /// Items inside the closed box `[point - tolerance, point + tolerance]`.
    fn at(&self, point: [f64; 2], tolerance: f64) -> Vec<K>;

    /// Every indexed item.
    fn all(&self) -> Vec<K>;

    /// Whether `item` is indexed.
    fn contains(&self, item: &K) -> bool;

    /// Position recorded for `item`.
    fn position_of(&self, item: &K) -> Option<[f64; 2]>;

    /// Number of indexed items.
    fn len(&self) -> usize;

    /// Number of non-empty tiles.
    fn tile_count(&self) -> usize;

    /// Whether nothing is indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `item` is inside the half-open box spanned by two corners.
    fn is_within(&self, item: &K, corner_a: [f64; 2], corner_b: [f64; 2]) -> bool {
        self.position_of(item)
            .is_some_and(|p| Rect::from_corners(corner_a, corner_b).contains(p))
    }

    /// Whether `item` is inside the closed box around `point`.
    fn is_at(&self, item: &K, point: [f64; 2], tolerance: f64) -> bool {
        self.position_of(item)
            .is_some_and(|p| Rect::around(point, tolerance).contains(p))
    }
}
