//! # Tessera Core
//!
//! Data-level building blocks of the Tessera simulation:
//! - Finite fixed-length vectors that never hold NaN or infinity
//! - Kinematic bodies and their per-tick integration step
//! - Tile-bucketed spatial indices with z-order keys
//! - Entity identities with tagged capability sets
//!
//! ## Architecture Rules
//!
//! 1. **Silent normalisation** - malformed input is replaced, never rejected
//! 2. **No runtime** - no threads, timers or channels in this crate
//! 3. **Explicit staleness** - the spatial index only moves an item when told to
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{Entity, Physical, SpatialIndex, TileIndex};
//!
//! let mut entity = Entity::tile(0, [150.0, 150.0]);
//! let mut index = TileIndex::new(100.0);
//! index.insert(1u32, [150.0, 150.0]);
//!
//! if let Some(body) = entity.body_mut() {
//!     body.set_velocity(&[100.0, 0.0]);
//!     body.tick();
//! }
//! let moved = entity.planar_position().unwrap_or_default();
//! index.relocate(1, moved);
//! assert_eq!(index.at(moved, 0.0), vec![1]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod entity;
pub mod physics;
pub mod spatial;
pub mod vector;

pub use entity::{
    Deck, Entity, EntityId, EntityKind, EntityTag, PayloadContent, Smart, StatBlock, WorldId,
};
pub use physics::{Body, BodyKind, BodyState, ForceState, FreeBody, GroundedBody, Physical};
pub use spatial::{
    HierarchicalIndex, IndexStrategy, Rect, SpatialConfig, SpatialIndex, TileCoord, TileIndex,
    TileKey,
};
pub use vector::{Vec2, Vec3, Vector};
