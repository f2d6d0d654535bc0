//! # Entities
//!
//! An entity is an identity plus a tagged set of capabilities:
//!
//! ```text
//! Tag        Body           Stats  Deck  Content
//! ─────────  ─────────────  ─────  ────  ───────
//! generic    -              -      -     -
//! smart      any Body       yes    yes   -
//! tile       GroundedBody   yes    yes   -
//! fly        FreeBody       yes    yes   -
//! payload    FreeBody       -      -     yes
//! ```
//!
//! Identifiers are generational (index + generation) so a stale
//! [`EntityId`] never resolves to a recycled slot.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::physics::{Body, FreeBody, GroundedBody, Physical};

/// Unique identifier for an entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: slot index in the owning world
/// - Upper 32 bits: generation counter for detecting stale references
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("entity#null")
        } else {
            write!(f, "entity#{}v{}", self.index(), self.generation())
        }
    }
}

static NEXT_WORLD: AtomicU32 = AtomicU32::new(1);

/// Identifies a world. Entities keep it as a lookup key, never as ownership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(u32);

impl WorldId {
    /// Allocates a process-unique world id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_WORLD.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Named numeric stats. Contents are owned by game rules.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatBlock {
    values: BTreeMap<String, f64>,
}

impl StatBlock {
    /// Creates an empty stat block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `name`, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Sets `name`, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(name)
    }

    /// Stats in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Number of stats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no stats are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bounded ordered collection of card names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deck {
    capacity: usize,
    cards: Vec<String>,
}

impl Deck {
    /// Creates an empty deck holding at most `capacity` cards.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            cards: Vec::with_capacity(capacity),
        }
    }

    /// Maximum number of cards.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a card. Returns false if the deck is full.
    pub fn push(&mut self, card: impl Into<String>) -> bool {
        if self.cards.len() >= self.capacity {
            return false;
        }
        self.cards.push(card.into());
        true
    }

    /// Removes the card at `slot`.
    pub fn take(&mut self, slot: usize) -> Option<String> {
        (slot < self.cards.len()).then(|| self.cards.remove(slot))
    }

    /// Cards in order.
    #[must_use]
    pub fn cards(&self) -> &[String] {
        &self.cards
    }

    /// Number of cards held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the deck holds no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Body plus the stat and deck capabilities of an acting entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Smart<B> {
    /// Physical body.
    pub body: B,
    /// Stats.
    pub stats: StatBlock,
    /// Deck.
    pub deck: Deck,
}

impl<B> Smart<B> {
    /// Wraps a body with fresh stats and a deck of `deck_size`.
    #[must_use]
    pub fn new(body: B, deck_size: usize) -> Self {
        Self {
            body,
            stats: StatBlock::new(),
            deck: Deck::with_capacity(deck_size),
        }
    }
}

/// Typed content carried by a payload entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PayloadContent {
    /// Content type tag.
    pub content_type: String,
    /// Opaque content bytes.
    pub data: Vec<u8>,
}

/// Variant tag of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityTag {
    /// No capabilities.
    Generic,
    /// Acting entity with an arbitrary body.
    Smart,
    /// Acting entity on the tile plane.
    Tile,
    /// Acting entity in free flight.
    Fly,
    /// Inert content carrier.
    Payload,
}

impl EntityTag {
    /// String form, e.g. `"entity:tile"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "entity",
            Self::Smart => "entity:smart",
            Self::Tile => "entity:tile",
            Self::Fly => "entity:fly",
            Self::Payload => "entity:payload",
        }
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities of an entity, by variant.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
    /// No capabilities.
    Generic,
    /// Acting entity with an arbitrary body.
    Smart(Smart<Body>),
    /// Acting entity on the tile plane.
    Tile(Smart<GroundedBody>),
    /// Acting entity in free flight.
    Fly(Smart<FreeBody>),
    /// Inert content carrier.
    Payload {
        /// Physical body.
        body: FreeBody,
        /// Carried content.
        content: PayloadContent,
    },
}

impl EntityKind {
    /// Tag of this variant.
    #[must_use]
    pub const fn tag(&self) -> EntityTag {
        match self {
            Self::Generic => EntityTag::Generic,
            Self::Smart(_) => EntityTag::Smart,
            Self::Tile(_) => EntityTag::Tile,
            Self::Fly(_) => EntityTag::Fly,
            Self::Payload { .. } => EntityTag::Payload,
        }
    }
}

/// An entity: identity, owning world and capabilities.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    id: EntityId,
    world: Option<WorldId>,
    kind: EntityKind,
}

impl Entity {
    /// Wraps capabilities in an unregistered entity.
    #[must_use]
    pub const fn new(kind: EntityKind) -> Self {
        Self {
            id: EntityId::NULL,
            world: None,
            kind,
        }
    }

    /// Entity with no capabilities.
    #[must_use]
    pub const fn generic() -> Self {
        Self::new(EntityKind::Generic)
    }

    /// Acting entity around an arbitrary body.
    #[must_use]
    pub fn smart(body: impl Into<Body>, deck_size: usize) -> Self {
        Self::new(EntityKind::Smart(Smart::new(body.into(), deck_size)))
    }

    /// Tile-bound entity at `position`.
    #[must_use]
    pub fn tile(deck_size: usize, position: [f64; 2]) -> Self {
        Self::new(EntityKind::Tile(Smart::new(GroundedBody::at(position), deck_size)))
    }

    /// Free-flying entity at `position`.
    #[must_use]
    pub fn fly(deck_size: usize, position: [f64; 3]) -> Self {
        Self::new(EntityKind::Fly(Smart::new(FreeBody::at(position), deck_size)))
    }

    /// Payload entity carrying `data` of `content_type` at `position`.
    #[must_use]
    pub fn payload(content_type: impl Into<String>, data: Vec<u8>, position: [f64; 3]) -> Self {
        Self::new(EntityKind::Payload {
            body: FreeBody::at(position),
            content: PayloadContent {
                content_type: content_type.into(),
                data,
            },
        })
    }

    /// Identity assigned by the owning world. Null until registered.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Sets the identity.
    pub fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    /// World this entity is registered with.
    #[inline]
    #[must_use]
    pub const fn world(&self) -> Option<WorldId> {
        self.world
    }

    /// Sets the owning world.
    pub fn set_world(&mut self, world: Option<WorldId>) {
        self.world = world;
    }

    /// Variant tag.
    #[must_use]
    pub const fn tag(&self) -> EntityTag {
        self.kind.tag()
    }

    /// Capabilities.
    #[must_use]
    pub const fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Mutable capabilities.
    pub fn kind_mut(&mut self) -> &mut EntityKind {
        &mut self.kind
    }

    /// Physical body, if the variant has one.
    #[must_use]
    pub fn body(&self) -> Option<&dyn Physical> {
        match &self.kind {
            EntityKind::Generic => None,
            EntityKind::Smart(smart) => Some(&smart.body as &dyn Physical),
            EntityKind::Tile(smart) => Some(&smart.body as &dyn Physical),
            EntityKind::Fly(smart) => Some(&smart.body as &dyn Physical),
            EntityKind::Payload { body, .. } => Some(body as &dyn Physical),
        }
    }

    /// Mutable physical body, if the variant has one.
    pub fn body_mut(&mut self) -> Option<&mut dyn Physical> {
        match &mut self.kind {
            EntityKind::Generic => None,
            EntityKind::Smart(smart) => Some(&mut smart.body as &mut dyn Physical),
            EntityKind::Tile(smart) => Some(&mut smart.body as &mut dyn Physical),
            EntityKind::Fly(smart) => Some(&mut smart.body as &mut dyn Physical),
            EntityKind::Payload { body, .. } => Some(body as &mut dyn Physical),
        }
    }

    /// Stat block of acting entities.
    #[must_use]
    pub fn stats(&self) -> Option<&StatBlock> {
        match &self.kind {
            EntityKind::Smart(smart) => Some(&smart.stats),
            EntityKind::Tile(smart) => Some(&smart.stats),
            EntityKind::Fly(smart) => Some(&smart.stats),
            EntityKind::Generic | EntityKind::Payload { .. } => None,
        }
    }

    /// Mutable stat block of acting entities.
    pub fn stats_mut(&mut self) -> Option<&mut StatBlock> {
        match &mut self.kind {
            EntityKind::Smart(smart) => Some(&mut smart.stats),
            EntityKind::Tile(smart) => Some(&mut smart.stats),
            EntityKind::Fly(smart) => Some(&mut smart.stats),
            EntityKind::Generic | EntityKind::Payload { .. } => None,
        }
    }

    /// Deck of acting entities.
    #[must_use]
    pub fn deck(&self) -> Option<&Deck> {
        match &self.kind {
            EntityKind::Smart(smart) => Some(&smart.deck),
            EntityKind::Tile(smart) => Some(&smart.deck),
            EntityKind::Fly(smart) => Some(&smart.deck),
            EntityKind::Generic | EntityKind::Payload { .. } => None,
        }
    }

    /// Mutable deck of acting entities.
    pub fn deck_mut(&mut self) -> Option<&mut Deck> {
        match &mut self.kind {
            EntityKind::Smart(smart) => Some(&mut smart.deck),
            EntityKind::Tile(smart) => Some(&mut smart.deck),
            EntityKind::Fly(smart) => Some(&mut smart.deck),
            EntityKind::Generic | EntityKind::Payload { .. } => None,
        }
    }

    /// Carried content of payload entities.
    #[must_use]
    pub fn content(&self) -> Option<&PayloadContent> {
        match &self.kind {
            EntityKind::Payload { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Replaces the carried content. Returns the old content, or gives the
    /// new one back if this is not a payload entity.
    pub fn set_content(&mut self, new: PayloadContent) -> Result<PayloadContent, PayloadContent> {
        match &mut self.kind {
            EntityKind::Payload { content, .. } => Ok(std::mem::replace(content, new)),
            _ => Err(new),
        }
    }

    /// Position on the tile plane, if the entity has a body.
    #[must_use]
    pub fn planar_position(&self) -> Option<[f64; 2]> {
        self.body().map(Physical::planar_position)
    }
}
