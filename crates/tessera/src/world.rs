//! # World
//!
//! Owns the entities, the spatial index, the deferred command queue and the
//! event bus of one simulation.
//!
//! ## Step
//!
//! ```text
//! step()
//!   1. drain commands, oldest first (commands queued meanwhile run too)
//!   2. tick the body of every indexed entity
//!   3. steps += 1
//! ```
//!
//! The index is **not** refreshed by `step()`. Call [`World::relocate`] or
//! [`World::relocate_all`] after bodies have moved, or queries keep
//! answering from the last recorded positions.
//!
//! A world belongs to one thread of control. Other threads talk to it
//! through queued commands.

use std::collections::VecDeque;
use std::fmt;

use tessera_core::{Entity, EntityId, EntityTag, SpatialConfig, SpatialIndex, WorldId};
use tracing::{debug, trace, warn};

use crate::events::{EmitReceipt, Emission, EventBus, EventPayload, UnresolvedQueue};
use crate::tick_loop::TickHandler;

/// Deferred mutation run at the start of the next step.
pub type Command = Box<dyn FnOnce(&mut World) + Send>;

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

/// Container and stepper for one simulation.
pub struct World {
    id: WorldId,
    slots: Vec<Slot>,
    free_indices: Vec<u32>,
    alive_count: usize,
    index: Box<dyn SpatialIndex<EntityId> + Send>,
    commands: VecDeque<Command>,
    events: EventBus,
    unresolved: Option<UnresolvedQueue>,
    steps: u64,
}

impl World {
    /// Creates an empty world whose event bus parks every emission.
    #[must_use]
    pub fn new(spatial: &SpatialConfig) -> Self {
        let (events, unresolved) = EventBus::parking();
        Self::assemble(spatial, events, Some(unresolved))
    }

    /// Creates an empty world with a custom event router.
    ///
    /// Nothing is parked, so [`World::take_unresolved`] always comes back empty.
    #[must_use]
    pub fn with_router(
        spatial: &SpatialConfig,
        router: impl FnMut(&str, Emission) + Send + 'static,
    ) -> Self {
        Self::assemble(spatial, EventBus::new(router), None)
    }

    fn assemble(
        spatial: &SpatialConfig,
        events: EventBus,
        unresolved: Option<UnresolvedQueue>,
    ) -> Self {
        Self {
            id: WorldId::next(),
            slots: Vec::new(),
            free_indices: Vec::new(),
            alive_count: 0,
            index: spatial.build(),
            commands: VecDeque::new(),
            events,
            unresolved,
            steps: 0,
        }
    }

    /// Identity of this world.
    #[inline]
    #[must_use]
    pub const fn world_id(&self) -> WorldId {
        self.id
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.alive_count
    }

    /// Whether the world has no entities.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Steps taken so far.
    #[inline]
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Registers an entity and indexes it if it has a body.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let index = match self.free_indices.pop() {
            Some(index) => index,
            None => {
                let Ok(index) = u32::try_from(self.slots.len()) else {
                    warn!("entity slots exhausted");
                    return EntityId::NULL;
                };
                self.slots.push(Slot::default());
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = EntityId::new(index, slot.generation);

        entity.set_id(id);
        entity.set_world(Some(self.id));
        let position = entity.planar_position();
        let tag = entity.tag();
        slot.entity = Some(entity);
        self.alive_count += 1;

        if let Some(position) = position {
            self.index.insert(id, position);
        }
        debug!(%id, %tag, "spawned entity");
        id
    }

    /// Removes an entity and returns it. Stale ids return `None`.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slot_mut(id)?;
        let mut entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_indices.push(id.index());
        self.alive_count -= 1;
        self.index.remove(&id);

        entity.set_id(EntityId::NULL);
        entity.set_world(None);
        debug!(%id, "despawned entity");
        Some(entity)
    }

    /// Whether `id` refers to a live entity.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entity(id).is_some()
    }

    /// Live entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        if id.is_null() {
            return None;
        }
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entity.as_ref()
    }

    /// Mutable live entity by id.
    ///
    /// Moving its body does not update the index; see [`World::relocate`].
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slot_mut(id)?.entity.as_mut()
    }

    fn slot_mut(&mut self, id: EntityId) -> Option<&mut Slot> {
        if id.is_null() {
            return None;
        }
        let slot = self.slots.get_mut(id.index() as usize)?;
        (slot.generation == id.generation()).then_some(slot)
    }

    /// Live entities in slot order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().filter_map(|slot| slot.entity.as_ref())
    }

    /// Ids of live entities carrying `tag`.
    #[must_use]
    pub fn of_tag(&self, tag: EntityTag) -> Vec<EntityId> {
        self.entities()
            .filter(|entity| entity.tag() == tag)
            .map(Entity::id)
            .collect()
    }

    /// Queues a command for the start of the next step.
    pub fn queue(&mut self, command: impl FnOnce(&mut World) + Send + 'static) {
        self.commands.push_back(Box::new(command));
    }

    /// Commands waiting for the next step.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Runs queued commands, then ticks every indexed body.
    pub fn step(&mut self) {
        let mut drained = 0usize;
        while let Some(command) = self.commands.pop_front() {
            command(self);
            drained += 1;
        }

        let mut ticked = 0usize;
        for id in self.index.all() {
            if let Some(body) = self.entity_mut(id).and_then(Entity::body_mut) {
                body.tick();
                ticked += 1;
            }
        }

        self.steps += 1;
        trace!(step = self.steps, drained, ticked, "world step");
    }

    /// Re-buckets `id` at its body's current position.
    ///
    /// Returns true if the entity changed tile.
    pub fn relocate(&mut self, id: EntityId) -> bool {
        let Some(position) = self.entity(id).and_then(Entity::planar_position) else {
            return false;
        };
        self.index.relocate(id, position)
    }

    /// Re-buckets every indexed entity. Returns how many changed tile.
    pub fn relocate_all(&mut self) -> usize {
        self.index
            .all()
            .into_iter()
            .filter(|id| self.relocate(*id))
            .count()
    }

    /// Entities inside the half-open box spanned by two corners.
    #[must_use]
    pub fn within(&self, corner_a: [f64; 2], corner_b: [f64; 2]) -> Vec<EntityId> {
        self.index.within(corner_a, corner_b)
    }

    /// Entities inside the closed box around `point`.
    #[must_use]
    pub fn at(&self, point: [f64; 2], tolerance: f64) -> Vec<EntityId> {
        self.index.at(point, tolerance)
    }

    /// Every indexed entity.
    #[must_use]
    pub fn all(&self) -> Vec<EntityId> {
        self.index.all()
    }

    /// The spatial index.
    #[must_use]
    pub fn index(&self) -> &dyn SpatialIndex<EntityId> {
        self.index.as_ref()
    }

    /// Emits an event through the world's bus.
    pub fn emit(&mut self, event: &str, data: EventPayload) -> EmitReceipt {
        self.events.emit(event, data)
    }

    /// The event bus.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Whether emissions are parked for [`World::take_unresolved`].
    #[must_use]
    pub const fn parks_emissions(&self) -> bool {
        self.unresolved.is_some()
    }

    /// Takes every emission the default router has parked.
    ///
    /// Empty for worlds built with a custom router.
    pub fn take_unresolved(&mut self) -> Vec<(String, Emission)> {
        self.unresolved
            .as_ref()
            .map(|queue| std::mem::take(&mut *queue.lock()))
            .unwrap_or_default()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(&SpatialConfig::default())
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("entities", &self.alive_count)
            .field("indexed", &self.index.len())
            .field("pending_commands", &self.commands.len())
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl TickHandler for World {
    fn update(&mut self, _timestep: f64) {
        self.step();
    }
}
