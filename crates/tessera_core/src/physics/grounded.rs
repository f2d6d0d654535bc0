//! # Grounded Bodies
//!
//! Two-dimensional bodies bound to the tile plane. Heavy friction (a body
//! stops almost as soon as nothing pushes it) and rotation snapped to the
//! four facings.

use super::body::{snap_rotation, PhysicalBody};
use super::state::{BodyKind, BodyState, ForceState};
use super::Physical;

/// Default friction for grounded bodies.
pub const GROUNDED_FRICTION: f64 = 1.0;

/// Default size of a grounded body, in world units.
pub const GROUNDED_SIZE: f64 = 1.0;

/// Two-dimensional body with four-direction facing.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundedBody {
    core: PhysicalBody<2>,
    size: f64,
}

impl GroundedBody {
    /// Creates a grounded body at rest at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: PhysicalBody::new(GROUNDED_FRICTION),
            size: GROUNDED_SIZE,
        }
    }

    /// Creates a grounded body at `position`.
    #[must_use]
    pub fn at(position: [f64; 2]) -> Self {
        let mut body = Self::new();
        body.core.set_position(&position);
        body
    }

    /// Typed access to the kinematic state.
    #[inline]
    #[must_use]
    pub const fn core(&self) -> &PhysicalBody<2> {
        &self.core
    }

    /// Sets the acceleration directly.
    pub fn set_acceleration(&mut self, input: &[f64]) {
        self.core.set_acceleration(input);
    }

    /// Sets friction as the fraction of velocity kept per tick.
    pub fn set_friction_retention(&mut self, retention: f64) -> f64 {
        self.core.set_friction_retention(retention)
    }
}

impl Default for GroundedBody {
    fn default() -> Self {
        Self::new()
    }
}

impl Physical for GroundedBody {
    fn kind(&self) -> BodyKind {
        BodyKind::Grounded
    }

    fn tick(&mut self) {
        self.core.integrate();
    }

    fn position(&self) -> &[f64] {
        self.core.position().as_slice()
    }

    fn planar_position(&self) -> [f64; 2] {
        self.core.position().to_array()
    }

    fn set_position(&mut self, input: &[f64]) {
        self.core.set_position(input);
    }

    fn velocity(&self) -> &[f64] {
        self.core.velocity().as_slice()
    }

    fn set_velocity(&mut self, input: &[f64]) {
        self.core.set_velocity(input);
    }

    fn add_force(&mut self, input: &[f64], duration: i64) {
        self.core.add_force(input, duration);
    }

    fn forces(&self) -> Vec<ForceState> {
        self.core.force_states()
    }

    fn mass(&self) -> f64 {
        self.core.mass()
    }

    fn set_mass(&mut self, mass: f64) -> f64 {
        self.core.set_mass(mass)
    }

    fn friction(&self) -> f64 {
        self.core.friction()
    }

    fn set_friction(&mut self, friction: f64) -> f64 {
        self.core.set_friction(friction)
    }

    fn rotation(&self) -> f64 {
        self.core.rotation()
    }

    /// Snaps to the nearest quarter turn before storing.
    fn set_rotation(&mut self, rotation: f64) -> f64 {
        self.core.set_rotation(snap_rotation(rotation))
    }

    fn size(&self) -> f64 {
        self.size
    }

    fn set_size(&mut self, size: f64) -> f64 {
        if size.is_finite() {
            self.size = size.max(0.0);
        }
        self.size
    }

    fn raw(&self) -> BodyState {
        BodyState {
            kind: BodyKind::Grounded,
            position: self.core.position().as_slice().to_vec(),
            velocity: self.core.velocity().as_slice().to_vec(),
            acceleration: self.core.acceleration().as_slice().to_vec(),
            forces: self.core.force_states(),
            mass: self.core.mass(),
            friction: self.core.friction(),
            rotation: self.core.rotation(),
            size: self.size,
            gravity: None,
        }
    }
}
