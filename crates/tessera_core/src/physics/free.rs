//! # Free Bodies
//!
//! Three-dimensional bodies that fly above the tile plane. Gravity is
//! injected as a one-tick downward force before every integration step and
//! friction is light.

use super::body::PhysicalBody;
use super::state::{BodyKind, BodyState, ForceState};
use super::Physical;

/// Default friction for free bodies.
pub const FREE_FRICTION: f64 = 0.01;

/// Default size of a free body, in world units.
pub const FREE_SIZE: f64 = 10.0;

/// Default gravity magnitude (world units per tick squared).
pub const DEFAULT_GRAVITY: f64 = 0.1;

/// Three-dimensional body with gravity.
#[derive(Clone, Debug, PartialEq)]
pub struct FreeBody {
    core: PhysicalBody<3>,
    size: f64,
    gravity: f64,
}

impl FreeBody {
    /// Creates a free body at rest at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: PhysicalBody::new(FREE_FRICTION),
            size: FREE_SIZE,
            gravity: DEFAULT_GRAVITY,
        }
    }

    /// Creates a free body at `position`.
    #[must_use]
    pub fn at(position: [f64; 3]) -> Self {
        let mut body = Self::new();
        body.core.set_position(&position);
        body
    }

    /// Typed access to the kinematic state.
    #[inline]
    #[must_use]
    pub const fn core(&self) -> &PhysicalBody<3> {
        &self.core
    }

    /// Gravity magnitude.
    #[inline]
    #[must_use]
    pub const fn gravity(&self) -> f64 {
        self.gravity
    }

    /// Sets the gravity magnitude. Non-finite input disables gravity.
    pub fn set_gravity(&mut self, gravity: f64) -> f64 {
        self.gravity = if gravity.is_finite() { gravity } else { 0.0 };
        self.gravity
    }

    /// Queues this tick's gravity as a one-tick downward force.
    pub fn apply_gravity(&mut self) {
        self.core.add_force(&[0.0, 0.0, -self.gravity], 1);
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

impl Default for FreeBody {
    fn default() -> Self {
        Self::new()
    }
}

impl Physical for FreeBody {
    fn kind(&self) -> BodyKind {
        BodyKind::Free
    }

    fn tick(&mut self) {
        self.apply_gravity();
        self.core.integrate();
    }

    fn position(&self) -> &[f64] {
        self.core.position().as_slice()
    }

    fn planar_position(&self) -> [f64; 2] {
        self.core.position().planar()
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

    fn set_rotation(&mut self, rotation: f64) -> f64 {
        self.core.set_rotation(rotation)
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
            kind: BodyKind::Free,
            position: self.core.position().as_slice().to_vec(),
            velocity: self.core.velocity().as_slice().to_vec(),
            acceleration: self.core.acceleration().as_slice().to_vec(),
            forces: self.core.force_states(),
            mass: self.core.mass(),
            friction: self.core.friction(),
            rotation: self.core.rotation(),
            size: self.size,
            gravity: Some(self.gravity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravity_pulls_down() {
        let mut body = FreeBody::at([0.0, 0.0, 100.0]);
        body.set_friction(0.0);
        body.tick();
        assert!((body.velocity()[2] + DEFAULT_GRAVITY).abs() < 1e-12);
        assert!((body.position()[2] - (100.0 - DEFAULT_GRAVITY)).abs() < 1e-12);

        // The gravity force lives for exactly one tick.
        assert!(body.forces().is_empty());

        body.tick();
        assert!((body.velocity()[2] + 2.0 * DEFAULT_GRAVITY).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_not_snapped() {
        let mut body = FreeBody::new();
        assert_eq!(body.set_rotation(137.0), 137.0);
        assert_eq!(body.set_rotation(-3.0), 397.0);
    }

    #[test]
    fn test_non_finite_gravity_disabled() {
        let mut body = FreeBody::at([0.0, 0.0, 5.0]);
        assert_eq!(body.set_gravity(f64::NAN), 0.0);
        body.tick();
        assert_eq!(body.position(), &[0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_planar_position_drops_height() {
        let body = FreeBody::at([12.0, -7.0, 300.0]);
        assert_eq!(body.planar_position(), [12.0, -7.0]);
        assert_eq!(body.raw().gravity, Some(DEFAULT_GRAVITY));
    }
}
