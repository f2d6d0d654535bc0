//! # Kinematic State
//!
//! The dimension-generic half of every body: position, velocity,
//! acceleration, timed forces, mass, friction and rotation, plus the
//! per-tick integration step shared by both specialisations.

use crate::vector::Vector;

use super::state::ForceState;

/// Rotation is stored in a fixed-point angular unit in `[0, ROTATION_RANGE)`.
pub const ROTATION_RANGE: f64 = 400.0;

/// Velocity components slower than this are snapped to zero by friction.
pub const REST_THRESHOLD: f64 = 0.01;

/// Normalises a rotation into `[0, ROTATION_RANGE)`. Non-finite input is 0.
#[inline]
#[must_use]
pub fn rectify_rotation(rotation: f64) -> f64 {
    if !rotation.is_finite() {
        return 0.0;
    }
    let rectified = rotation.rem_euclid(ROTATION_RANGE);
    // rem_euclid can round up to the range itself for tiny negatives.
    if rectified >= ROTATION_RANGE {
        0.0
    } else {
        rectified
    }
}

/// Snaps a rotation to the nearest quarter turn (0, 100, 200 or 300).
#[inline]
#[must_use]
pub fn snap_rotation(rotation: f64) -> f64 {
    let quarter = ROTATION_RANGE / 4.0;
    let nearest = (rectify_rotation(rotation) / quarter).round() * quarter;
    nearest % ROTATION_RANGE
}

/// Sign of `x` as -1, 0 or 1 (zero has no sign here, unlike `f64::signum`).
#[inline]
fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Change friction applies to a single velocity component.
///
/// Returns `-v` (a full stop) when the resistance would carry the component
/// past zero or the component is already below [`REST_THRESHOLD`].
#[inline]
#[must_use]
pub fn resist(v: f64, friction: f64) -> f64 {
    let resistance = v * -friction;
    if sign(v + resistance) != sign(v) || v.abs() < REST_THRESHOLD {
        return -v;
    }
    resistance
}

/// Clamps untrusted scalars to a finite, non-negative value.
#[inline]
fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// A force acting on a body for a number of ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Force<const N: usize> {
    /// Force vector.
    pub vector: Vector<N>,
    /// Ticks left before removal. Zero means "apply once".
    pub remaining: i64,
}

/// Kinematic state of an `N`-dimensional body.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicalBody<const N: usize> {
    position: Vector<N>,
    velocity: Vector<N>,
    acceleration: Vector<N>,
    forces: Vec<Force<N>>,
    mass: f64,
    inverse_mass: f64,
    friction: f64,
    rotation: f64,
}

impl<const N: usize> PhysicalBody<N> {
    /// Creates a body at rest at the origin with unit mass.
    #[must_use]
    pub fn new(friction: f64) -> Self {
        Self {
            position: Vector::ZERO,
            velocity: Vector::ZERO,
            acceleration: Vector::ZERO,
            forces: Vec::new(),
            mass: 1.0,
            inverse_mass: 1.0,
            friction: non_negative(friction),
            rotation: 0.0,
        }
    }

    /// Current position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> &Vector<N> {
        &self.position
    }

    /// Sets the position. Malformed input becomes the zero vector.
    pub fn set_position(&mut self, input: &[f64]) -> &Vector<N> {
        self.position = Vector::sanitize(input);
        &self.position
    }

    /// Current velocity.
    #[inline]
    #[must_use]
    pub const fn velocity(&self) -> &Vector<N> {
        &self.velocity
    }

    /// Sets the velocity. Malformed input becomes the zero vector.
    pub fn set_velocity(&mut self, input: &[f64]) -> &Vector<N> {
        self.velocity = Vector::sanitize(input);
        &self.velocity
    }

    /// Current (not yet applied) acceleration.
    #[inline]
    #[must_use]
    pub const fn acceleration(&self) -> &Vector<N> {
        &self.acceleration
    }

    /// Sets the acceleration. Malformed input becomes the zero vector.
    pub fn set_acceleration(&mut self, input: &[f64]) -> &Vector<N> {
        self.acceleration = Vector::sanitize(input);
        &self.acceleration
    }

    /// Mass of the body.
    #[inline]
    #[must_use]
    pub const fn mass(&self) -> f64 {
        self.mass
    }

    /// Sets the mass, clamped to `>= 0`, and recomputes the inverse mass.
    ///
    /// A massless body gets an inverse mass of zero: forces do not move it.
    pub fn set_mass(&mut self, mass: f64) -> f64 {
        self.mass = non_negative(mass);
        self.inverse_mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };
        self.mass
    }

    /// Friction coefficient.
    #[inline]
    #[must_use]
    pub const fn friction(&self) -> f64 {
        self.friction
    }

    /// Sets the friction coefficient, clamped to `>= 0`.
    pub fn set_friction(&mut self, friction: f64) -> f64 {
        self.friction = non_negative(friction);
        self.friction
    }

    /// Sets friction as the fraction of velocity kept per tick.
    pub fn set_friction_retention(&mut self, retention: f64) -> f64 {
        let retention = if retention.is_finite() { retention } else { 1.0 };
        self.set_friction(1.0 - retention)
    }

    /// Rotation in `[0, 400)`.
    #[inline]
    #[must_use]
    pub const fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Sets the rotation, normalised into `[0, 400)`.
    pub fn set_rotation(&mut self, rotation: f64) -> f64 {
        self.rotation = rectify_rotation(rotation);
        self.rotation
    }

    /// Adds a force lasting `duration` ticks (0 = apply once).
    ///
    /// Components beyond the body's dimensionality are ignored.
    pub fn add_force(&mut self, input: &[f64], duration: i64) {
        self.forces.push(Force {
            vector: Vector::project(input),
            remaining: duration,
        });
    }

    /// Active forces in insertion order.
    #[inline]
    #[must_use]
    pub fn forces(&self) -> &[Force<N>] {
        &self.forces
    }

    /// Accumulates every active force into acceleration and ages them.
    pub fn apply_forces(&mut self) {
        let inverse_mass = self.inverse_mass;
        let mut acceleration = self.acceleration;
        self.forces.retain_mut(|force| {
            acceleration += force.vector * inverse_mass;
            force.remaining -= 1;
            force.remaining > 0
        });
        self.acceleration = acceleration;
    }

    /// Folds acceleration into velocity and clears it.
    pub fn apply_acceleration(&mut self) {
        self.velocity += self.acceleration;
        self.acceleration = Vector::ZERO;
    }

    /// Moves the body by its velocity.
    pub fn apply_velocity(&mut self) {
        self.position += self.velocity;
    }

    /// Slows every velocity component, snapping to rest near zero.
    pub fn apply_friction(&mut self) {
        let friction = self.friction;
        self.velocity = self.velocity.map(|v| v + resist(v, friction));
    }

    /// One integration step: forces, acceleration, velocity, friction.
    pub fn integrate(&mut self) {
        self.apply_forces();
        self.apply_acceleration();
        self.apply_velocity();
        self.apply_friction();
    }

    /// Resets position, velocity and acceleration to zero.
    pub fn reset_motion(&mut self) {
        self.position = Vector::ZERO;
        self.velocity = Vector::ZERO;
        self.acceleration = Vector::ZERO;
    }

    /// Serialisable snapshot of the active forces.
    #[must_use]
    pub fn force_states(&self) -> Vec<ForceState> {
        self.forces
            .iter()
            .map(|force| ForceState {
                vector: force.vector.as_slice().to_vec(),
                remaining: force.remaining,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tick_force() {
        let mut body = PhysicalBody::<2>::new(0.0);
        body.set_mass(2.0);
        body.add_force(&[4.0, 0.0], 1);

        body.integrate();

        assert_eq!(body.velocity().to_array(), [2.0, 0.0]);
        assert_eq!(body.position().to_array(), [2.0, 0.0]);
        assert!(body.forces().is_empty());
        assert!(body.acceleration().is_zero());
    }

    #[test]
    fn test_force_lifetime() {
        let mut body = PhysicalBody::<2>::new(0.0);
        body.add_force(&[1.0, 0.0], 3);
        body.add_force(&[0.0, 1.0], 0);

        body.apply_forces();
        assert_eq!(body.forces().len(), 1);
        assert_eq!(body.forces()[0].remaining, 2);
        assert_eq!(body.acceleration().to_array(), [1.0, 1.0]);

        body.apply_forces();
        body.apply_forces();
        assert!(body.forces().is_empty());
        assert_eq!(body.acceleration().to_array(), [3.0, 1.0]);
    }

    #[test]
    fn test_friction_snaps_to_zero() {
        let mut body = PhysicalBody::<2>::new(1.0);
        body.set_velocity(&[0.005, 0.0]);
        body.integrate();
        assert_eq!(body.velocity().to_array(), [0.0, 0.0]);
    }

    #[test]
    fn test_friction_partial() {
        let mut body = PhysicalBody::<2>::new(0.5);
        body.set_velocity(&[4.0, -2.0]);
        body.apply_friction();
        assert_eq!(body.velocity().to_array(), [2.0, -1.0]);
    }

    #[test]
    fn test_overshoot_snaps_to_zero() {
        let mut body = PhysicalBody::<2>::new(1.5);
        body.set_velocity(&[3.0, -3.0]);
        body.apply_friction();
        assert_eq!(body.velocity().to_array(), [0.0, 0.0]);
    }

    #[test]
    fn test_mass_clamped() {
        let mut body = PhysicalBody::<3>::new(0.0);
        assert_eq!(body.set_mass(-4.0), 0.0);
        body.add_force(&[10.0, 0.0, 0.0], 1);
        body.integrate();
        assert!(body.velocity().is_zero());

        assert_eq!(body.set_mass(f64::NAN), 0.0);
        assert_eq!(body.set_mass(4.0), 4.0);
    }

    #[test]
    fn test_rotation_normalised() {
        let mut body = PhysicalBody::<2>::new(1.0);
        assert_eq!(body.set_rotation(450.0), 50.0);
        assert_eq!(body.set_rotation(-50.0), 350.0);
        assert_eq!(body.set_rotation(f64::INFINITY), 0.0);
        assert!((0.0..ROTATION_RANGE).contains(&body.set_rotation(-1e-18)));
    }

    #[test]
    fn test_snap_rotation() {
        assert_eq!(snap_rotation(49.0), 0.0);
        assert_eq!(snap_rotation(51.0), 100.0);
        assert_eq!(snap_rotation(360.0), 0.0);
        assert_eq!(snap_rotation(-90.0), 300.0);
    }

    #[test]
    fn test_malformed_setters_zero() {
        let mut body = PhysicalBody::<2>::new(1.0);
        body.set_position(&[3.0, 4.0]);
        body.set_position(&[1.0]);
        assert!(body.position().is_zero());
        body.set_velocity(&[f64::NAN, 0.0]);
        assert!(body.velocity().is_zero());
    }

    #[test]
    fn test_friction_retention() {
        let mut body = PhysicalBody::<2>::new(0.0);
        assert!((body.set_friction_retention(0.75) - 0.25).abs() < f64::EPSILON);
        assert_eq!(body.set_friction_retention(2.0), 0.0);
    }
}
