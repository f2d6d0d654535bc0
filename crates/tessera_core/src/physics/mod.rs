//! # Physical Bodies
//!
//! Per-entity kinematic state and the integration step.
//!
//! ## Tick Order
//!
//! ```text
//! 1. Gravity       (free bodies only: one-tick force [0, 0, -g])
//! 2. Forces        acceleration += F / mass, age and expire forces
//! 3. Acceleration  velocity += acceleration, acceleration = 0
//! 4. Velocity      position += velocity
//! 5. Friction      v += -v * friction, snapping to 0 on overshoot or |v| < 0.01
//! ```
//!
//! Setters never fail. Malformed vectors become zero vectors, negative or
//! non-finite masses become zero, rotations are folded into `[0, 400)`.

mod body;
mod free;
mod grounded;
mod state;

pub use body::{
    rectify_rotation, resist, snap_rotation, Force, PhysicalBody, REST_THRESHOLD,
    ROTATION_RANGE,
};
pub use free::{FreeBody, DEFAULT_GRAVITY, FREE_FRICTION, FREE_SIZE};
pub use grounded::{GroundedBody, GROUNDED_FRICTION, GROUNDED_SIZE};
pub use state::{BodyKind, BodyState, ForceState};

/// Operations every body specialisation exposes.
///
/// Vector arguments are untrusted slices: anything that is not exactly the
/// body's dimensionality of finite numbers is replaced by the zero vector.
pub trait Physical {
    /// Specialisation of this body.
    fn kind(&self) -> BodyKind;

    /// Advances the body by one simulation step.
    fn tick(&mut self);

    /// Current position.
    fn position(&self) -> &[f64];

    /// Position projected onto the tile plane (first two components).
    fn planar_position(&self) -> [f64; 2];

    /// Sets the position.
    fn set_position(&mut self, input: &[f64]);

    /// Current velocity.
    fn velocity(&self) -> &[f64];

    /// Sets the velocity.
    fn set_velocity(&mut self, input: &[f64]);

    /// Adds a force lasting `duration` ticks (0 = apply once).
    fn add_force(&mut self, input: &[f64], duration: i64);

    /// Snapshot of the active forces.
    fn forces(&self) -> Vec<ForceState>;

    /// Mass.
    fn mass(&self) -> f64;

    /// Sets the mass (clamped to `>= 0`). Returns the stored value.
    fn set_mass(&mut self, mass: f64) -> f64;

    /// Friction coefficient.
    fn friction(&self) -> f64;

    /// Sets the friction coefficient (clamped to `>= 0`).
    fn set_friction(&mut self, friction: f64) -> f64;

    /// Rotation in `[0, 400)`.
    fn rotation(&self) -> f64;

    /// Sets the rotation. Returns the normalised value that was stored.
    fn set_rotation(&mut self, rotation: f64) -> f64;

    /// Size in world units.
    fn size(&self) -> f64;

    /// Sets the size. Non-finite input is ignored, negatives clamp to 0.
    fn set_size(&mut self, size: f64) -> f64;

    /// Raw state for serialisation and debugging.
    fn raw(&self) -> BodyState;
}

/// A body of either specialisation.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// Tile-plane body.
    Grounded(GroundedBody),
    /// Flying body.
    Free(FreeBody),
}

impl Body {
    /// Rebuilds a body from a raw state.
    ///
    /// Every field goes through the normal setters, so a corrupt state
    /// yields a sane body rather than an error.
    #[must_use]
    pub fn from_state(state: &BodyState) -> Self {
        let mut body = match state.kind {
            BodyKind::Grounded => Self::Grounded(GroundedBody::new()),
            BodyKind::Free => {
                let mut free = FreeBody::new();
                if let Some(gravity) = state.gravity {
                    free.set_gravity(gravity);
                }
                Self::Free(free)
            }
        };
        {
            let physical = body.as_physical_mut();
            physical.set_position(&state.position);
            physical.set_velocity(&state.velocity);
            physical.set_mass(state.mass);
            physical.set_friction(state.friction);
            physical.set_rotation(state.rotation);
            physical.set_size(state.size);
            for force in &state.forces {
                physical.add_force(&force.vector, force.remaining);
            }
        }
        match &mut body {
            Self::Grounded(grounded) => grounded.set_acceleration(&state.acceleration),
            Self::Free(free) => free.set_acceleration(&state.acceleration),
        }
        body
    }

    /// Borrows the body through the common interface.
    #[must_use]
    pub fn as_physical(&self) -> &dyn Physical {
        match self {
            Self::Grounded(body) => body as &dyn Physical,
            Self::Free(body) => body as &dyn Physical,
        }
    }

    /// Mutably borrows the body through the common interface.
    pub fn as_physical_mut(&mut self) -> &mut dyn Physical {
        match self {
            Self::Grounded(body) => body as &mut dyn Physical,
            Self::Free(body) => body as &mut dyn Physical,
        }
    }
}

impl From<GroundedBody> for Body {
    fn from(body: GroundedBody) -> Self {
        Self::Grounded(body)
    }
}

impl From<FreeBody> for Body {
    fn from(body: FreeBody) -> Self {
        Self::Free(body)
    }
}

impl Physical for Body {
    fn kind(&self) -> BodyKind {
        self.as_physical().kind()
    }

    fn tick(&mut self) {
        self.as_physical_mut().tick();
    }

    fn position(&self) -> &[f64] {
        self.as_physical().position()
    }

    fn planar_position(&self) -> [f64; 2] {
        self.as_physical().planar_position()
    }

    fn set_position(&mut self, input: &[f64]) {
        self.as_physical_mut().set_position(input);
    }

    fn velocity(&self) -> &[f64] {
        self.as_physical().velocity()
    }

    fn set_velocity(&mut self, input: &[f64]) {
        self.as_physical_mut().set_velocity(input);
    }

    fn add_force(&mut self, input: &[f64], duration: i64) {
        self.as_physical_mut().add_force(input, duration);
    }

    fn forces(&self) -> Vec<ForceState> {
        self.as_physical().forces()
    }

    fn mass(&self) -> f64 {
        self.as_physical().mass()
    }

    fn set_mass(&mut self, mass: f64) -> f64 {
        self.as_physical_mut().set_mass(mass)
    }

    fn friction(&self) -> f64 {
        self.as_physical().friction()
    }

    fn set_friction(&mut self, friction: f64) -> f64 {
        self.as_physical_mut().set_friction(friction)
    }

    fn rotation(&self) -> f64 {
        self.as_physical().rotation()
    }

    fn set_rotation(&mut self, rotation: f64) -> f64 {
        self.as_physical_mut().set_rotation(rotation)
    }

    fn size(&self) -> f64 {
        self.as_physical().size()
    }

    fn set_size(&mut self, size: f64) -> f64 {
        self.as_physical_mut().set_size(size)
    }

    fn raw(&self) -> BodyState {
        self.as_physical().raw()
    }
}
