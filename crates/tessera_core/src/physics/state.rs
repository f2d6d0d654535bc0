//! Raw, serialisable body state for persistence and debugging.

use serde::{Deserialize, Serialize};

/// Which body specialisation a state was taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    /// Two-dimensional, friction-heavy, quarter-turn rotation.
    Grounded,
    /// Three-dimensional, gravity-bound, light friction.
    Free,
}

impl BodyKind {
    /// Number of vector components for this kind.
    #[must_use]
    pub const fn dimensions(self) -> usize {
        match self {
            Self::Grounded => 2,
            Self::Free => 3,
        }
    }
}

/// A force as recorded in a [`BodyState`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForceState {
    /// Force vector.
    pub vector: Vec<f64>,
    /// Ticks left before removal.
    pub remaining: i64,
}

/// Everything needed to rebuild a body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    /// Specialisation.
    pub kind: BodyKind,
    /// Position components.
    pub position: Vec<f64>,
    /// Velocity components.
    pub velocity: Vec<f64>,
    /// Pending acceleration components.
    pub acceleration: Vec<f64>,
    /// Active forces.
    pub forces: Vec<ForceState>,
    /// Mass.
    pub mass: f64,
    /// Friction coefficient.
    pub friction: f64,
    /// Rotation in `[0, 400)`.
    pub rotation: f64,
    /// Body size in world units.
    pub size: f64,
    /// Gravity magnitude, free bodies only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gravity: Option<f64>,
}
