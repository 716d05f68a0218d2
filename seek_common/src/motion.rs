//! Motion value types shared by the profile generator and the controller.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

use crate::consts::CONSTRAINT_EPSILON;

/// A point on a one-dimensional motion profile.
///
/// Used for both the goal state (velocity always zero) and the setpoint
/// state (the currently commanded point).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct ProfileState {
    /// Position [mechanism units].
    pub position: f64,
    /// Velocity [mechanism units/s].
    pub velocity: f64,
}

const_assert_eq!(core::mem::size_of::<ProfileState>(), 16);

impl ProfileState {
    /// Create a state from position and velocity.
    #[inline]
    pub const fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    /// A state at rest at `position`.
    #[inline]
    pub const fn at_rest(position: f64) -> Self {
        Self {
            position,
            velocity: 0.0,
        }
    }

    /// Returns true if both fields are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// Velocity and acceleration limits of a trapezoidal profile.
///
/// Both fields are strictly positive. Construct through
/// [`MotionConstraints::new`], which replaces degenerate inputs with
/// [`CONSTRAINT_EPSILON`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConstraints {
    max_velocity: f64,
    max_acceleration: f64,
}

impl MotionConstraints {
    /// Build constraints, substituting epsilon for any non-positive or
    /// non-finite limit.
    #[inline]
    pub fn new(max_velocity: f64, max_acceleration: f64) -> Self {
        Self {
            max_velocity: positive_or_epsilon(max_velocity),
            max_acceleration: positive_or_epsilon(max_acceleration),
        }
    }

    /// Maximum velocity magnitude [units/s].
    #[inline]
    pub const fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    /// Maximum acceleration magnitude [units/s²].
    #[inline]
    pub const fn max_acceleration(&self) -> f64 {
        self.max_acceleration
    }
}

#[inline]
fn positive_or_epsilon(value: f64) -> f64 {
    if value > 0.0 && value.is_finite() {
        value
    } else {
        CONSTRAINT_EPSILON
    }
}
