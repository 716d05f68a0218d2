//! Output shaping: velocity feedforward + proportional position blend.
//!
//! ```text
//! velocity_term = clamp(setpoint.velocity / max(|max_velocity|, ε), -1, 1)
//! position_term = clamp((setpoint.position - measured) / (max - min), -1, 1)   (0 if range == 0)
//! command       = clamp(velocity_term + position_term, -1, 1)
//! ```
//!
//! There is no integral term. Under a sustained load the mechanism settles
//! where the position term balances the load, so a steady-state error of
//! `load_fraction × range` remains.

use seek_common::consts::{CONSTRAINT_EPSILON, OUTPUT_MAX, OUTPUT_MIN};
use seek_common::motion::ProfileState;

/// Limits the output stage reads each cycle.
#[derive(Debug, Clone, Copy)]
pub struct OutputLimits {
    /// Configured velocity limit as read from the tunable source (may be
    /// non-positive; the magnitude is used).
    pub max_velocity: f64,
    /// Lower travel bound [units].
    pub min_setpoint: f64,
    /// Upper travel bound [units].
    pub max_setpoint: f64,
}

/// The two blended terms and the final command.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutputTerms {
    /// Normalized velocity feedforward.
    pub velocity_term: f64,
    /// Normalized position correction.
    pub position_term: f64,
    /// Command sent to the actuator, in [-1, 1].
    pub command: f64,
}

/// Compute the normalized actuator command for one cycle.
#[inline]
pub fn shape_output(
    limits: &OutputLimits,
    setpoint: &ProfileState,
    measured_position: f64,
) -> OutputTerms {
    let max_velocity = limits.max_velocity.abs().max(CONSTRAINT_EPSILON);
    let velocity_term = (setpoint.velocity / max_velocity).clamp(OUTPUT_MIN, OUTPUT_MAX);

    let error = setpoint.position - measured_position;
    let range = limits.max_setpoint - limits.min_setpoint;
    let position_term = if range != 0.0 {
        (error / range).clamp(OUTPUT_MIN, OUTPUT_MAX)
    } else {
        0.0
    };

    OutputTerms {
        velocity_term,
        position_term,
        command: (position_term + velocity_term).clamp(OUTPUT_MIN, OUTPUT_MAX),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
