//! Trapezoidal motion profile.
//!
//! Stateless: each call computes the time-optimal trajectory from the
//! current state to the goal under the given constraints and samples it
//! `t` seconds ahead. Calling it once per cycle with the previous result as
//! the new current state follows one continuous trajectory, and picks up
//! new goals or constraints on the next call.
//!
//! The trajectory is solved in a directed frame where motion toward the
//! goal is positive. The direction is chosen from the *stopping point*
//! (`position + v·|v| / 2a`), not from the position alone: when the
//! mechanism cannot stop before the goal, or the goal moved behind it, the
//! profile first brakes at `max_acceleration` through zero velocity and
//! then approaches from the other side. Velocity is therefore continuous
//! with slope bounded by `max_acceleration`.
//!
//! The goal velocity is expected to be zero.

use seek_common::motion::{MotionConstraints, ProfileState};

/// Phase boundaries of a trapezoid, in seconds from the current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileTiming {
    /// +1.0 if the directed frame equals the input frame, -1.0 if mirrored.
    pub direction: f64,
    /// End of the acceleration phase.
    pub end_accel: f64,
    /// End of the cruise phase.
    pub end_full_speed: f64,
    /// End of the deceleration phase (time to reach the goal).
    pub end_decel: f64,
}

impl ProfileTiming {
    /// Remaining time until the goal is reached [s].
    #[inline]
    pub fn total_time(&self) -> f64 {
        self.end_decel.max(0.0)
    }
}

/// Advance `current` toward `goal` by `t` seconds.
pub fn profile_calculate(
    t: f64,
    current: ProfileState,
    goal: ProfileState,
    constraints: &MotionConstraints,
) -> ProfileState {
    if t <= 0.0 {
        return current;
    }

    let max_v = constraints.max_velocity();
    let max_a = constraints.max_acceleration();
    let direction = direction_of(&current, &goal, max_a);
    let cur = direct(current, direction);
    let gl = direct(goal, direction);

    // Velocity limit dropped below the current speed: brake down to the new
    // cap, then continue on a regular trapezoid for what is left of `t`.
    if cur.velocity > max_v {
        let brake_time = (cur.velocity - max_v) / max_a;
        if brake_time >= t {
            let velocity = cur.velocity - max_a * t;
            let position = cur.position + (cur.velocity - 0.5 * max_a * t) * t;
            return direct(ProfileState::new(position, velocity), direction);
        }
        let position = cur.position + (cur.velocity - 0.5 * max_a * brake_time) * brake_time;
        let braked = direct(ProfileState::new(position, max_v), direction);
        return profile_calculate(t - brake_time, braked, goal, constraints);
    }

    let timing = directed_timing(&cur, &gl, max_v, max_a, direction);
    let result = if t < timing.end_accel {
        ProfileState::new(
            cur.position + (cur.velocity + 0.5 * t * max_a) * t,
            cur.velocity + t * max_a,
        )
    } else if t < timing.end_full_speed {
        ProfileState::new(
            cur.position
                + (cur.velocity + 0.5 * timing.end_accel * max_a) * timing.end_accel
                + max_v * (t - timing.end_accel),
            max_v,
        )
    } else if t <= timing.end_decel {
        let time_left = timing.end_decel - t;
        ProfileState::new(
            gl.position - (gl.velocity + 0.5 * time_left * max_a) * time_left,
            gl.velocity + time_left * max_a,
        )
    } else {
        gl
    };

    direct(result, direction)
}

/// Phase timing of the trajectory from `current` to `goal`.
///
/// When the current speed exceeds `max_velocity` the timing describes the
/// trajectory as if the speed were already capped.
pub fn profile_timing(
    current: ProfileState,
    goal: ProfileState,
    constraints: &MotionConstraints,
) -> ProfileTiming {
    let max_v = constraints.max_velocity();
    let max_a = constraints.max_acceleration();
    let direction = direction_of(&current, &goal, max_a);
    let mut cur = direct(current, direction);
    let gl = direct(goal, direction);
    cur.velocity = cur.velocity.min(max_v);
    directed_timing(&cur, &gl, max_v, max_a, direction)
}

/// Whether the mechanism, braking at `max_acceleration` from its current
/// velocity, would come to rest past the goal.
#[inline]
fn direction_of(current: &ProfileState, goal: &ProfileState, max_a: f64) -> f64 {
    let stopping_point = current.position + current.velocity * current.velocity.abs() / (2.0 * max_a);
    if stopping_point > goal.position { -1.0 } else { 1.0 }
}

#[inline]
fn direct(state: ProfileState, direction: f64) -> ProfileState {
    ProfileState::new(state.position * direction, state.velocity * direction)
}

fn directed_timing(
    cur: &ProfileState,
    gl: &ProfileState,
    max_v: f64,
    max_a: f64,
    direction: f64,
) -> ProfileTiming {
    // Extend the trajectory back (and forward) to virtual rest points so the
    // whole move is a symmetric trapezoid between two zero velocities.
    let cutoff_begin = cur.velocity / max_a;
    let cutoff_dist_begin = cutoff_begin * cutoff_begin * max_a / 2.0;
    let cutoff_end = gl.velocity / max_a;
    let cutoff_dist_end = cutoff_end * cutoff_end * max_a / 2.0;

    let full_trapezoid_dist =
        (cutoff_dist_begin + (gl.position - cur.position) + cutoff_dist_end).max(0.0);

    let mut acceleration_time = max_v / max_a;
    let mut full_speed_dist = full_trapezoid_dist - acceleration_time * acceleration_time * max_a;

    // Triangular: peak speed never reaches max_v.
    if full_speed_dist < 0.0 {
        acceleration_time = (full_trapezoid_dist / max_a).sqrt();
        full_speed_dist = 0.0;
    }

    let end_accel = acceleration_time - cutoff_begin;
    let end_full_speed = end_accel + full_speed_dist / max_v;
    let end_decel = end_full_speed + acceleration_time - cutoff_end;

    ProfileTiming {
        direction,
        end_accel,
        end_full_speed,
        end_decel,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
