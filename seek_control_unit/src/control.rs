//! Control engine root.
//!
//! Trapezoidal profile generation plus the feedforward/proportional output
//! blend. Both stages are pure functions; the controller owns all state.

pub mod output;
pub mod profile;
