//! System-wide constants for the seek workspace.
//!
//! Single source of truth for numeric limits and defaults.

/// Smallest positive value substituted for degenerate motion constraints
/// and used as the floor of the velocity normalization divisor.
pub const CONSTRAINT_EPSILON: f64 = 1e-6;

/// Default control cycle time in microseconds (50 Hz = 20 000 µs).
pub const CYCLE_TIME_US: u32 = 20_000;

/// Minimum accepted cycle time in microseconds.
pub const CYCLE_TIME_US_MIN: u32 = 1_000;

/// Maximum accepted cycle time in microseconds.
pub const CYCLE_TIME_US_MAX: u32 = 100_000;

/// Lower bound of the normalized actuator command.
pub const OUTPUT_MIN: f64 = -1.0;

/// Upper bound of the normalized actuator command.
pub const OUTPUT_MAX: f64 = 1.0;

/// Separator between the mechanism namespace and a field name in tunable
/// and telemetry keys (`"turret/max_velocity"`).
pub const KEY_SEPARATOR: char = '/';

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/turret.toml";
