//! Per-mechanism configuration structures.
//!
//! All config types use `serde::Deserialize` for TOML loading and default
//! every field, so a mechanism table only needs the values it overrides.
//! The compiled defaults describe a turret: ±180° travel, 180°/s, 360°/s².

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Field names of [`SetAndSeekConfig`] as used in tunable keys
/// (`"<mechanism>/<field>"`).
pub mod keys {
    pub const MIN_SETPOINT: &str = "min_setpoint";
    pub const MAX_SETPOINT: &str = "max_setpoint";
    pub const MAX_VELOCITY: &str = "max_velocity";
    pub const MAX_ACCELERATION: &str = "max_acceleration";
    pub const POSITION_TOLERANCE: &str = "position_tolerance";
    pub const INITIAL_POSITION: &str = "initial_position";
    pub const INITIAL_VELOCITY: &str = "initial_velocity";
    pub const VERBOSE: &str = "verbose";
}

/// Motion profile configuration of a set-and-seek mechanism.
///
/// Every numeric field is re-read from the tunable store on each access;
/// the values here are the compiled defaults used when the store is locked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetAndSeekConfig {
    /// Mechanism starts administratively enabled.
    pub enabled: bool,
    /// Emit per-cycle profile traces.
    pub verbose: bool,
    /// Lowest accepted goal position [units].
    pub min_setpoint: f64,
    /// Highest accepted goal position [units].
    pub max_setpoint: f64,
    /// Profile velocity limit [units/s].
    pub max_velocity: f64,
    /// Profile acceleration limit [units/s²].
    pub max_acceleration: f64,
    /// Convergence band around the goal [units].
    pub position_tolerance: f64,
    /// Goal and setpoint position at construction [units].
    pub initial_position: f64,
    /// Setpoint velocity at construction [units/s].
    pub initial_velocity: f64,
}

impl Default for SetAndSeekConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            verbose: false,
            min_setpoint: -180.0,
            max_setpoint: 180.0,
            max_velocity: 180.0,
            max_acceleration: 360.0,
            position_tolerance: 1.0,
            initial_position: 0.0,
            initial_velocity: 0.0,
        }
    }
}

impl SetAndSeekConfig {
    /// Validate parameter consistency.
    ///
    /// Non-positive velocity/acceleration limits are accepted here; the
    /// profile substitutes an epsilon for them at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            (keys::MIN_SETPOINT, self.min_setpoint),
            (keys::MAX_SETPOINT, self.max_setpoint),
            (keys::MAX_VELOCITY, self.max_velocity),
            (keys::MAX_ACCELERATION, self.max_acceleration),
            (keys::POSITION_TOLERANCE, self.position_tolerance),
            (keys::INITIAL_POSITION, self.initial_position),
            (keys::INITIAL_VELOCITY, self.initial_velocity),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if self.min_setpoint > self.max_setpoint {
            return Err(ConfigError::ValidationError(format!(
                "min_setpoint {} exceeds max_setpoint {}",
                self.min_setpoint, self.max_setpoint
            )));
        }
        if self.position_tolerance < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "position_tolerance {} must be >= 0",
                self.position_tolerance
            )));
        }
        if self.initial_position < self.min_setpoint || self.initial_position > self.max_setpoint {
            return Err(ConfigError::ValidationError(format!(
                "initial_position {} outside [{}, {}]",
                self.initial_position, self.min_setpoint, self.max_setpoint
            )));
        }
        Ok(())
    }

    /// Travel range `max_setpoint - min_setpoint`.
    #[inline]
    pub fn range(&self) -> f64 {
        self.max_setpoint - self.min_setpoint
    }
}

/// Simulated actuator parameters.
///
/// Only the simulation plant reads these; a hardware actuator driver owns
/// its own device settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    /// Mechanism speed at full output [units/s]. The velocity feedforward
    /// assumes this equals the profile `max_velocity`.
    pub free_speed: f64,
    /// First-order velocity response time constant [s] (0 = instantaneous).
    pub time_constant: f64,
    /// Invert the sign of the applied output.
    pub motor_inverted: bool,
    /// Motor rotations per one mechanism rotation (100:1 reduction = 100.0).
    pub motor_rotations_per_mechanism_rotation: f64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            free_speed: 180.0,
            time_constant: 0.05,
            motor_inverted: false,
            motor_rotations_per_mechanism_rotation: 1.0,
        }
    }
}

impl PlantConfig {
    /// Validate plant parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.free_speed > 0.0 && self.free_speed.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "plant.free_speed {} must be > 0",
                self.free_speed
            )));
        }
        if !(self.time_constant >= 0.0 && self.time_constant.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "plant.time_constant {} must be >= 0",
                self.time_constant
            )));
        }
        let ratio = self.motor_rotations_per_mechanism_rotation;
        if ratio == 0.0 || !ratio.is_finite() {
            return Err(ConfigError::ValidationError(format!(
                "plant.motor_rotations_per_mechanism_rotation {ratio} must be non-zero"
            )));
        }
        Ok(())
    }
}

/// A named mechanism: namespace, profile config, and simulation plant.
///
/// # TOML Example
///
/// ```toml
/// [mechanism]
/// name = "turret"
/// max_velocity = 180.0
///
/// [mechanism.plant]
/// free_speed = 180.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismConfig {
    /// Mechanism identity; namespaces tunable and telemetry keys.
    pub name: String,
    /// Profile configuration (flattened into the mechanism table).
    #[serde(flatten)]
    pub profile: SetAndSeekConfig,
    /// Simulation plant.
    #[serde(default)]
    pub plant: PlantConfig,
}

impl MechanismConfig {
    /// Validate name, profile, and plant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "mechanism name cannot be empty".to_string(),
            ));
        }
        if self.name.contains(crate::consts::KEY_SEPARATOR) {
            return Err(ConfigError::ValidationError(format!(
                "mechanism name '{}' must not contain '{}'",
                self.name,
                crate::consts::KEY_SEPARATOR
            )));
        }
        self.profile.validate()?;
        self.plant.validate()
    }
}
