//! Configuration loading and the tunable accessor layer.
//!
//! [`load_config`] reads and validates the process TOML. [`MechanismTunables`]
//! resolves each mechanism field through the live [`TunableStore`] under
//! the key `"<mechanism>/<field>"`, falling back to the compiled default
//! whenever the store is locked.

use std::path::Path;
use std::sync::Arc;

use seek_common::config::{ConfigError, ConfigLoader, ControlLoopConfig};
use seek_common::consts::KEY_SEPARATOR;
use seek_common::mechanism::{SetAndSeekConfig, keys};
use seek_common::motion::MotionConstraints;
use seek_common::tunable::TunableStore;

use crate::control::output::OutputLimits;

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the control loop configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ControlLoopConfig, ConfigError> {
    let config = ControlLoopConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(content: &str) -> Result<ControlLoopConfig, ConfigError> {
    let config = ControlLoopConfig::from_toml(content)?;
    config.validate()?;
    Ok(config)
}

// ─── Tunable Keys ───────────────────────────────────────────────────

/// Namespaced tunable keys of one mechanism, built once.
#[derive(Debug, Clone)]
struct TunableKeys {
    min_setpoint: String,
    max_setpoint: String,
    max_velocity: String,
    max_acceleration: String,
    position_tolerance: String,
    initial_position: String,
    initial_velocity: String,
    verbose: String,
}

impl TunableKeys {
    fn new(namespace: &str) -> Self {
        let key = |field: &str| format!("{namespace}{KEY_SEPARATOR}{field}");
        Self {
            min_setpoint: key(keys::MIN_SETPOINT),
            max_setpoint: key(keys::MAX_SETPOINT),
            max_velocity: key(keys::MAX_VELOCITY),
            max_acceleration: key(keys::MAX_ACCELERATION),
            position_tolerance: key(keys::POSITION_TOLERANCE),
            initial_position: key(keys::INITIAL_POSITION),
            initial_velocity: key(keys::INITIAL_VELOCITY),
            verbose: key(keys::VERBOSE),
        }
    }
}

// ─── Per-Cycle Parameter Snapshot ───────────────────────────────────

/// Profile parameters resolved once per control cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileParameters {
    pub min_setpoint: f64,
    pub max_setpoint: f64,
    pub max_velocity: f64,
    pub max_acceleration: f64,
    pub position_tolerance: f64,
}

impl ProfileParameters {
    /// Motion constraints with degenerate limits replaced by epsilon.
    #[inline]
    pub fn constraints(&self) -> MotionConstraints {
        MotionConstraints::new(self.max_velocity, self.max_acceleration)
    }

    /// Limits for the output stage.
    #[inline]
    pub fn output_limits(&self) -> OutputLimits {
        OutputLimits {
            max_velocity: self.max_velocity,
            min_setpoint: self.min_setpoint,
            max_setpoint: self.max_setpoint,
        }
    }

    /// Clamp a requested target into `[min_setpoint, max_setpoint]`.
    ///
    /// Never panics: if live tuning inverted the bounds, the lower bound
    /// wins.
    #[inline]
    pub fn clamp_target(&self, target: f64) -> f64 {
        self.min_setpoint.max(self.max_setpoint.min(target))
    }
}

// ─── Tunable Accessor ───────────────────────────────────────────────

/// Live view of a mechanism's configuration.
///
/// Each accessor consults the store on every call, so an external write
/// takes effect on the next read without a restart.
#[derive(Clone)]
pub struct MechanismTunables {
    store: Arc<dyn TunableStore>,
    defaults: SetAndSeekConfig,
    keys: TunableKeys,
}

impl std::fmt::Debug for MechanismTunables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MechanismTunables")
            .field("defaults", &self.defaults)
            .field("locked", &self.store.is_locked())
            .finish()
    }
}

impl MechanismTunables {
    /// Create the accessor for mechanism `namespace`.
    pub fn new(namespace: &str, defaults: SetAndSeekConfig, store: Arc<dyn TunableStore>) -> Self {
        Self {
            store,
            defaults,
            keys: TunableKeys::new(namespace),
        }
    }

    /// Compiled defaults.
    #[inline]
    pub fn defaults(&self) -> &SetAndSeekConfig {
        &self.defaults
    }

    /// True when reads bypass the store.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.store.is_locked()
    }

    #[inline]
    fn number(&self, key: &str, default: f64) -> f64 {
        if self.store.is_locked() {
            default
        } else {
            self.store.read_number(key, default)
        }
    }

    #[inline]
    fn boolean(&self, key: &str, default: bool) -> bool {
        if self.store.is_locked() {
            default
        } else {
            self.store.read_boolean(key, default)
        }
    }

    pub fn min_setpoint(&self) -> f64 {
        self.number(&self.keys.min_setpoint, self.defaults.min_setpoint)
    }

    pub fn max_setpoint(&self) -> f64 {
        self.number(&self.keys.max_setpoint, self.defaults.max_setpoint)
    }

    pub fn max_velocity(&self) -> f64 {
        self.number(&self.keys.max_velocity, self.defaults.max_velocity)
    }

    pub fn max_acceleration(&self) -> f64 {
        self.number(&self.keys.max_acceleration, self.defaults.max_acceleration)
    }

    pub fn position_tolerance(&self) -> f64 {
        self.number(&self.keys.position_tolerance, self.defaults.position_tolerance)
    }

    pub fn initial_position(&self) -> f64 {
        self.number(&self.keys.initial_position, self.defaults.initial_position)
    }

    pub fn initial_velocity(&self) -> f64 {
        self.number(&self.keys.initial_velocity, self.defaults.initial_velocity)
    }

    pub fn verbose(&self) -> bool {
        self.boolean(&self.keys.verbose, self.defaults.verbose)
    }

    /// Resolve every per-cycle field once.
    pub fn profile(&self) -> ProfileParameters {
        ProfileParameters {
            min_setpoint: self.min_setpoint(),
            max_setpoint: self.max_setpoint(),
            max_velocity: self.max_velocity(),
            max_acceleration: self.max_acceleration(),
            position_tolerance: self.position_tolerance(),
        }
    }

    /// Register every key with its default so a dashboard can list them.
    /// No-op while locked.
    pub fn publish_defaults(&self) {
        if self.store.is_locked() {
            return;
        }
        self.initial_position();
        self.initial_velocity();
        self.verbose();
        self.profile();
    }

    /// Namespaced key and live value of the initial state fields.
    pub(crate) fn initial_fields(&self) -> [(&str, f64); 2] {
        [
            (&self.keys.initial_position, self.initial_position()),
            (&self.keys.initial_velocity, self.initial_velocity()),
        ]
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
