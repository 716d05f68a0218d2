//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! and the top-level [`ControlLoopConfig`] consumed by the control unit.
//!
//! # Usage
//!
//! ```rust,no_run
//! use seek_common::config::{ConfigError, ConfigLoader, ControlLoopConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = ControlLoopConfig::load(Path::new("config/turret.toml"))?;
//!     config.validate()?;
//!     println!("Mechanism: {}", config.mechanism.name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::consts::{CYCLE_TIME_US, CYCLE_TIME_US_MAX, CYCLE_TIME_US_MIN};
use crate::mechanism::MechanismConfig;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "turret-sim-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration of a control loop process.
///
/// # TOML Example
///
/// ```toml
/// cycle_time_us = 20000
/// locked = false
///
/// [shared]
/// service_name = "turret-sim"
///
/// [mechanism]
/// name = "turret"
/// min_setpoint = -180.0
/// max_setpoint = 180.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlLoopConfig {
    /// Shared service settings.
    pub shared: SharedConfig,

    /// Fixed control period in microseconds (default: 20 000 = 20 ms).
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Start with the tunable store locked (compiled defaults only).
    #[serde(default)]
    pub locked: bool,

    /// The mechanism driven by this loop.
    pub mechanism: MechanismConfig,
}

fn default_cycle_time_us() -> u32 {
    CYCLE_TIME_US
}

impl ControlLoopConfig {
    /// Validate parameter bounds of the loop and the mechanism.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.cycle_time_us < CYCLE_TIME_US_MIN || self.cycle_time_us > CYCLE_TIME_US_MAX {
            return Err(ConfigError::ValidationError(format!(
                "cycle_time_us {} out of range [{}, {}]",
                self.cycle_time_us, CYCLE_TIME_US_MIN, CYCLE_TIME_US_MAX
            )));
        }
        self.mechanism.validate()
    }

    /// Control period as a `Duration`.
    #[inline]
    pub fn cycle_time(&self) -> Duration {
        Duration::from_micros(u64::from(self.cycle_time_us))
    }

    /// Control period in seconds (the profile time-step `dt`).
    #[inline]
    pub fn dt(&self) -> f64 {
        f64::from(self.cycle_time_us) * 1e-6
    }
}

/// Trait for loading configuration from TOML files.
///
/// Default implementation works with any `serde::de::DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
