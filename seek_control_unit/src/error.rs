//! Controller construction errors.
//!
//! Runtime control operations never fail: out-of-range targets are
//! clamped, degenerate limits are replaced, a disabled mechanism turns
//! every call into a no-op. Only building a controller can fail, so a
//! controller either exists fully initialized or not at all.

use seek_common::config::ConfigError;
use thiserror::Error;

/// Reasons a controller cannot be constructed.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The static configuration is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The fixed time-step is not a positive finite number of seconds.
    #[error("invalid cycle period: {0} s")]
    InvalidCycle(f64),

    /// A live tunable returned a non-finite value at construction.
    #[error("tunable '{key}' is not finite: {value}")]
    NonFiniteTunable {
        /// Namespaced key.
        key: String,
        /// Value read from the source.
        value: f64,
    },
}
