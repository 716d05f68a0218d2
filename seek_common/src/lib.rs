//! Seek Common Library
//!
//! This crate provides the shared vocabulary for all set-and-seek workspace
//! crates: configuration loading, numeric constants, motion value types, and
//! the traits through which the control core talks to its external
//! collaborators (actuator, tunable parameter source, telemetry sink).
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Numeric limits and defaults
//! - [`motion`] - `ProfileState` and `MotionConstraints`
//! - [`mechanism`] - Per-mechanism configuration (`SetAndSeekConfig`)
//! - [`actuator`] - `MeasurementSource` / `OutputSink` capabilities
//! - [`tunable`] - `TunableStore` and in-process stores
//! - [`telemetry`] - `TelemetrySink` and in-process sinks
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use seek_common::prelude::*;
//! ```

pub mod actuator;
pub mod config;
pub mod consts;
pub mod mechanism;
pub mod motion;
pub mod prelude;
pub mod telemetry;
pub mod tunable;
