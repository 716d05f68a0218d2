//! Prelude module for common re-exports.
//!
//! ```rust
//! use seek_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, ControlLoopConfig, LogLevel, SharedConfig};
pub use crate::mechanism::{MechanismConfig, PlantConfig, SetAndSeekConfig};

// ─── Motion ─────────────────────────────────────────────────────────
pub use crate::motion::{MotionConstraints, ProfileState};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::actuator::{MeasurementSource, OutputSink};
pub use crate::telemetry::{MemoryTelemetry, NullTelemetry, TelemetrySink, TracingTelemetry};
pub use crate::tunable::{LockedTunables, MemoryTunableStore, TunableStore};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CONSTRAINT_EPSILON, CYCLE_TIME_US};
