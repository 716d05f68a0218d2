//! # Seek Control Unit Library
//!
//! Set-and-seek motion control for a single bounded actuator. Every fixed
//! cycle the controller re-reads its tunable limits, advances a trapezoidal
//! profile from the current setpoint toward the goal, and drives the
//! actuator with a velocity feedforward plus proportional position blend.
//!
//! ## Layers
//!
//! 1. [`control`]: pure profile and output functions
//! 2. [`config`]: TOML loading and the live tunable accessor
//! 3. [`controller`]: `ProfiledSetpointController`, owner of goal/setpoint
//! 4. [`command`]: lifecycle wrapper and mutual-exclusion scheduler
//! 5. [`cycle`]: fixed-period runner with optional RT pacing
//! 6. [`sim`]: simulated plant for the binary and tests
//!
//! ## Threading
//!
//! One thread owns the scheduler and calls everything above. Tunable and
//! telemetry collaborators are `Send + Sync` so a tuning thread may write
//! them concurrently.

pub mod command;
pub mod config;
pub mod control;
pub mod controller;
pub mod cycle;
pub mod error;
pub mod sim;
