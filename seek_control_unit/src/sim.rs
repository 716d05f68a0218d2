//! Simulated actuator plant.
//!
//! A first-order velocity model of a geared motor:
//!
//! ```text
//! v_target = (command + load) · free_speed
//! v(t+dt)  = v_target + (v(t) − v_target) · exp(−dt / τ)
//! p(t+dt)  = p(t) + ½ (v(t) + v(t+dt)) · dt
//! ```
//!
//! The state is kept in the raw motor frame (rotations, sign flipped when
//! `motor_inverted`). The measurement and output capabilities apply the
//! inversion and gear ratio the way a device driver would, so the
//! controller only ever sees mechanism units.
//!
//! `load` is a constant disturbance in normalized output units (a gravity
//! or spring bias). The profiled controller has no integral term, so a
//! nonzero load leaves a steady-state error of `load × range`.

use std::sync::Arc;

use parking_lot::Mutex;
use seek_common::actuator::{MeasurementSource, OutputSink};
use seek_common::consts::{OUTPUT_MAX, OUTPUT_MIN};
use seek_common::mechanism::{MechanismConfig, PlantConfig};
use seek_common::telemetry::TelemetrySink;
use seek_common::tunable::TunableStore;
use tracing::trace;

use crate::controller::{Collaborators, ProfiledSetpointController};
use crate::error::ControllerError;

/// Point-in-time view of the plant in mechanism units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimSnapshot {
    pub position: f64,
    pub velocity: f64,
    /// Last applied normalized command, mechanism frame.
    pub output: f64,
    /// Raw motor position [motor units].
    pub motor_position: f64,
    pub stop_count: u64,
}

/// First-order geared motor.
#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    config: PlantConfig,
    /// Raw motor position [motor units].
    motor_position: f64,
    /// Raw motor velocity [motor units/s].
    motor_velocity: f64,
    /// Raw applied command in [-1, 1].
    motor_output: f64,
    load: f64,
    stop_count: u64,
}

impl SimulatedActuator {
    /// Plant at rest at mechanism position `position`.
    pub fn new(config: PlantConfig, position: f64) -> Self {
        let mut plant = Self {
            config,
            motor_position: 0.0,
            motor_velocity: 0.0,
            motor_output: 0.0,
            load: 0.0,
            stop_count: 0,
        };
        plant.set_position(position);
        plant
    }

    #[inline]
    fn sign(&self) -> f64 {
        if self.config.motor_inverted { -1.0 } else { 1.0 }
    }

    /// Mechanism units → motor units.
    #[inline]
    fn to_motor(&self, mechanism: f64) -> f64 {
        mechanism * self.sign() * self.config.motor_rotations_per_mechanism_rotation
    }

    /// Motor units → mechanism units.
    #[inline]
    fn to_mechanism(&self, motor: f64) -> f64 {
        motor * self.sign() / self.config.motor_rotations_per_mechanism_rotation
    }

    /// Advance the physics by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        if !(dt > 0.0) {
            return;
        }
        let drive = self.motor_output + self.load * self.sign();
        let target = drive * self.config.free_speed * self.config.motor_rotations_per_mechanism_rotation;
        let previous = self.motor_velocity;
        self.motor_velocity = if self.config.time_constant > 0.0 {
            target + (previous - target) * (-dt / self.config.time_constant).exp()
        } else {
            target
        };
        self.motor_position += 0.5 * (previous + self.motor_velocity) * dt;
        trace!(
            target: "sim",
            motor_position = self.motor_position,
            motor_velocity = self.motor_velocity,
            motor_output = self.motor_output,
            "plant step"
        );
    }

    /// Teleport to a mechanism position, at rest.
    pub fn set_position(&mut self, position: f64) {
        self.motor_position = self.to_motor(position);
        self.motor_velocity = 0.0;
    }

    /// Constant disturbance in normalized output units.
    pub fn set_load(&mut self, load: f64) {
        self.load = load;
    }

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            position: self.to_mechanism(self.motor_position),
            velocity: self.to_mechanism(self.motor_velocity),
            output: self.motor_output * self.sign(),
            motor_position: self.motor_position,
            stop_count: self.stop_count,
        }
    }
}

impl MeasurementSource for SimulatedActuator {
    #[inline]
    fn position(&self) -> f64 {
        self.to_mechanism(self.motor_position)
    }

    #[inline]
    fn velocity(&self) -> f64 {
        self.to_mechanism(self.motor_velocity)
    }
}

impl OutputSink for SimulatedActuator {
    #[inline]
    fn set_output(&mut self, value: f64) {
        self.motor_output = value.clamp(OUTPUT_MIN, OUTPUT_MAX) * self.sign();
    }

    #[inline]
    fn stop(&mut self) {
        self.motor_output = 0.0;
        self.stop_count += 1;
    }
}

// ─── Shared Handle ──────────────────────────────────────────────────

/// Cloneable handle to one plant.
///
/// The controller holds one clone as its measurement source and another as
/// its output sink while the loop steps the physics through a third.
#[derive(Debug, Clone)]
pub struct SimHandle(Arc<Mutex<SimulatedActuator>>);

impl SimHandle {
    pub fn new(plant: SimulatedActuator) -> Self {
        Self(Arc::new(Mutex::new(plant)))
    }

    pub fn step(&self, dt: f64) {
        self.0.lock().step(dt);
    }

    pub fn snapshot(&self) -> SimSnapshot {
        self.0.lock().snapshot()
    }

    pub fn set_position(&self, position: f64) {
        self.0.lock().set_position(position);
    }

    pub fn set_load(&self, load: f64) {
        self.0.lock().set_load(load);
    }
}

impl MeasurementSource for SimHandle {
    fn position(&self) -> f64 {
        self.0.lock().position()
    }

    fn velocity(&self) -> f64 {
        self.0.lock().velocity()
    }
}

impl OutputSink for SimHandle {
    fn set_output(&mut self, value: f64) {
        self.0.lock().set_output(value);
    }

    fn stop(&mut self) {
        self.0.lock().stop();
    }
}

// ─── Assembly ───────────────────────────────────────────────────────

/// Controller driving a simulated plant.
pub type SimController = ProfiledSetpointController<SimHandle, SimHandle>;

/// Build a plant at the configured initial position and a controller
/// wired to it. The returned handle steps the physics.
pub fn simulated_mechanism(
    config: &MechanismConfig,
    dt: f64,
    tunables: Arc<dyn TunableStore>,
    telemetry: Arc<dyn TelemetrySink>,
) -> Result<(SimController, SimHandle), ControllerError> {
    config.validate()?;
    let plant = SimHandle::new(SimulatedActuator::new(
        config.plant,
        config.profile.initial_position,
    ));
    let controller = ProfiledSetpointController::new(
        &config.name,
        config.profile,
        dt,
        Collaborators {
            measurement: plant.clone(),
            output: plant.clone(),
            tunables,
            telemetry,
        },
    )?;
    Ok((controller, plant))
}

// ─── Tests ──────────────────────────────────────────────────────────
