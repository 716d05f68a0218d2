//! Profiled setpoint controller.
//!
//! Owns the goal and setpoint states of one mechanism and drives it toward
//! the goal once per cycle:
//!
//! ```text
//! seek_target():
//!   measured  ← MeasurementSource
//!   params    ← MechanismTunables (live, or defaults when locked)
//!   setpoint  ← profile_calculate(dt, setpoint, goal, params.constraints())
//!   command   ← shape_output(params, setpoint, measured.position)
//!   OutputSink.set_output(command); TelemetrySink.record(..)
//! ```
//!
//! Runtime operations never fail. A disabled controller turns
//! [`set_target`](ProfiledSetpointController::set_target) and
//! [`seek_target`](ProfiledSetpointController::seek_target) into no-ops and
//! reports [`at_target`](ProfiledSetpointController::at_target) as true.

use std::fmt;
use std::sync::Arc;

use seek_common::actuator::{MeasurementSource, OutputSink};
use seek_common::config::ConfigError;
use seek_common::consts::KEY_SEPARATOR;
use seek_common::mechanism::SetAndSeekConfig;
use seek_common::motion::ProfileState;
use seek_common::telemetry::TelemetrySink;
use seek_common::tunable::TunableStore;
use tracing::{debug, info, trace, warn};

use crate::config::MechanismTunables;
use crate::control::output::{OutputTerms, shape_output};
use crate::control::profile::{profile_calculate, profile_timing};
use crate::error::ControllerError;

// ─── Controller State ───────────────────────────────────────────────

/// Whether the mechanism accepts motion commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    #[default]
    Enabled,
    Disabled,
}

/// Operations gated by [`ControllerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SetTarget,
    SeekTarget,
    /// Compare the goal against the measurement.
    CheckConvergence,
}

impl ControllerState {
    /// Whether `op` runs in this state. Denied operations are no-ops.
    #[inline]
    pub const fn permits(self, op: Operation) -> bool {
        match (self, op) {
            (Self::Enabled, _) => true,
            (
                Self::Disabled,
                Operation::SetTarget | Operation::SeekTarget | Operation::CheckConvergence,
            ) => false,
        }
    }
}

// ─── Interrupt Policy ───────────────────────────────────────────────

/// What [`ProfiledSetpointController::handle_seek_interrupted`] does.
#[derive(Default)]
pub enum InterruptPolicy {
    /// Stop the actuator immediately.
    #[default]
    Stop,
    /// Keep applying the last command.
    HoldOutput,
    /// Mechanism-specific reaction.
    Custom(Box<dyn FnMut(&mut dyn OutputSink)>),
}

impl fmt::Debug for InterruptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => f.write_str("Stop"),
            Self::HoldOutput => f.write_str("HoldOutput"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ─── Collaborators ──────────────────────────────────────────────────

/// External capabilities injected at construction.
pub struct Collaborators<M, O> {
    pub measurement: M,
    pub output: O,
    pub tunables: Arc<dyn TunableStore>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

/// Telemetry keys, built once so the cycle path does not allocate.
#[derive(Debug)]
struct TelemetryKeys {
    goal_position: String,
    goal_velocity: String,
    setpoint_position: String,
    setpoint_velocity: String,
    measured_position: String,
    measured_velocity: String,
    commanded_output: String,
}

impl TelemetryKeys {
    fn new(name: &str) -> Self {
        let key = |field: &str| format!("{name}{KEY_SEPARATOR}{field}");
        Self {
            goal_position: key("goal_position"),
            goal_velocity: key("goal_velocity"),
            setpoint_position: key("setpoint_position"),
            setpoint_velocity: key("setpoint_velocity"),
            measured_position: key("measured_position"),
            measured_velocity: key("measured_velocity"),
            commanded_output: key("commanded_output"),
        }
    }
}

// ─── Controller ─────────────────────────────────────────────────────

/// Single-actuator trapezoidal set-and-seek controller.
pub struct ProfiledSetpointController<M, O> {
    name: String,
    dt: f64,
    state: ControllerState,
    goal: ProfileState,
    setpoint: ProfileState,
    last_output: f64,
    last_terms: OutputTerms,
    tunables: MechanismTunables,
    measurement: M,
    output: O,
    telemetry: Arc<dyn TelemetrySink>,
    telemetry_keys: TelemetryKeys,
    interrupt_policy: InterruptPolicy,
}

impl<M, O> fmt::Debug for ProfiledSetpointController<M, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfiledSetpointController")
            .field("name", &self.name)
            .field("dt", &self.dt)
            .field("state", &self.state)
            .field("goal", &self.goal)
            .field("setpoint", &self.setpoint)
            .field("last_output", &self.last_output)
            .field("interrupt_policy", &self.interrupt_policy)
            .finish()
    }
}

impl<M: MeasurementSource, O: OutputSink> ProfiledSetpointController<M, O> {
    /// Build a controller for mechanism `name` stepping every `dt` seconds.
    ///
    /// Fails if the static configuration is inconsistent, `dt` is not a
    /// positive finite number, or the live initial state is not finite.
    pub fn new(
        name: &str,
        config: SetAndSeekConfig,
        dt: f64,
        collaborators: Collaborators<M, O>,
    ) -> Result<Self, ControllerError> {
        if name.is_empty() || name.contains(KEY_SEPARATOR) {
            return Err(ConfigError::ValidationError(format!(
                "mechanism name '{name}' must be non-empty and contain no '{KEY_SEPARATOR}'"
            ))
            .into());
        }
        config.validate()?;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ControllerError::InvalidCycle(dt));
        }

        let Collaborators {
            measurement,
            output,
            tunables,
            telemetry,
        } = collaborators;

        let tunables = MechanismTunables::new(name, config, tunables);
        tunables.publish_defaults();
        for (key, value) in tunables.initial_fields() {
            if !value.is_finite() {
                return Err(ControllerError::NonFiniteTunable {
                    key: key.to_string(),
                    value,
                });
            }
        }

        let initial_position = tunables.initial_position();
        let initial_velocity = tunables.initial_velocity();
        let state = if config.enabled {
            ControllerState::Enabled
        } else {
            ControllerState::Disabled
        };

        info!(
            mechanism = name,
            dt,
            ?state,
            locked = tunables.is_locked(),
            initial_position,
            "controller constructed"
        );

        Ok(Self {
            name: name.to_string(),
            dt,
            state,
            goal: ProfileState::at_rest(initial_position),
            setpoint: ProfileState::new(initial_position, initial_velocity),
            last_output: 0.0,
            last_terms: OutputTerms::default(),
            tunables,
            measurement,
            output,
            telemetry,
            telemetry_keys: TelemetryKeys::new(name),
            interrupt_policy: InterruptPolicy::default(),
        })
    }

    /// Replace the interrupt reaction.
    pub fn with_interrupt_policy(mut self, policy: InterruptPolicy) -> Self {
        self.interrupt_policy = policy;
        self
    }

    /// Replace the interrupt reaction in place.
    pub fn set_interrupt_policy(&mut self, policy: InterruptPolicy) {
        self.interrupt_policy = policy;
    }

    // ── Commands ──

    /// Set a new goal, clamped into the live `[min_setpoint, max_setpoint]`.
    pub fn set_target(&mut self, target: f64) {
        if !self.state.permits(Operation::SetTarget) {
            return;
        }
        let params = self.tunables.profile();
        let clamped = params.clamp_target(target);
        if clamped != target {
            debug!(mechanism = %self.name, target, clamped, "target clamped");
        }
        self.goal = ProfileState::at_rest(clamped);
    }

    /// Advance one cycle toward the goal and drive the actuator.
    pub fn seek_target(&mut self) {
        if !self.state.permits(Operation::SeekTarget) {
            return;
        }

        let measured = ProfileState::new(self.measurement.position(), self.measurement.velocity());
        let params = self.tunables.profile();

        self.setpoint = profile_calculate(self.dt, self.setpoint, self.goal, &params.constraints());
        let terms = shape_output(&params.output_limits(), &self.setpoint, measured.position);

        let command = if terms.command.is_finite() {
            terms.command
        } else {
            warn!(mechanism = %self.name, ?terms, ?measured, "non-finite command, sending 0");
            0.0
        };
        self.output.set_output(command);
        self.last_output = command;
        self.last_terms = terms;

        self.publish(&measured);

        if self.tunables.verbose() {
            trace!(
                mechanism = %self.name,
                goal = self.goal.position,
                setpoint_position = self.setpoint.position,
                setpoint_velocity = self.setpoint.velocity,
                measured_position = measured.position,
                velocity_term = terms.velocity_term,
                position_term = terms.position_term,
                command,
                "seek"
            );
        }
    }

    /// Reset the profile to a known state: setpoint `(position, velocity)`,
    /// goal `(position, 0)`. No clamping.
    pub fn synchronize_to_measurement(&mut self, position: f64, velocity: f64) {
        self.setpoint = ProfileState::new(position, velocity);
        self.goal = ProfileState::at_rest(position);
        debug!(mechanism = %self.name, position, velocity, "synchronized to measurement");
    }

    /// [`synchronize_to_measurement`](Self::synchronize_to_measurement) from
    /// the actuator's own reading.
    pub fn synchronize_to_current(&mut self) {
        let position = self.measurement.position();
        let velocity = self.measurement.velocity();
        self.synchronize_to_measurement(position, velocity);
    }

    /// True if the measured position is within tolerance of the goal.
    /// Always true while disabled.
    pub fn at_target(&self) -> bool {
        if !self.state.permits(Operation::CheckConvergence) {
            return true;
        }
        let error = (self.goal.position - self.measurement.position()).abs();
        error <= self.tunables.position_tolerance()
    }

    /// React to the owning command being interrupted.
    pub fn handle_seek_interrupted(&mut self) {
        match &mut self.interrupt_policy {
            InterruptPolicy::Stop => {
                self.output.stop();
                self.last_output = 0.0;
            }
            InterruptPolicy::HoldOutput => self.output.set_output(self.last_output),
            InterruptPolicy::Custom(react) => react(&mut self.output),
        }
        debug!(mechanism = %self.name, policy = ?self.interrupt_policy, "seek interrupted");
    }

    // ── Enable / Disable ──

    /// Accept commands again. The profile restarts from the measurement.
    pub fn enable(&mut self) {
        if self.state == ControllerState::Enabled {
            return;
        }
        self.state = ControllerState::Enabled;
        self.synchronize_to_current();
        info!(mechanism = %self.name, "enabled");
    }

    /// Stop the actuator and ignore motion commands until re-enabled.
    pub fn disable(&mut self) {
        if self.state == ControllerState::Disabled {
            return;
        }
        self.state = ControllerState::Disabled;
        self.output.stop();
        self.last_output = 0.0;
        info!(mechanism = %self.name, "disabled");
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.state == ControllerState::Enabled
    }

    fn publish(&self, measured: &ProfileState) {
        let keys = &self.telemetry_keys;
        let sink = &self.telemetry;
        sink.record(&keys.goal_position, self.goal.position);
        sink.record(&keys.goal_velocity, self.goal.velocity);
        sink.record(&keys.setpoint_position, self.setpoint.position);
        sink.record(&keys.setpoint_velocity, self.setpoint.velocity);
        sink.record(&keys.measured_position, measured.position);
        sink.record(&keys.measured_velocity, measured.velocity);
        sink.record(&keys.commanded_output, self.last_output);
    }
}

impl<M, O> ProfiledSetpointController<M, O> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed time-step [s].
    #[inline]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    #[inline]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    #[inline]
    pub fn goal(&self) -> ProfileState {
        self.goal
    }

    #[inline]
    pub fn setpoint(&self) -> ProfileState {
        self.setpoint
    }

    /// Last command sent to the actuator.
    #[inline]
    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    /// Output terms of the last cycle.
    #[inline]
    pub fn last_terms(&self) -> OutputTerms {
        self.last_terms
    }

    /// Predicted time [s] for the setpoint to reach the goal under the
    /// live constraints. Zero once the profile has arrived.
    pub fn time_to_goal(&self) -> f64 {
        let constraints = self.tunables.profile().constraints();
        profile_timing(self.setpoint, self.goal, &constraints).total_time()
    }

    #[inline]
    pub fn tunables(&self) -> &MechanismTunables {
        &self.tunables
    }

    #[inline]
    pub fn measurement(&self) -> &M {
        &self.measurement
    }

    #[inline]
    pub fn output(&self) -> &O {
        &self.output
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
