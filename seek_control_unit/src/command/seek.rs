//! Seek command: binds a controller to the scheduler lifecycle.
//!
//! | Lifecycle | Controller call |
//! |-----------|-----------------|
//! | `start` | optional resync, apply target |
//! | `execute` | refresh tracking target, `seek_target()` |
//! | `end(_)` | `handle_seek_interrupted()` on interrupt and on release |
//! | `is_finished` | `at_target()` if enabled via `until_at_target`, else `false` |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use seek_common::actuator::{MeasurementSource, OutputSink};
use tracing::info;

use super::{Command, LifecycleState, ResourceId};
use crate::controller::ProfiledSetpointController;

/// Controller handle shared between the command and its owner.
///
/// The control loop is single-threaded; commands and the owning mechanism
/// borrow the controller only within a call.
pub type SharedController<M, O> = Rc<RefCell<ProfiledSetpointController<M, O>>>;

/// Wrap a controller for sharing with commands.
pub fn share<M, O>(controller: ProfiledSetpointController<M, O>) -> SharedController<M, O> {
    Rc::new(RefCell::new(controller))
}

/// Where a seek command takes its target from.
#[derive(Default)]
pub enum TargetSource {
    /// Keep the controller's current goal.
    #[default]
    None,
    /// Applied once at start.
    Fixed(f64),
    /// Sampled at start and again every cycle.
    Tracking(Box<dyn FnMut() -> f64>),
}

impl fmt::Debug for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Fixed(target) => f.debug_tuple("Fixed").field(target).finish(),
            Self::Tracking(_) => f.write_str("Tracking(..)"),
        }
    }
}

/// Drive one mechanism toward a target until interrupted (or, optionally,
/// until it arrives).
pub struct SeekCommand<M, O> {
    name: String,
    controller: SharedController<M, O>,
    resource: ResourceId,
    target: TargetSource,
    resync_on_start: bool,
    until_at_target: bool,
    state: LifecycleState,
}

impl<M, O> fmt::Debug for SeekCommand<M, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeekCommand")
            .field("name", &self.name)
            .field("resource", &self.resource)
            .field("target", &self.target)
            .field("resync_on_start", &self.resync_on_start)
            .field("until_at_target", &self.until_at_target)
            .field("state", &self.state)
            .finish()
    }
}

impl<M: MeasurementSource, O: OutputSink> SeekCommand<M, O> {
    /// Seek the controller's current goal, claiming its mechanism.
    pub fn new(controller: SharedController<M, O>) -> Self {
        let mechanism = controller.borrow().name().to_string();
        Self {
            name: format!("Seek({mechanism})"),
            resource: ResourceId::new(mechanism),
            controller,
            target: TargetSource::None,
            resync_on_start: false,
            until_at_target: false,
            state: LifecycleState::Idle,
        }
    }

    /// Seek a fixed target.
    pub fn to_target(controller: SharedController<M, O>, target: f64) -> Self {
        let mut cmd = Self::new(controller).with_target(TargetSource::Fixed(target));
        cmd.name = format!("SeekTo({}, {target})", cmd.resource);
        cmd
    }

    /// Follow a target supplier every cycle.
    pub fn tracking(controller: SharedController<M, O>, target: impl FnMut() -> f64 + 'static) -> Self {
        let mut cmd = Self::new(controller).with_target(TargetSource::Tracking(Box::new(target)));
        cmd.name = format!("Track({})", cmd.resource);
        cmd
    }

    pub fn with_target(mut self, target: TargetSource) -> Self {
        self.target = target;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Restart the profile from the measurement before applying the target.
    pub fn resync_on_start(mut self) -> Self {
        self.resync_on_start = true;
        self
    }

    /// Finish once the mechanism reports `at_target()`.
    pub fn until_at_target(mut self) -> Self {
        self.until_at_target = true;
        self
    }

    #[inline]
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.state
    }

    fn on_initialize(&mut self) {
        let mut controller = self.controller.borrow_mut();
        if self.resync_on_start {
            controller.synchronize_to_current();
        }
        match &mut self.target {
            TargetSource::None => {}
            TargetSource::Fixed(target) => controller.set_target(*target),
            TargetSource::Tracking(supplier) => controller.set_target(supplier()),
        }
    }
}

impl<M: MeasurementSource, O: OutputSink> Command for SeekCommand<M, O> {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) {
        info!("Starting {}", self.name);
        self.state = LifecycleState::Seeking;
        self.on_initialize();
    }

    fn execute(&mut self) {
        let mut controller = self.controller.borrow_mut();
        if let TargetSource::Tracking(supplier) = &mut self.target {
            controller.set_target(supplier());
        }
        controller.seek_target();
    }

    fn end(&mut self, interrupted: bool) {
        self.state = LifecycleState::Idle;
        if interrupted {
            info!("Interrupted {}", self.name);
        } else {
            info!("Finished {}", self.name);
        }
        // A released mechanism must not keep the last command latched.
        self.controller.borrow_mut().handle_seek_interrupted();
    }

    fn is_finished(&self) -> bool {
        self.until_at_target && self.controller.borrow().at_target()
    }

    fn required_resource(&self) -> ResourceId {
        self.resource.clone()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
