//! Command lifecycle root.
//!
//! A [`Command`] is driven by the [`scheduler::CommandScheduler`]:
//! `start` once when scheduled, `execute` every cycle, `end` once when it
//! finishes (`interrupted = false`) or is preempted/cancelled
//! (`interrupted = true`). Each command claims one [`ResourceId`]; at most
//! one command per resource is active.

use std::fmt;

pub mod scheduler;
pub mod seek;

/// Mutual-exclusion token, one per mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a command. There is no fault state: control operations
/// cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Seeking,
}

/// Scheduler-facing lifecycle surface.
pub trait Command {
    fn name(&self) -> &str;

    /// Called once when the command claims its resource.
    fn start(&mut self);

    /// Called once per cycle while scheduled.
    fn execute(&mut self);

    /// Called once when the command leaves the scheduler.
    fn end(&mut self, interrupted: bool);

    /// Checked after each `execute`. Never finishes by default.
    fn is_finished(&self) -> bool {
        false
    }

    fn required_resource(&self) -> ResourceId;
}
