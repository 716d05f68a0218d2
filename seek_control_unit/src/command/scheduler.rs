//! Cooperative command scheduler.
//!
//! Holds at most one active command per [`ResourceId`]. Scheduling a command
//! whose resource is taken interrupts the current holder first. Commands
//! run in scheduling order; there is no internal timeout.

use tracing::{debug, info};

use super::{Command, ResourceId};

/// Single-threaded, fixed-period command scheduler.
#[derive(Default)]
pub struct CommandScheduler {
    active: Vec<Box<dyn Command>>,
    cycle_count: u64,
}

impl std::fmt::Debug for CommandScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandScheduler")
            .field("active", &self.active_names())
            .field("cycle_count", &self.cycle_count)
            .finish()
    }
}

impl CommandScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `command`, interrupting whichever command holds its resource.
    pub fn schedule(&mut self, mut command: Box<dyn Command>) {
        let resource = command.required_resource();
        if let Some(index) = self.position_of(&resource) {
            let mut holder = self.active.remove(index);
            info!(
                resource = %resource,
                interrupted = holder.name(),
                by = command.name(),
                "resource preempted"
            );
            holder.end(true);
        }
        command.start();
        self.active.push(command);
    }

    /// Execute every active command once, retiring finished ones.
    pub fn run_cycle(&mut self) {
        self.cycle_count += 1;
        self.active.retain_mut(|command| {
            command.execute();
            if command.is_finished() {
                command.end(false);
                debug!(command = command.name(), "retired");
                false
            } else {
                true
            }
        });
    }

    /// Interrupt the command holding `resource`. Returns false if none.
    pub fn cancel(&mut self, resource: &ResourceId) -> bool {
        match self.position_of(resource) {
            Some(index) => {
                let mut command = self.active.remove(index);
                info!(resource = %resource, command = command.name(), "cancelled");
                command.end(true);
                true
            }
            None => false,
        }
    }

    /// Interrupt every active command.
    pub fn cancel_all(&mut self) {
        for mut command in self.active.drain(..) {
            info!(command = command.name(), "cancelled");
            command.end(true);
        }
    }

    /// True while a command holds `resource`.
    pub fn is_scheduled(&self, resource: &ResourceId) -> bool {
        self.position_of(resource).is_some()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    #[inline]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn active_names(&self) -> Vec<&str> {
        self.active.iter().map(|c| c.name()).collect()
    }

    fn position_of(&self, resource: &ResourceId) -> Option<usize> {
        self.active
            .iter()
            .position(|c| c.required_resource() == *resource)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
