//! Fixed-period control cycle.
//!
//! Calls a [`CycleBody`] once per `cycle_time` until the body asks to stop,
//! the cycle limit is reached, or the shared running flag is cleared
//! (Ctrl-C).
//!
//! ## Pacing
//! - `rt` feature: absolute-time sleep on `CLOCK_MONOTONIC` for drift-free
//!   pacing; a single overrun aborts with [`CycleError::CycleOverrun`].
//! - default: `std::thread::sleep` for the remaining time; overruns are
//!   counted and logged.
//! - unpaced: back-to-back cycles, for simulation faster than real time.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` to one core.
//! 4. `sched_setscheduler(SCHED_FIFO, priority)`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle body duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles whose body exceeded the period.
    pub overruns: u64,
    /// Maximum wake-up latency [ns] (time between expected and actual wake).
    pub max_latency_ns: i64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("RT setup error: {0}")]
    RtSetup(String),

    #[error("cycle overrun: {actual_ns}ns > {budget_ns}ns budget")]
    CycleOverrun { actual_ns: i64, budget_ns: i64 },
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned, exclusive reference.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Prepare the calling thread for real-time execution.
///
/// A no-op apart from stack prefaulting without the `rt` feature.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    debug!(cpu_core, rt_priority, rt = cfg!(feature = "rt"), "rt setup complete");
    Ok(())
}

// ─── Cycle Body ─────────────────────────────────────────────────────

/// Returned by the body to keep or end the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleControl {
    Continue,
    Stop,
}

/// Work performed once per cycle.
pub trait CycleBody {
    /// `cycle` counts from 0.
    fn run_cycle(&mut self, cycle: u64) -> CycleControl;
}

impl<F: FnMut(u64) -> CycleControl> CycleBody for F {
    #[inline]
    fn run_cycle(&mut self, cycle: u64) -> CycleControl {
        self(cycle)
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Fixed-period loop driver.
#[derive(Debug)]
pub struct CycleRunner {
    cycle_time_ns: i64,
    max_cycles: Option<u64>,
    paced: bool,
    running: Arc<AtomicBool>,
    stats: CycleStats,
}

impl CycleRunner {
    pub fn new(cycle_time: Duration) -> Self {
        Self {
            cycle_time_ns: i64::try_from(cycle_time.as_nanos()).unwrap_or(i64::MAX),
            max_cycles: None,
            paced: true,
            running: Arc::new(AtomicBool::new(true)),
            stats: CycleStats::new(),
        }
    }

    /// Stop after `max` cycles.
    pub fn with_max_cycles(mut self, max: Option<u64>) -> Self {
        self.max_cycles = max;
        self
    }

    /// Sleep between cycles (`true`) or run back-to-back.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    /// Flag that ends the loop when cleared from another thread.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Run until the body stops, the limit is reached, or the flag clears.
    pub fn run<B: CycleBody>(&mut self, body: &mut B) -> Result<(), CycleError> {
        if !self.paced {
            return self.run_unpaced(body);
        }

        #[cfg(feature = "rt")]
        {
            self.run_rt_loop(body)
        }

        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop(body)
        }
    }

    #[inline]
    fn should_continue(&self) -> bool {
        self.running.load(Ordering::Relaxed)
            && self
                .max_cycles
                .is_none_or(|max| self.stats.cycle_count < max)
    }

    fn run_unpaced<B: CycleBody>(&mut self, body: &mut B) -> Result<(), CycleError> {
        while self.should_continue() {
            let cycle_start = Instant::now();
            let control = body.run_cycle(self.stats.cycle_count);
            self.stats.record(elapsed_ns(cycle_start), 0);
            if control == CycleControl::Stop {
                break;
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "rt"))]
    fn run_sim_loop<B: CycleBody>(&mut self, body: &mut B) -> Result<(), CycleError> {
        let cycle_duration = Duration::from_nanos(self.cycle_time_ns.max(0) as u64);

        while self.should_continue() {
            let cycle_start = Instant::now();
            let control = body.run_cycle(self.stats.cycle_count);
            let elapsed = cycle_start.elapsed();
            let duration_ns = elapsed_ns(cycle_start);

            self.stats.record(duration_ns, 0);
            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
                warn!(
                    actual_ns = duration_ns,
                    budget_ns = self.cycle_time_ns,
                    "cycle overrun"
                );
            }
            if control == CycleControl::Stop {
                break;
            }

            if let Some(remaining) = cycle_duration.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }

    #[cfg(feature = "rt")]
    fn run_rt_loop<B: CycleBody>(&mut self, body: &mut B) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || {
            clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))
        };
        let mut next_wake = now()?;

        while self.should_continue() {
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            let cycle_start = now()?;
            let wake_latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();

            let control = body.run_cycle(self.stats.cycle_count);

            let cycle_end = now()?;
            let duration_ns = timespec_diff_ns(&cycle_end, &cycle_start);
            self.stats.record(duration_ns, wake_latency_ns);

            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
                return Err(CycleError::CycleOverrun {
                    actual_ns: duration_ns,
                    budget_ns: self.cycle_time_ns,
                });
            }
            if control == CycleControl::Stop {
                break;
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }
}

#[inline]
fn elapsed_ns(since: Instant) -> i64 {
    i64::try_from(since.elapsed().as_nanos()).unwrap_or(i64::MAX)
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    while nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// `a - b` in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
