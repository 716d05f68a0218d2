//! # Seek Control Unit
//!
//! Runs one simulated set-and-seek mechanism from a TOML configuration.
//!
//! Each `--target` is scheduled in turn as a seek command that finishes
//! when the mechanism reports `at_target`. Without targets the mechanism
//! holds its position until `--cycles` elapse or Ctrl-C. The loop runs
//! back-to-back unless `--realtime` paces it at the configured cycle time.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::Parser;
use seek_common::config::{ControlLoopConfig, LogLevel};
use seek_common::consts::DEFAULT_CONFIG_PATH;
use seek_common::telemetry::TracingTelemetry;
use seek_common::tunable::MemoryTunableStore;
use seek_control_unit::command::Command;
use seek_control_unit::command::scheduler::CommandScheduler;
use seek_control_unit::command::seek::{SeekCommand, SharedController, share};
use seek_control_unit::config::load_config;
use seek_control_unit::cycle::{CycleControl, CycleRunner, rt_setup};
use seek_control_unit::sim::{SimHandle, simulated_mechanism};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Seek Control Unit: profiled set-and-seek simulation
#[derive(Parser, Debug)]
#[command(name = "seek_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Trapezoidal set-and-seek control loop for a single actuator")]
struct Args {
    /// Path to the control loop configuration TOML.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Target position; repeat to chain moves.
    #[arg(long = "target", allow_negative_numbers = true)]
    targets: Vec<f64>,

    /// Stop after this many cycles.
    #[arg(long)]
    cycles: Option<u64>,

    /// Pace cycles in real time (RT scheduling with the `rt` feature).
    #[arg(long)]
    realtime: bool,

    /// CPU core to pin the control thread to (with --realtime).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (with --realtime).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args.config);
    setup_tracing(&args, config.as_ref().ok().map(|c| c.shared.log_level));

    info!("Seek Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {}: {e}", args.config.display());
            process::exit(1);
        }
    };

    if let Err(e) = run(&args, &config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Seek Control Unit shutdown complete");
}

fn run(args: &Args, config: &ControlLoopConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mechanism = &config.mechanism;
    let dt = config.dt();
    info!(
        service = %config.shared.service_name,
        mechanism = %mechanism.name,
        cycle_time_us = config.cycle_time_us,
        locked = config.locked,
        "Config OK"
    );

    let tunables = Arc::new(MemoryTunableStore::with_locked(config.locked));
    let (controller, plant) =
        simulated_mechanism(mechanism, dt, tunables, Arc::new(TracingTelemetry))?;
    let controller = share(controller);

    if args.realtime {
        rt_setup(args.cpu_core, args.rt_priority)?;
    }

    let mut runner = CycleRunner::new(config.cycle_time())
        .with_max_cycles(args.cycles)
        .paced(args.realtime);
    let running = runner.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let mut scheduler = CommandScheduler::new();
    let mut targets: VecDeque<f64> = args.targets.iter().copied().collect();
    if targets.is_empty() {
        scheduler.schedule(Box::new(
            SeekCommand::new(controller.clone())
                .resync_on_start()
                .named(format!("Hold({})", mechanism.name)),
        ));
    } else {
        schedule_next(&mut scheduler, &controller, &mut targets);
    }

    {
        let mut body = |_cycle: u64| {
            scheduler.run_cycle();
            plant.step(dt);
            if scheduler.is_idle() && !schedule_next(&mut scheduler, &controller, &mut targets) {
                return CycleControl::Stop;
            }
            CycleControl::Continue
        };
        runner.run(&mut body)?;
    }

    scheduler.cancel_all();
    log_summary(&runner, &controller, &plant, dt);
    Ok(())
}

/// Schedule a seek to the next queued target. False when the queue is empty.
fn schedule_next(
    scheduler: &mut CommandScheduler,
    controller: &SharedController<SimHandle, SimHandle>,
    targets: &mut VecDeque<f64>,
) -> bool {
    let Some(target) = targets.pop_front() else {
        return false;
    };
    let command = SeekCommand::to_target(controller.clone(), target).until_at_target();
    let name = command.name().to_string();
    scheduler.schedule(Box::new(command));

    let controller = controller.borrow();
    info!(
        position = target,
        goal = controller.goal().position,
        expected_s = controller.time_to_goal(),
        command = %name,
        "next target"
    );
    true
}

fn log_summary(
    runner: &CycleRunner,
    controller: &SharedController<SimHandle, SimHandle>,
    plant: &SimHandle,
    dt: f64,
) {
    let stats = runner.stats();
    let controller = controller.borrow();
    let snapshot = plant.snapshot();
    info!(
        cycles = stats.cycle_count,
        sim_time_s = stats.cycle_count as f64 * dt,
        avg_cycle_ns = stats.avg_cycle_ns(),
        max_cycle_ns = stats.max_cycle_ns,
        overruns = stats.overruns,
        "Cycle statistics"
    );
    info!(
        goal = controller.goal().position,
        setpoint = controller.setpoint().position,
        measured = snapshot.position,
        velocity = snapshot.velocity,
        at_target = controller.at_target(),
        "Final state"
    );
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let directive: Directive = if args.verbose {
        Level::DEBUG.into()
    } else {
        configured
            .unwrap_or_default()
            .as_directive()
            .parse()
            .unwrap_or_else(|_| Level::INFO.into())
    };

    let filter = EnvFilter::from_default_env().add_directive(directive);

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
