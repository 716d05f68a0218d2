//! Closed-loop behaviour against the simulated plant, from configuration
//! file to settled mechanism.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;

use seek_common::telemetry::NullTelemetry;
use seek_common::tunable::MemoryTunableStore;
use seek_control_unit::command::scheduler::CommandScheduler;
use seek_control_unit::command::seek::{SeekCommand, share};
use seek_control_unit::config::load_config;
use seek_control_unit::cycle::{CycleControl, CycleRunner};
use seek_control_unit::sim::simulated_mechanism;

use super::{DT, Rig, turret_config};

const TURRET_TOML: &str = r#"
cycle_time_us = 20000

[shared]
service_name = "turret-sim"

[mechanism]
name = "turret"
min_setpoint = -90.0
max_setpoint = 90.0
max_velocity = 120.0
max_acceleration = 240.0
position_tolerance = 0.5

[mechanism.plant]
free_speed = 120.0
time_constant = 0.02
"#;

#[test]
fn config_file_to_settled_mechanism() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(TURRET_TOML.as_bytes()).unwrap();
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.mechanism.profile.max_velocity, 120.0);

    let (mut controller, plant) = simulated_mechanism(
        &config.mechanism,
        config.dt(),
        Arc::new(MemoryTunableStore::new()),
        Arc::new(NullTelemetry),
    )
    .unwrap();

    controller.set_target(75.0);
    for _ in 0..500 {
        controller.seek_target();
        plant.step(config.dt());
    }
    assert!(controller.at_target());
    assert!((plant.snapshot().position - 75.0).abs() < 0.5);
}

#[test]
fn inverted_geared_plant_is_transparent() {
    let mut plain = Rig::turret();
    let mut config = turret_config();
    config.plant.motor_inverted = true;
    config.plant.motor_rotations_per_mechanism_rotation = 100.0;
    let mut geared = Rig::new(config);

    plain.controller.set_target(-60.0);
    geared.controller.set_target(-60.0);
    for _ in 0..200 {
        plain.cycle();
        geared.cycle();
        let (a, b) = (plain.plant.snapshot(), geared.plant.snapshot());
        assert!((a.position - b.position).abs() < 1e-6);
    }
    assert!(geared.controller.at_target());
    assert!(geared.plant.snapshot().motor_position > 0.0);
}

#[test]
fn sustained_load_leaves_steady_state_error() {
    let mut rig = Rig::turret();
    rig.plant.set_load(0.05);
    rig.run(1_000);

    // No integral term: the position term settles where it cancels the
    // load, 0.05 × 360° = 18° off the goal.
    let measured = rig.plant.snapshot().position;
    assert!((measured - 18.0).abs() < 0.5, "settled at {measured}");
    assert!(!rig.controller.at_target());
    assert!((rig.controller.last_output() + 0.05).abs() < 1e-3);
}

#[test]
fn telemetry_reflects_the_cycle() {
    let mut rig = Rig::turret();
    rig.controller.set_target(45.0);
    rig.run(10);

    let before_step = rig.plant.snapshot();
    rig.controller.seek_target();
    let t = &rig.telemetry;
    let sp = rig.controller.setpoint();
    assert_eq!(t.get("turret/goal_position"), Some(45.0));
    assert_eq!(t.get("turret/goal_velocity"), Some(0.0));
    assert_eq!(t.get("turret/setpoint_position"), Some(sp.position));
    assert_eq!(t.get("turret/setpoint_velocity"), Some(sp.velocity));
    assert_eq!(t.get("turret/measured_position"), Some(before_step.position));
    assert_eq!(t.get("turret/measured_velocity"), Some(before_step.velocity));
    assert_eq!(
        t.get("turret/commanded_output"),
        Some(rig.plant.snapshot().output)
    );
    assert_eq!(t.snapshot().len(), 7);
}

#[test]
fn cycle_runner_chains_targets() {
    let rig = Rig::turret();
    let plant = rig.plant.clone();
    let controller = share(rig.controller);
    let mut scheduler = CommandScheduler::new();
    let mut targets: VecDeque<f64> = VecDeque::from([90.0, -45.0, 0.0]);
    let mut reached = Vec::new();

    let mut runner = CycleRunner::new(std::time::Duration::from_millis(20))
        .with_max_cycles(Some(5_000))
        .paced(false);

    let mut body = |_cycle: u64| {
        scheduler.run_cycle();
        plant.step(DT);
        if scheduler.is_idle() {
            match targets.pop_front() {
                Some(target) => {
                    reached.push(controller.borrow().goal().position);
                    scheduler.schedule(Box::new(
                        SeekCommand::to_target(controller.clone(), target).until_at_target(),
                    ));
                }
                None => return CycleControl::Stop,
            }
        }
        CycleControl::Continue
    };
    runner.run(&mut body).unwrap();

    assert!(runner.stats().cycle_count < 5_000);
    assert_eq!(controller.borrow().goal().position, 0.0);
    assert!(controller.borrow().at_target());
    // Every retired seek released the actuator.
    assert_eq!(plant.snapshot().stop_count, 3);
    assert_eq!(plant.snapshot().output, 0.0);
    // Goals seen when each new target was scheduled.
    assert_eq!(reached, vec![0.0, 90.0, -45.0]);
}
