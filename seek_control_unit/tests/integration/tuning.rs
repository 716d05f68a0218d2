//! Live tuning through the tunable store, and locked mode.

use std::sync::Arc;

use seek_common::tunable::{MemoryTunableStore, TunableValue};

use super::{DT, Rig, turret_config};

const EPS: f64 = 1e-9;

fn cruise_to_far_goal(rig: &mut Rig) {
    rig.controller.set_target(170.0);
    rig.run(30);
    assert!((rig.controller.setpoint().velocity - 180.0).abs() < EPS);
}

#[test]
fn construction_publishes_namespaced_keys() {
    let rig = Rig::turret();
    let keys = rig.store.keys();
    for field in [
        "min_setpoint",
        "max_setpoint",
        "max_velocity",
        "max_acceleration",
        "position_tolerance",
        "initial_position",
        "initial_velocity",
        "verbose",
    ] {
        let key = format!("turret/{field}");
        assert!(keys.contains(&key), "missing {key}");
    }
    assert_eq!(
        rig.store.get("turret/max_velocity"),
        Some(TunableValue::Number(180.0))
    );
}

#[test]
fn lowered_velocity_limit_applies_next_cycle() {
    let mut rig = Rig::turret();
    cruise_to_far_goal(&mut rig);

    rig.store.set_number("turret/max_velocity", 90.0);
    rig.cycle();
    let v = rig.controller.setpoint().velocity;
    assert!((v - (180.0 - 360.0 * DT)).abs() < EPS, "ramps down, got {v}");

    for _ in 0..20 {
        rig.cycle();
        assert!(rig.controller.setpoint().velocity <= 180.0);
    }
    let v = rig.controller.setpoint().velocity;
    assert!((v - 90.0).abs() < EPS);
    // Feedforward normalizes by the live limit.
    assert!((rig.controller.last_terms().velocity_term - 1.0).abs() < EPS);
}

#[test]
fn raised_acceleration_limit_applies_next_cycle() {
    let mut rig = Rig::turret();
    rig.store.set_number("turret/max_acceleration", 720.0);
    rig.controller.set_target(90.0);
    rig.cycle();
    assert!((rig.controller.setpoint().velocity - 720.0 * DT).abs() < EPS);
}

#[test]
fn live_bounds_clamp_new_targets() {
    let mut rig = Rig::turret();
    rig.store.set_number("turret/max_setpoint", 45.0);
    rig.controller.set_target(90.0);
    assert_eq!(rig.controller.goal().position, 45.0);

    // An inverted live range never panics; the lower bound wins.
    rig.store.set_number("turret/min_setpoint", 60.0);
    rig.controller.set_target(0.0);
    assert_eq!(rig.controller.goal().position, 60.0);
}

#[test]
fn live_tolerance_changes_convergence() {
    let mut rig = Rig::turret();
    rig.plant.set_position(5.0);
    assert!(!rig.controller.at_target());
    rig.store.set_number("turret/position_tolerance", 10.0);
    assert!(rig.controller.at_target());
}

#[test]
fn degenerate_limits_become_epsilon() {
    let mut rig = Rig::turret();
    rig.store.set_number("turret/max_velocity", -5.0);
    rig.store.set_number("turret/max_acceleration", 0.0);
    rig.controller.set_target(90.0);
    rig.run(50);

    let sp = rig.controller.setpoint();
    assert!(sp.is_finite());
    assert!(sp.velocity.abs() < 1e-3);
    assert!(rig.controller.last_output().is_finite());
    assert!(rig.controller.last_output().abs() <= 1.0);
}

#[test]
fn locked_store_ignores_writes() {
    let store = Arc::new(MemoryTunableStore::with_locked(true));
    let mut rig = Rig::with_store(turret_config(), store);
    // Locked reads bypass the store entirely.
    assert!(rig.store.keys().is_empty());

    rig.store.set_number("turret/max_velocity", 10.0);
    rig.store.set_number("turret/max_setpoint", 20.0);
    cruise_to_far_goal(&mut rig);
    assert_eq!(rig.controller.goal().position, 170.0);

    rig.store.set_locked(false);
    rig.cycle();
    assert!(rig.controller.setpoint().velocity < 180.0);
    rig.controller.set_target(170.0);
    assert_eq!(rig.controller.goal().position, 20.0);
}

#[test]
fn reads_are_stable_between_writes() {
    let rig = Rig::turret();
    let tunables = rig.controller.tunables();
    let first = tunables.profile();
    let second = tunables.profile();
    assert_eq!(first, second);
}
