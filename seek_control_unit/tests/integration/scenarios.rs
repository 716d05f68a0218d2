//! Reference scenarios on the turret: a plain move, a mid-motion reversal,
//! an out-of-range request, and a disabled mechanism.

use seek_common::motion::ProfileState;

use super::{DT, Rig, turret_config};

const EPS: f64 = 1e-9;
const MAX_VELOCITY: f64 = 180.0;
const MAX_ACCELERATION: f64 = 360.0;

// ─── Scenario A: move from rest ─────────────────────────────────────

#[test]
fn move_from_rest_reaches_goal() {
    let mut rig = Rig::turret();
    rig.controller.set_target(90.0);

    let mut previous = rig.controller.setpoint();
    let mut cycles = 0;
    while (rig.controller.setpoint().position - 90.0).abs() > EPS && cycles < 500 {
        rig.cycle();
        let sp = rig.controller.setpoint();
        assert!(sp.velocity.abs() <= MAX_VELOCITY + EPS);
        assert!((sp.velocity - previous.velocity).abs() <= MAX_ACCELERATION * DT + EPS);
        assert!(sp.position <= 90.0 + EPS, "setpoint overshoot at {}", sp.position);
        previous = sp;
        cycles += 1;
    }

    // 90° at 360°/s² touches 180°/s at 0.5 s: a 1 s triangle.
    assert!(cycles <= 51, "took {cycles} cycles");
    let sp = rig.controller.setpoint();
    assert!((sp.position - 90.0).abs() < 1.0);
    assert!(sp.velocity.abs() < EPS);
    assert_eq!(rig.controller.goal(), ProfileState::at_rest(90.0));

    // The plant lags the setpoint and settles afterwards.
    rig.run(200);
    assert!(rig.controller.at_target());
}

// ─── Scenario B: reversal mid-profile ───────────────────────────────

#[test]
fn reversal_decelerates_before_changing_direction() {
    let mut rig = Rig::turret();
    rig.controller.set_target(90.0);
    rig.run(15);
    let before = rig.controller.setpoint();
    assert!(before.velocity > 100.0, "should be well into the move");

    rig.controller.set_target(-90.0);

    let mut velocities = vec![before.velocity];
    for _ in 0..200 {
        rig.cycle();
        velocities.push(rig.controller.setpoint().velocity);
    }

    let reversal = velocities
        .iter()
        .position(|v| *v < 0.0)
        .expect("velocity must eventually reverse");
    assert!(reversal > 1);

    for pair in velocities[..reversal].windows(2) {
        assert!(pair[1] < pair[0], "speed must fall monotonically before reversing");
    }
    for pair in velocities.windows(2) {
        assert!((pair[1] - pair[0]).abs() <= MAX_ACCELERATION * DT + EPS);
    }
    // Crosses zero from a small positive speed, not from cruise.
    assert!(velocities[reversal - 1] <= MAX_ACCELERATION * DT + EPS);

    let sp = rig.controller.setpoint();
    assert!((sp.position + 90.0).abs() < EPS);
    assert!(sp.velocity.abs() < EPS);
}

// ─── Scenario C: out-of-range target ────────────────────────────────

#[test]
fn out_of_range_target_is_clamped() {
    let mut rig = Rig::turret();
    rig.controller.set_target(500.0);
    assert_eq!(rig.controller.goal(), ProfileState::at_rest(180.0));

    rig.run(300);
    assert!((rig.controller.setpoint().position - 180.0).abs() < EPS);
    assert!(rig.controller.at_target());

    rig.controller.set_target(-500.0);
    assert_eq!(rig.controller.goal(), ProfileState::at_rest(-180.0));
}

// ─── Disabled mechanism ─────────────────────────────────────────────

#[test]
fn disabled_mechanism_ignores_commands() {
    let mut config = turret_config();
    config.profile.enabled = false;
    let mut rig = Rig::new(config);

    rig.controller.set_target(90.0);
    rig.run(50);

    assert_eq!(rig.controller.goal(), ProfileState::at_rest(0.0));
    assert_eq!(rig.controller.setpoint(), ProfileState::at_rest(0.0));
    assert_eq!(rig.plant.snapshot().position, 0.0);
    assert!(rig.controller.at_target());
    assert!(rig.telemetry.snapshot().is_empty());
}

#[test]
fn disable_mid_motion_stops_then_enable_resumes_from_measurement() {
    let mut rig = Rig::turret();
    rig.controller.set_target(120.0);
    rig.run(20);

    rig.controller.disable();
    assert_eq!(rig.plant.snapshot().output, 0.0);
    assert_eq!(rig.plant.snapshot().stop_count, 1);
    rig.run(50);
    let coasted = rig.plant.snapshot().position;

    rig.controller.enable();
    assert!((rig.controller.setpoint().position - coasted).abs() < EPS);
    assert!((rig.controller.goal().position - coasted).abs() < EPS);

    rig.controller.set_target(120.0);
    rig.run(300);
    assert!(rig.controller.at_target());
}
