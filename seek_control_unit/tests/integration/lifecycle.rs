//! Seek commands under the scheduler, driving simulated mechanisms.

use std::cell::Cell;
use std::rc::Rc;

use seek_control_unit::command::scheduler::CommandScheduler;
use seek_control_unit::command::seek::{SeekCommand, share};
use seek_control_unit::command::{Command, LifecycleState, ResourceId};
use seek_control_unit::controller::InterruptPolicy;

use super::{DT, Rig, turret_config};

fn turret_resource() -> ResourceId {
    ResourceId::new("turret")
}

#[test]
fn seek_until_at_target_releases_actuator() {
    let rig = Rig::turret();
    let plant = rig.plant.clone();
    let controller = share(rig.controller);
    let mut scheduler = CommandScheduler::new();

    scheduler.schedule(Box::new(
        SeekCommand::to_target(controller.clone(), 45.0).until_at_target(),
    ));
    assert!(scheduler.is_scheduled(&turret_resource()));

    let mut cycles = 0;
    while !scheduler.is_idle() && cycles < 1_000 {
        scheduler.run_cycle();
        plant.step(DT);
        cycles += 1;
    }

    assert!(scheduler.is_idle(), "command never finished");
    // Release stops the actuator; nothing keeps driving the plant.
    let released = plant.snapshot();
    assert_eq!(released.stop_count, 1);
    assert_eq!(released.output, 0.0);
    assert_eq!(controller.borrow().last_output(), 0.0);

    // Coasts to rest near the goal instead of creeping away.
    for _ in 0..100 {
        plant.step(DT);
    }
    let coasted = plant.snapshot();
    assert!(coasted.velocity.abs() < 1e-3);
    assert!((coasted.position - 45.0).abs() < 2.0, "coasted to {}", coasted.position);
}

#[test]
fn default_seek_never_finishes() {
    let rig = Rig::turret();
    let plant = rig.plant.clone();
    let controller = share(rig.controller);
    let mut scheduler = CommandScheduler::new();
    scheduler.schedule(Box::new(SeekCommand::to_target(controller.clone(), 10.0)));

    for _ in 0..500 {
        scheduler.run_cycle();
        plant.step(DT);
    }
    assert!(controller.borrow().at_target());
    assert!(scheduler.is_scheduled(&turret_resource()));
}

#[test]
fn new_seek_preempts_and_stops_previous() {
    let rig = Rig::turret();
    let plant = rig.plant.clone();
    let controller = share(rig.controller);
    let mut scheduler = CommandScheduler::new();

    scheduler.schedule(Box::new(SeekCommand::to_target(controller.clone(), 90.0)));
    for _ in 0..10 {
        scheduler.run_cycle();
        plant.step(DT);
    }
    let velocity_before = controller.borrow().setpoint().velocity;

    scheduler.schedule(Box::new(
        SeekCommand::to_target(controller.clone(), -90.0).until_at_target(),
    ));
    assert_eq!(plant.snapshot().stop_count, 1);
    assert_eq!(scheduler.active_names(), vec!["SeekTo(turret, -90)"]);
    assert_eq!(controller.borrow().goal().position, -90.0);

    // The profile continues from where it was; no velocity jump.
    scheduler.run_cycle();
    let velocity_after = controller.borrow().setpoint().velocity;
    assert!((velocity_after - velocity_before).abs() <= 360.0 * DT + 1e-9);
}

#[test]
fn tracking_seek_follows_supplier() {
    let rig = Rig::turret();
    let plant = rig.plant.clone();
    let controller = share(rig.controller);
    let target = Rc::new(Cell::new(30.0));
    let supplier = target.clone();
    let mut scheduler = CommandScheduler::new();
    scheduler.schedule(Box::new(SeekCommand::tracking(controller.clone(), move || {
        supplier.get()
    })));

    for _ in 0..300 {
        scheduler.run_cycle();
        plant.step(DT);
    }
    assert!(controller.borrow().at_target());

    target.set(-400.0);
    scheduler.run_cycle();
    assert_eq!(controller.borrow().goal().position, -180.0);
}

#[test]
fn cancel_applies_interrupt_policy() {
    let rig = Rig::turret();
    let plant = rig.plant.clone();
    let controller = share(
        rig.controller
            .with_interrupt_policy(InterruptPolicy::HoldOutput),
    );
    let mut scheduler = CommandScheduler::new();
    scheduler.schedule(Box::new(SeekCommand::to_target(controller.clone(), 90.0)));
    for _ in 0..5 {
        scheduler.run_cycle();
        plant.step(DT);
    }
    let held = controller.borrow().last_output();
    assert!(held > 0.0);

    assert!(scheduler.cancel(&turret_resource()));
    assert!(scheduler.is_idle());
    assert_eq!(plant.snapshot().stop_count, 0);
    assert!((plant.snapshot().output - held).abs() < 1e-12);
}

#[test]
fn independent_mechanisms_share_the_scheduler() {
    let turret = Rig::turret();
    let mut hood_config = turret_config();
    hood_config.name = "hood".to_string();
    hood_config.profile.min_setpoint = 0.0;
    hood_config.profile.max_setpoint = 60.0;
    let hood = Rig::new(hood_config);

    let (turret_plant, hood_plant) = (turret.plant.clone(), hood.plant.clone());
    let turret_ctrl = share(turret.controller);
    let hood_ctrl = share(hood.controller);
    let mut scheduler = CommandScheduler::new();
    scheduler.schedule(Box::new(
        SeekCommand::to_target(turret_ctrl.clone(), -45.0).until_at_target(),
    ));
    scheduler.schedule(Box::new(
        SeekCommand::to_target(hood_ctrl.clone(), 100.0).until_at_target(),
    ));
    assert_eq!(scheduler.active_names().len(), 2);

    for _ in 0..1_000 {
        if scheduler.is_idle() {
            break;
        }
        scheduler.run_cycle();
        turret_plant.step(DT);
        hood_plant.step(DT);
    }
    assert!(scheduler.is_idle());
    assert_eq!(hood_ctrl.borrow().goal().position, 60.0);
    assert_eq!(turret_plant.snapshot().stop_count, 1);
    assert_eq!(hood_plant.snapshot().stop_count, 1);
    assert!((turret_plant.snapshot().position + 45.0).abs() < 2.0);
    assert!((hood_plant.snapshot().position - 60.0).abs() < 2.0);
}

#[test]
fn lifecycle_states_follow_start_and_end() {
    let rig = Rig::turret();
    let controller = share(rig.controller);
    let mut command = SeekCommand::new(controller).resync_on_start();
    assert_eq!(command.lifecycle_state(), LifecycleState::Idle);
    command.start();
    assert_eq!(command.lifecycle_state(), LifecycleState::Seeking);
    command.execute();
    assert!(!command.is_finished());
    command.end(true);
    assert_eq!(command.lifecycle_state(), LifecycleState::Idle);
}
