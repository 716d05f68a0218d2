//! Properties that must hold for every input, checked with proptest.

use std::sync::Arc;

use proptest::prelude::*;
use seek_common::actuator::{MeasurementSource, OutputSink};
use seek_common::mechanism::SetAndSeekConfig;
use seek_common::motion::{MotionConstraints, ProfileState};
use seek_common::telemetry::NullTelemetry;
use seek_common::tunable::MemoryTunableStore;
use seek_control_unit::control::output::{OutputLimits, shape_output};
use seek_control_unit::control::profile::profile_calculate;
use seek_control_unit::controller::{Collaborators, ProfiledSetpointController};

use super::DT;

const EPS: f64 = 1e-9;

/// Measurement fixed by the test; output discarded.
#[derive(Debug, Default)]
struct Fixed {
    position: f64,
}

impl MeasurementSource for Fixed {
    fn position(&self) -> f64 {
        self.position
    }
    fn velocity(&self) -> f64 {
        0.0
    }
}

impl OutputSink for Fixed {
    fn set_output(&mut self, _value: f64) {}
    fn stop(&mut self) {}
}

fn controller(config: SetAndSeekConfig, measured: f64) -> ProfiledSetpointController<Fixed, Fixed> {
    ProfiledSetpointController::new(
        "turret",
        config,
        DT,
        Collaborators {
            measurement: Fixed { position: measured },
            output: Fixed::default(),
            tunables: Arc::new(MemoryTunableStore::new()),
            telemetry: Arc::new(NullTelemetry),
        },
    )
    .unwrap()
}

proptest! {
    #[test]
    fn set_target_always_clamps(target in -1.0e6f64..1.0e6, lo in -500.0f64..0.0, hi in 0.0f64..500.0) {
        let config = SetAndSeekConfig {
            min_setpoint: lo,
            max_setpoint: hi,
            ..Default::default()
        };
        let mut c = controller(config, 0.0);
        c.set_target(target);
        prop_assert_eq!(c.goal(), ProfileState::at_rest(target.clamp(lo, hi)));
    }

    #[test]
    fn synchronize_sets_exact_state(p in -1.0e4f64..1.0e4, v in -1.0e3f64..1.0e3) {
        let mut c = controller(SetAndSeekConfig::default(), 0.0);
        c.synchronize_to_measurement(p, v);
        prop_assert_eq!(c.setpoint(), ProfileState::new(p, v));
        prop_assert_eq!(c.goal(), ProfileState::at_rest(p));
    }

    #[test]
    fn at_target_depends_only_on_goal_and_measurement(
        goal in -180.0f64..180.0,
        measured in -180.0f64..180.0,
        sp in -180.0f64..180.0,
    ) {
        let mut c = controller(SetAndSeekConfig::default(), measured);
        c.synchronize_to_measurement(sp, 0.0);
        c.set_target(goal);
        prop_assert_eq!(c.at_target(), (goal - measured).abs() <= 1.0);
    }

    #[test]
    fn profile_respects_limits_and_converges(
        start_p in -180.0f64..180.0,
        start_v in -180.0f64..180.0,
        goal in -180.0f64..180.0,
        max_v in 10.0f64..400.0,
        max_a in 10.0f64..800.0,
    ) {
        let c = MotionConstraints::new(max_v, max_a);
        let target = ProfileState::at_rest(goal);
        let mut prev = ProfileState::new(start_p, start_v.clamp(-max_v, max_v));
        let mut converged = false;
        for _ in 0..5_000 {
            let next = profile_calculate(DT, prev, target, &c);
            prop_assert!(next.velocity.abs() <= max_v + 1e-6);
            prop_assert!((next.velocity - prev.velocity).abs() <= max_a * DT + 1e-6);
            prev = next;
            if (prev.position - goal).abs() < EPS && prev.velocity.abs() < EPS {
                converged = true;
                break;
            }
        }
        prop_assert!(converged, "did not converge: {:?}", prev);
    }

    #[test]
    fn output_is_always_normalized(
        sp_p in -1.0e4f64..1.0e4,
        sp_v in -1.0e4f64..1.0e4,
        measured in -1.0e4f64..1.0e4,
        max_v in -500.0f64..500.0,
        lo in -500.0f64..500.0,
        span in 0.0f64..1000.0,
    ) {
        let limits = OutputLimits { max_velocity: max_v, min_setpoint: lo, max_setpoint: lo + span };
        let out = shape_output(&limits, &ProfileState::new(sp_p, sp_v), measured);
        prop_assert!(out.command.abs() <= 1.0);
        prop_assert!(out.velocity_term.abs() <= 1.0);
        prop_assert!(out.position_term.abs() <= 1.0);
    }
}
