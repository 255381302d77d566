//! End-to-end controller scenarios with literal expected values,
//! exercised through the full `Controller::update` path at the
//! 8 kHz sample rate.

use dyad_common::config::{ControllerConfig, TrapTrajConfig};
use dyad_common::error::{AxisError, ControllerError};
use dyad_common::state::{ControlMode, InputMode};
use dyad_control_unit::controller::Controller;
use dyad_control_unit::estimate::{AxisRegistry, MotorFeedback, AXIS_COUNT};

const DT: f32 = 1.0 / 8000.0;
const RATE: f32 = 8000.0;

fn registry_with_torque_limit(limit: f32) -> AxisRegistry {
    let mut registry = AxisRegistry::new([MotorFeedback::default(); AXIS_COUNT]);
    for i in 0..AXIS_COUNT {
        let axis = registry.axis_mut(i);
        axis.encoder.set(0.0, 0.0, 0.0);
        axis.motor.max_available_torque = limit;
    }
    registry
}

fn controller(configure: impl FnOnce(&mut ControllerConfig)) -> Controller {
    let mut config = ControllerConfig::default();
    configure(&mut config);
    Controller::new(config, TrapTrajConfig::default(), 0, RATE)
}

// ─── S1: passthrough torque ─────────────────────────────────────────

#[test]
fn s1_passthrough_torque_reaches_output_in_one_tick() {
    let mut ctrl = controller(|cfg| {
        cfg.input_mode = InputMode::Passthrough;
        cfg.control_mode = ControlMode::Torque;
        cfg.enable_vel_limit = false;
        cfg.enable_current_mode_vel_limit = false;
        cfg.enable_overspeed_error = false;
    });
    ctrl.input_torque = 3.0;

    let registry = registry_with_torque_limit(10.0);
    let torque = ctrl.update(&registry, DT).unwrap();
    assert_eq!(torque, 3.0);
}

// ─── S2: torque saturation + anti-windup hold ───────────────────────

#[test]
fn s2_saturated_tick_decays_integrator_by_exactly_0_99() {
    let mut ctrl = controller(|cfg| {
        cfg.control_mode = ControlMode::Velocity;
        cfg.input_mode = InputMode::Passthrough;
        cfg.vel_gain = 1.0;
        cfg.vel_integrator_gain = 10.0;
        cfg.enable_vel_limit = false;
        cfg.enable_overspeed_error = false;
    });
    ctrl.vel_integrator_torque = 5.0;
    ctrl.input_vel = 100.0;

    let registry = registry_with_torque_limit(1.0);
    let torque = ctrl.update(&registry, DT).unwrap();
    assert_eq!(torque, 1.0);
    assert_eq!(ctrl.vel_integrator_torque, 4.95);
}

// ─── S3: overspeed ──────────────────────────────────────────────────

#[test]
fn s3_overspeed_aborts_tick_and_latches() {
    let mut ctrl = controller(|cfg| {
        cfg.control_mode = ControlMode::Velocity;
        cfg.enable_overspeed_error = true;
        cfg.vel_limit = 10.0;
        cfg.vel_limit_tolerance = 1.2;
    });
    let mut registry = registry_with_torque_limit(10.0);
    registry.axis_mut(0).encoder.set(0.0, 0.0, 13.0);

    let result = ctrl.update(&registry, DT);
    assert!(result.is_err());
    assert!(ctrl.error().contains(ControllerError::OVERSPEED));
}

// ─── S4: circular position error wrap ───────────────────────────────

#[test]
fn s4_circular_error_wraps_to_short_arc() {
    let mut ctrl = controller(|cfg| {
        cfg.control_mode = ControlMode::Position;
        cfg.input_mode = InputMode::Passthrough;
        cfg.circular_setpoints = true;
        cfg.circular_setpoint_range = 1.0;
        cfg.pos_gain = 1.0;
        cfg.vel_gain = 1.0;
        cfg.vel_integrator_gain = 0.0;
        cfg.enable_overspeed_error = false;
    });
    ctrl.input_pos = 0.05;

    let mut registry = registry_with_torque_limit(10.0);
    registry.axis_mut(0).encoder.set(0.95, 0.95, 0.0);

    // pos_err = +0.10 (not -0.90); with unity gains and zero velocity
    // estimate the output torque equals vel_des = 0.10.
    let torque = ctrl.update(&registry, DT).unwrap();
    assert!((torque - 0.10).abs() < 1e-5, "torque = {torque}");
}

#[test]
fn s4_property_wrapped_error_is_congruent() {
    // pos_err ∈ [-R/2, R/2) and (pos_setpoint - pos_err) ≡ pos_circular
    // (mod R), observed through the proportional velocity contribution.
    let range = 1.0_f32;
    for (setpoint, estimate) in [(0.05, 0.95), (0.95, 0.05), (0.5, 0.0), (0.75, 0.25)] {
        let mut ctrl = controller(|cfg| {
            cfg.control_mode = ControlMode::Position;
            cfg.input_mode = InputMode::Passthrough;
            cfg.circular_setpoints = true;
            cfg.circular_setpoint_range = range;
            cfg.pos_gain = 1.0;
            cfg.vel_gain = 1.0;
            cfg.vel_integrator_gain = 0.0;
            cfg.enable_overspeed_error = false;
            cfg.enable_vel_limit = false;
        });
        ctrl.input_pos = setpoint;
        let mut registry = registry_with_torque_limit(100.0);
        registry.axis_mut(0).encoder.set(estimate, estimate, 0.0);

        let pos_err = ctrl.update(&registry, DT).unwrap();
        assert!(
            (-range / 2.0..range / 2.0).contains(&pos_err),
            "pos_err {pos_err} out of range for ({setpoint}, {estimate})"
        );
        // Congruence: setpoint - err differs from the estimate by a
        // multiple of the range.
        let residue = (setpoint - pos_err - estimate).rem_euclid(range);
        assert!(
            residue < 1e-4 || (range - residue) < 1e-4,
            "not congruent: ({setpoint}, {estimate}) -> {pos_err}"
        );
    }
}

// ─── S5: trajectory handoff ─────────────────────────────────────────

#[test]
fn s5_trajectory_handoff_locks_position_hold() {
    let mut ctrl = controller(|cfg| {
        cfg.control_mode = ControlMode::Position;
        cfg.input_mode = InputMode::TrapTraj;
        cfg.enable_overspeed_error = false;
        cfg.vel_limit = 100.0;
    });
    // Planned profile: 1 turn at vmax=4, a=d=16 → Tf = 0.5 s.
    ctrl.traj_config = TrapTrajConfig {
        vel_limit: 4.0,
        accel_limit: 16.0,
        decel_limit: 16.0,
    };
    ctrl.set_input_pos(1.0);

    let mut registry = registry_with_torque_limit(10.0);
    let mut ticks = 0u32;
    while !ctrl.trajectory_done() {
        let pos = ctrl.pos_setpoint();
        let vel = ctrl.vel_setpoint();
        registry
            .axis_mut(0)
            .encoder
            .set(pos, pos.rem_euclid(1.0), vel);
        ctrl.update(&registry, DT).unwrap();
        ticks += 1;
        assert!(ticks < 100_000, "trajectory never completed");
    }

    assert_eq!(ctrl.config.control_mode, ControlMode::Position);
    assert_eq!(ctrl.pos_setpoint(), 1.0);
    assert_eq!(ctrl.vel_setpoint(), 0.0);
    assert_eq!(ctrl.torque_setpoint(), 0.0);
    assert!(ctrl.trajectory_done());
}

// ─── S6: anticogging bin update ─────────────────────────────────────

#[test]
fn s6_calibration_updates_straddling_bins() {
    let mut ctrl = controller(|cfg| {
        cfg.control_mode = ControlMode::Velocity;
        cfg.input_mode = InputMode::Passthrough;
        cfg.anticogging.calibrating = true;
        cfg.anticogging.integrator_gain = 0.1;
        cfg.anticogging.max_torque = 1.0;
        cfg.anticogging.cogging_map_size = 1024;
        cfg.vel_gain = 0.0;
        cfg.vel_integrator_gain = 0.0;
        cfg.enable_overspeed_error = false;
    });
    // vel_error = vel_setpoint - vel_estimate = 1.0.
    ctrl.input_vel = 1.0;

    let mut registry = registry_with_torque_limit(10.0);
    let pos = 0.25 + 0.5 / 1024.0;
    registry.axis_mut(0).encoder.set(pos, pos, 0.0);

    ctrl.update(&registry, DT).unwrap();

    // i = 256, i1 = 257, f = 0.5: each bin gains 0.5 · 0.1 · dt = 6.25e-6.
    let expected = 0.5 * 0.1 * DT;
    assert!((expected - 6.25e-6).abs() < 1e-9);
    let bins = ctrl.anticogging_map().bins();
    assert!((bins[256] - expected).abs() < 1e-10, "bin 256 = {}", bins[256]);
    assert!((bins[257] - expected).abs() < 1e-10, "bin 257 = {}", bins[257]);
    for (i, &bin) in bins.iter().enumerate() {
        if i != 256 && i != 257 {
            assert_eq!(bin, 0.0, "bin {i} unexpectedly mutated");
        }
    }
}

// ─── Cross-cutting invariants ───────────────────────────────────────

#[test]
fn torque_never_exceeds_available_limit() {
    // Sweep a grid of aggressive inputs; every produced torque must
    // stay inside the motor's live limit, including zero authority.
    for limit in [0.0_f32, 0.5, 1.0, 10.0] {
        for target in [-500.0_f32, -5.0, 0.0, 5.0, 500.0] {
            let mut ctrl = controller(|cfg| {
                cfg.control_mode = ControlMode::Velocity;
                cfg.input_mode = InputMode::Passthrough;
                cfg.vel_gain = 3.0;
                cfg.vel_integrator_gain = 5.0;
                cfg.enable_vel_limit = false;
                cfg.enable_overspeed_error = false;
            });
            ctrl.input_vel = target;
            let registry = registry_with_torque_limit(limit);
            for _ in 0..50 {
                let torque = ctrl.update(&registry, DT).unwrap();
                assert!(
                    torque.abs() <= limit,
                    "torque {torque} beyond limit {limit} for target {target}"
                );
            }
        }
    }
}

#[test]
fn integrator_is_zero_whenever_velocity_loop_inactive() {
    for mode in [ControlMode::Voltage, ControlMode::Torque] {
        let mut ctrl = controller(|cfg| {
            cfg.control_mode = mode;
            cfg.input_mode = InputMode::Passthrough;
            cfg.enable_overspeed_error = false;
            cfg.enable_current_mode_vel_limit = false;
        });
        ctrl.vel_integrator_torque = 7.5;
        let registry = registry_with_torque_limit(10.0);
        ctrl.update(&registry, DT).unwrap();
        assert_eq!(ctrl.vel_integrator_torque, 0.0, "mode {mode:?}");
    }
}

#[test]
fn map_bins_stay_clamped_under_calibration_abuse() {
    let mut ctrl = controller(|cfg| {
        cfg.control_mode = ControlMode::Velocity;
        cfg.input_mode = InputMode::Passthrough;
        cfg.anticogging.calibrating = true;
        cfg.anticogging.integrator_gain = 1000.0;
        cfg.anticogging.max_torque = 0.5;
        cfg.anticogging.cogging_map_size = 64;
        cfg.vel_gain = 0.0;
        cfg.vel_integrator_gain = 0.0;
        cfg.enable_vel_limit = false;
        cfg.enable_overspeed_error = false;
    });
    ctrl.input_vel = 50.0;

    let mut registry = registry_with_torque_limit(10.0);
    for tick in 0..5000 {
        let pos = tick as f32 * 0.013;
        registry.axis_mut(0).encoder.set(pos, pos.rem_euclid(1.0), 0.0);
        ctrl.update(&registry, DT).unwrap();
        for &bin in ctrl.anticogging_map().bins() {
            assert!(bin.abs() <= 0.5 + 1e-6, "bin escaped clamp: {bin}");
        }
    }
}

#[test]
fn remove_bias_centers_the_map_and_is_idempotent() {
    let mut ctrl = controller(|cfg| {
        cfg.anticogging.cogging_map_size = 128;
    });
    for (i, bin) in ctrl.anticogging_map_mut().bins_mut().iter_mut().enumerate() {
        *bin = 0.2 + 0.001 * i as f32;
    }
    ctrl.anticogging_remove_bias();
    let sum: f32 = ctrl.anticogging_map().bins().iter().sum();
    assert!(sum.abs() < 1e-4, "mean not removed: {sum}");

    let snapshot: Vec<f32> = ctrl.anticogging_map().bins().to_vec();
    ctrl.anticogging_remove_bias();
    for (a, b) in snapshot.iter().zip(ctrl.anticogging_map().bins()) {
        assert!((a - b).abs() < 1e-6, "second de-bias moved a bin");
    }
}

#[test]
fn failed_tick_propagates_to_axis_latch() {
    use dyad_control_unit::axis::Axis;

    let ctrl = controller(|cfg| {
        cfg.control_mode = ControlMode::Velocity;
        cfg.enable_overspeed_error = true;
        cfg.vel_limit = 10.0;
        cfg.vel_limit_tolerance = 1.2;
    });
    let mut axis = Axis::new(0, ctrl);
    let mut registry = registry_with_torque_limit(10.0);
    registry.axis_mut(0).encoder.set(0.0, 0.0, 13.0);

    assert!(axis.tick(&registry, DT).is_none());
    assert!(axis.error.contains(AxisError::CONTROLLER_FAILED));
    assert!(axis.controller.error().contains(ControllerError::OVERSPEED));
}
