//! Pure helpers for the position→velocity→torque cascade.
//!
//! Orchestration and state live in [`crate::controller`]; everything
//! here is a stateless function of its arguments.

/// Factor applied to the velocity integrator on a saturated tick.
// TODO: expose the decay factor in ControllerConfig.
pub const VEL_INTEGRATOR_DECAY: f32 = 0.99;

/// V-shaped gain scheduling multiplier.
///
/// Inside the scheduling band the velocity-loop gains are scaled down
/// linearly with `|pos_err|`, reaching zero at zero error, which
/// suppresses limit-cycling around the target. Outside the band (or
/// when disabled) the multiplier is 1.
#[inline]
pub fn gain_scheduling_multiplier(pos_err: f32, width: f32, enabled: bool) -> f32 {
    let abs_err = pos_err.abs();
    if enabled && width > 0.0 && abs_err <= width {
        abs_err / width
    } else {
        1.0
    }
}

/// Torque clamp for torque-mode velocity limiting.
///
/// Bounds the torque command to what the proportional velocity loop
/// would output at the `±vel_limit` boundaries, so a pure torque
/// command cannot accelerate the axis past the velocity limit.
#[inline]
pub fn limit_vel(vel_limit: f32, vel_estimate: f32, vel_gain: f32, torque: f32) -> f32 {
    let t_max = (vel_limit - vel_estimate) * vel_gain;
    let t_min = (-vel_limit - vel_estimate) * vel_gain;
    torque.max(t_min).min(t_max)
}

/// Effective rotor flux for ACIM gain normalisation: the flux estimate
/// with its magnitude floored at `min_flux`, sign preserved.
#[inline]
pub fn acim_effective_flux(rotor_flux: f32, min_flux: f32) -> f32 {
    if rotor_flux.abs() < min_flux {
        min_flux.copysign(rotor_flux)
    } else {
        rotor_flux
    }
}

/// Clamp a torque command to `±limit`, reporting whether it saturated.
#[inline]
pub fn saturate(torque: f32, limit: f32) -> (f32, bool) {
    if torque > limit {
        (limit, true)
    } else if torque < -limit {
        (-limit, true)
    } else {
        (torque, false)
    }
}

/// Velocity-integrator anti-windup step.
///
/// - Velocity loop inactive → the accumulator is held at zero.
/// - Output saturated → the accumulator leaks by [`VEL_INTEGRATOR_DECAY`]
///   instead of accumulating further error.
/// - Otherwise → the accumulator integrates `increment`
///   (`vel_integrator_gain · g · dt · v_err`, computed by the caller).
#[inline]
pub fn vel_integrator_step(
    integrator: f32,
    velocity_loop_active: bool,
    saturated: bool,
    increment: f32,
) -> f32 {
    if !velocity_loop_active {
        0.0
    } else if saturated {
        integrator * VEL_INTEGRATOR_DECAY
    } else {
        integrator + increment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_schedule_linear_inside_band() {
        assert_eq!(gain_scheduling_multiplier(0.0, 1.0, true), 0.0);
        assert!((gain_scheduling_multiplier(0.5, 1.0, true) - 0.5).abs() < 1e-6);
        assert!((gain_scheduling_multiplier(-0.25, 1.0, true) - 0.25).abs() < 1e-6);
        assert_eq!(gain_scheduling_multiplier(1.0, 1.0, true), 1.0);
    }

    #[test]
    fn gain_schedule_unity_outside_band_or_disabled() {
        assert_eq!(gain_scheduling_multiplier(1.5, 1.0, true), 1.0);
        assert_eq!(gain_scheduling_multiplier(0.1, 1.0, false), 1.0);
        assert_eq!(gain_scheduling_multiplier(0.0, 0.0, true), 1.0);
    }

    #[test]
    fn limit_vel_bounds_torque() {
        // vel_limit=10, vel=0, gain=1 → torque bounded to [-10, 10].
        assert_eq!(limit_vel(10.0, 0.0, 1.0, 25.0), 10.0);
        assert_eq!(limit_vel(10.0, 0.0, 1.0, -25.0), -10.0);
        assert_eq!(limit_vel(10.0, 0.0, 1.0, 3.0), 3.0);
        // At +8 turn/s only 2 Nm of forward authority remains.
        assert_eq!(limit_vel(10.0, 8.0, 1.0, 5.0), 2.0);
        // Past the limit, only braking torque is allowed.
        assert_eq!(limit_vel(10.0, 12.0, 1.0, 1.0), -2.0);
    }

    #[test]
    fn acim_flux_floored_with_sign() {
        assert_eq!(acim_effective_flux(20.0, 10.0), 20.0);
        assert_eq!(acim_effective_flux(-20.0, 10.0), -20.0);
        assert_eq!(acim_effective_flux(5.0, 10.0), 10.0);
        assert_eq!(acim_effective_flux(-5.0, 10.0), -10.0);
        // Zero flux takes the positive floor.
        assert_eq!(acim_effective_flux(0.0, 10.0), 10.0);
    }

    #[test]
    fn saturate_reports_clipping() {
        assert_eq!(saturate(5.0, 10.0), (5.0, false));
        assert_eq!(saturate(15.0, 10.0), (10.0, true));
        assert_eq!(saturate(-15.0, 10.0), (-10.0, true));
        assert_eq!(saturate(10.0, 10.0), (10.0, false));
    }

    #[test]
    fn integrator_held_at_zero_when_inactive() {
        assert_eq!(vel_integrator_step(5.0, false, false, 0.1), 0.0);
        assert_eq!(vel_integrator_step(5.0, false, true, 0.1), 0.0);
    }

    #[test]
    fn integrator_decays_exactly_when_saturated() {
        let out = vel_integrator_step(5.0, true, true, 0.1);
        assert_eq!(out, 5.0 * VEL_INTEGRATOR_DECAY);
        assert_eq!(out, 4.95);
    }

    #[test]
    fn integrator_adds_exact_increment_when_unsaturated() {
        let out = vel_integrator_step(5.0, true, false, 0.125);
        assert_eq!(out, 5.125);
    }
}
