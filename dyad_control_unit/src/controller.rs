//! Per-axis controller: input shaping, cascaded position/velocity
//! loops, anticogging feed-forward, and the sticky error latch.
//!
//! [`Controller::update`] is the body of the control tick. Within a
//! tick the order is fixed: input shaping → anticogging calibration
//! write → position loop → anticogging feed-forward → velocity loop →
//! torque saturation → integrator update. Any error aborts the tick
//! with no torque produced and latches stickily; the downstream current
//! controller must treat the absence of a torque command as a safe
//! fallback, not a retry.
//!
//! Command operations (`select_encoder`, `move_to_pos`, calibration
//! start/stop, …) are invoked from the lower-priority command task and
//! observed atomically at the next tick entry.

use dyad_common::config::{ControllerConfig, TrapTrajConfig};
use dyad_common::error::{AxisError, ControllerError};
use dyad_common::state::{ControlMode, InputMode, MotorType};

use crate::control::anticogging::AnticoggingMap;
use crate::control::cascade::{
    acim_effective_flux, gain_scheduling_multiplier, limit_vel, saturate, vel_integrator_step,
};
use crate::control::math::{fmod_pos, wrap_pm};
use crate::control::trajectory::TrapezoidalTrajectory;
use crate::estimate::{AxisRegistry, AXIS_COUNT};

/// Per-axis controller state.
///
/// Everything the cascade needs across ticks lives here, pre-allocated
/// at construction: stage setpoints, the velocity integrator, the
/// trajectory playback state, and the anticogging table.
#[derive(Debug, Clone)]
pub struct Controller {
    /// Controller configuration. Written by the command layer between
    /// ticks; the trajectory-completion handoff also rewrites
    /// `control_mode` from within the tick.
    pub config: ControllerConfig,
    /// Limits handed to the trajectory planner on `move_to_pos`.
    pub traj_config: TrapTrajConfig,

    // ── External inputs (command layer) ──
    /// Position input [turn].
    pub input_pos: f32,
    /// Velocity input [turn/s].
    pub input_vel: f32,
    /// Torque input [Nm].
    pub input_torque: f32,
    /// Velocity-loop integral accumulator [Nm]. Host-writable for
    /// tuning; cleared whenever the velocity loop is inactive.
    pub vel_integrator_torque: f32,

    // ── Stage setpoints (input shaping → cascade) ──
    pos_setpoint: f32,
    vel_setpoint: f32,
    torque_setpoint: f32,

    // ── Trajectory playback ──
    input_pos_updated: bool,
    trajectory_done: bool,
    traj: TrapezoidalTrajectory,
    traj_t: f32,

    // ── Anticogging ──
    anticogging: AnticoggingMap,

    // ── Error latch ──
    error: ControllerError,

    // ── Derived state, refreshed on config apply ──
    ctrl_rate_hz: f32,
    input_filter_kp: f32,
    input_filter_ki: f32,
    encoder_index: usize,
}

impl Controller {
    /// Build a controller for the axis whose encoder index is
    /// `axis_index`, clocked at `ctrl_rate_hz`.
    ///
    /// The anticogging table is sized from
    /// `config.anticogging.cogging_map_size` here and keeps that size
    /// for the controller's lifetime.
    pub fn new(
        config: ControllerConfig,
        traj_config: TrapTrajConfig,
        axis_index: usize,
        ctrl_rate_hz: f32,
    ) -> Self {
        let map_size = config.anticogging.cogging_map_size;
        let mut controller = Self {
            config,
            traj_config,
            input_pos: 0.0,
            input_vel: 0.0,
            input_torque: 0.0,
            vel_integrator_torque: 0.0,
            pos_setpoint: 0.0,
            vel_setpoint: 0.0,
            torque_setpoint: 0.0,
            input_pos_updated: false,
            trajectory_done: true,
            traj: TrapezoidalTrajectory::default(),
            traj_t: 0.0,
            anticogging: AnticoggingMap::new(map_size),
            error: ControllerError::empty(),
            ctrl_rate_hz,
            input_filter_kp: 0.0,
            input_filter_ki: 0.0,
            encoder_index: axis_index,
        };
        controller.update_filter_gains();
        controller
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Current position stage setpoint [turn].
    #[inline]
    pub fn pos_setpoint(&self) -> f32 {
        self.pos_setpoint
    }

    /// Current velocity stage setpoint [turn/s].
    #[inline]
    pub fn vel_setpoint(&self) -> f32 {
        self.vel_setpoint
    }

    /// Current torque stage setpoint [Nm].
    #[inline]
    pub fn torque_setpoint(&self) -> f32 {
        self.torque_setpoint
    }

    /// True once the active trajectory has been played to the end.
    #[inline]
    pub fn trajectory_done(&self) -> bool {
        self.trajectory_done
    }

    /// Sticky error latch.
    #[inline]
    pub fn error(&self) -> ControllerError {
        self.error
    }

    /// The anticogging table.
    #[inline]
    pub fn anticogging_map(&self) -> &AnticoggingMap {
        &self.anticogging
    }

    /// Mutable anticogging table (persistence restore).
    #[inline]
    pub fn anticogging_map_mut(&mut self) -> &mut AnticoggingMap {
        &mut self.anticogging
    }

    /// Low-passed square of the calibration correction rate.
    #[inline]
    pub fn anticogging_correction_pwr(&self) -> f32 {
        self.anticogging.correction_pwr()
    }

    /// Currently bound encoder index.
    #[inline]
    pub fn encoder_index(&self) -> usize {
        self.encoder_index
    }

    /// Input-filter gains derived from `input_filter_bandwidth`.
    #[inline]
    pub fn input_filter_gains(&self) -> (f32, f32) {
        (self.input_filter_kp, self.input_filter_ki)
    }

    // ─── Command operations ─────────────────────────────────────────

    /// Re-derive per-tick constants from the configuration and validate
    /// the circular range. Call after any config write.
    pub fn apply_config(&mut self) -> Result<(), ControllerError> {
        if self.config.circular_setpoints && !(self.config.circular_setpoint_range > 0.0) {
            return self.command_error(ControllerError::INVALID_CIRCULAR_RANGE);
        }
        self.update_filter_gains();
        Ok(())
    }

    /// Bind the estimate source to the encoder of `encoder_index`.
    /// Idempotent on the same index.
    pub fn select_encoder(&mut self, encoder_index: usize) -> Result<(), ControllerError> {
        if encoder_index >= AXIS_COUNT {
            return self.command_error(ControllerError::INVALID_LOAD_ENCODER);
        }
        self.encoder_index = encoder_index;
        Ok(())
    }

    /// Set the position input and mark it updated (trajectory replan
    /// trigger in `TrapTraj` mode).
    pub fn set_input_pos(&mut self, pos: f32) {
        self.input_pos = pos;
        self.input_pos_updated = true;
    }

    /// Set the input mode from its wire encoding. An unrecognized value
    /// latches `INVALID_INPUT_MODE` and leaves the mode unchanged.
    pub fn set_input_mode_raw(&mut self, raw: u8) -> Result<(), ControllerError> {
        match InputMode::from_u8(raw) {
            Some(mode) => {
                self.config.input_mode = mode;
                Ok(())
            }
            None => self.command_error(ControllerError::INVALID_INPUT_MODE),
        }
    }

    /// Plan a trapezoidal move from the current stage state to `goal`
    /// and restart trajectory playback.
    pub fn move_to_pos(&mut self, goal: f32) {
        self.traj.plan(
            goal,
            self.pos_setpoint,
            self.vel_setpoint,
            self.traj_config.vel_limit,
            self.traj_config.accel_limit,
            self.traj_config.decel_limit,
        );
        self.traj_t = 0.0;
        self.trajectory_done = false;
    }

    /// Move by `displacement`: relative to the current position input
    /// (`from_input_pos`) or to the current position setpoint.
    pub fn move_incremental(&mut self, displacement: f32, from_input_pos: bool) {
        if from_input_pos {
            self.input_pos += displacement;
        } else {
            self.input_pos = self.pos_setpoint + displacement;
        }
        self.input_pos_updated = true;
    }

    /// Begin anticogging calibration. Refused (returning `false`) while
    /// the axis or controller latch holds any error.
    pub fn start_anticogging_calibration(&mut self, axis_error: AxisError) -> bool {
        if axis_error.is_empty() && self.error.is_empty() {
            self.config.anticogging.calibrating = true;
            true
        } else {
            false
        }
    }

    /// Stop anticogging calibration. Unconditional.
    pub fn stop_anticogging_calibration(&mut self) {
        self.config.anticogging.calibrating = false;
    }

    /// Remove the constant-torque bias from the anticogging map.
    pub fn anticogging_remove_bias(&mut self) {
        self.anticogging.remove_bias();
    }

    /// Zero the stage setpoints and the velocity integrator.
    pub fn reset(&mut self) {
        self.pos_setpoint = 0.0;
        self.vel_setpoint = 0.0;
        self.torque_setpoint = 0.0;
        self.vel_integrator_torque = 0.0;
    }

    /// Clear the sticky error latch (command layer re-arm path).
    pub fn clear_errors(&mut self) {
        self.error = ControllerError::empty();
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Run one control tick of period `dt` and produce a torque command.
    ///
    /// `Err` means *no torque produced*: the raised bit (and any bits
    /// already latched) stays set, and the caller must propagate
    /// controller failure to the axis latch. A latched error from a
    /// previous tick aborts immediately.
    pub fn update(&mut self, registry: &AxisRegistry, dt: f32) -> Result<f32, ControllerError> {
        if !self.error.is_empty() {
            return Err(self.error);
        }

        let bound = registry.axis(self.encoder_index);
        let pos_estimate_linear = bound.encoder.pos_linear();
        let pos_estimate_circular = bound.encoder.pos_circular();
        let vel_estimate = bound.encoder.velocity();

        if self.config.circular_setpoints {
            // Keep the position input from drifting out of one wrap.
            self.input_pos = fmod_pos(self.input_pos, self.config.circular_setpoint_range);
        }

        // ─── Input shaping ──────────────────────────────────────────
        // Position used for the anticogging lookup this tick; trajectory
        // playback substitutes the setpoint for the estimate.
        let mut anticogging_pos: Option<f32> = None;

        match self.config.input_mode {
            InputMode::Inactive => {
                // Stage setpoints hold their last values.
            }
            InputMode::Passthrough => {
                self.pos_setpoint = self.input_pos;
                self.vel_setpoint = self.input_vel;
                self.torque_setpoint = self.input_torque;
            }
            InputMode::VelRamp => {
                let max_step = (dt * self.config.vel_ramp_rate).abs();
                let full_step = self.input_vel - self.vel_setpoint;
                let step = full_step.clamp(-max_step, max_step);
                self.vel_setpoint += step;
                self.torque_setpoint = (step / dt) * self.config.inertia;
            }
            InputMode::TorqueRamp => {
                let max_step = (dt * self.config.torque_ramp_rate).abs();
                let full_step = self.input_torque - self.torque_setpoint;
                self.torque_setpoint += full_step.clamp(-max_step, max_step);
            }
            InputMode::PosFilter => {
                // Critically damped 2nd-order tracking filter.
                let delta_pos = self.input_pos - self.pos_setpoint;
                let delta_vel = self.input_vel - self.vel_setpoint;
                let accel = self.input_filter_kp * delta_pos + self.input_filter_ki * delta_vel;
                self.torque_setpoint = accel * self.config.inertia;
                self.vel_setpoint += dt * accel;
                self.pos_setpoint += dt * self.vel_setpoint;
            }
            InputMode::Mirror => {
                let mirror_index = self.config.axis_to_mirror as usize;
                if mirror_index >= AXIS_COUNT {
                    return self.tick_error(ControllerError::INVALID_MIRROR_AXIS);
                }
                // The *other axis's estimates*, not its setpoints.
                let source = &registry.axis(mirror_index).encoder;
                let (pos, vel) = match (source.pos_linear(), source.velocity()) {
                    (Some(pos), Some(vel)) => (pos, vel),
                    _ => return self.tick_error(ControllerError::INVALID_ESTIMATE),
                };
                self.pos_setpoint = pos * self.config.mirror_ratio;
                self.vel_setpoint = vel * self.config.mirror_ratio;
            }
            InputMode::TrapTraj => {
                if self.input_pos_updated {
                    self.move_to_pos(self.input_pos);
                    self.input_pos_updated = false;
                }
                // A finished (or never-planned) trajectory holds the
                // stage setpoints untouched.
                if !self.trajectory_done {
                    if self.traj_t > self.traj.tf() {
                        // Hand off into position hold at the goal so the
                        // playback clock can stop advancing.
                        self.config.control_mode = ControlMode::Position;
                        self.pos_setpoint = self.input_pos;
                        self.vel_setpoint = 0.0;
                        self.torque_setpoint = 0.0;
                        self.trajectory_done = true;
                    } else {
                        let step = self.traj.eval(self.traj_t);
                        self.pos_setpoint = step.y;
                        self.vel_setpoint = step.yd;
                        self.torque_setpoint = step.ydd * self.config.inertia;
                        self.traj_t += dt;
                    }
                    anticogging_pos = Some(self.pos_setpoint);
                }
            }
        }

        // ─── Anticogging calibration write ──────────────────────────
        if self.config.anticogging.calibrating {
            let (pos, vel) = match (pos_estimate_linear, vel_estimate) {
                (Some(pos), Some(vel)) => (pos, vel),
                _ => return self.tick_error(ControllerError::INVALID_ESTIMATE),
            };
            // Integrator-driven map population; only meaningful while the
            // velocity loop is the outermost active loop.
            if self.config.control_mode == ControlMode::Velocity {
                self.anticogging.calibration_step(
                    pos,
                    self.vel_setpoint - vel,
                    self.config.anticogging.integrator_gain,
                    self.config.anticogging.max_torque,
                    dt,
                );
            }
        }

        // ─── Position loop ──────────────────────────────────────────
        let mut gain_scheduling = 1.0;
        let mut vel_des = self.vel_setpoint;
        if self.config.control_mode >= ControlMode::Position {
            let pos_err = if self.config.circular_setpoints {
                let wrap = self.config.circular_setpoint_range;
                let Some(pos_circular) = pos_estimate_circular else {
                    return self.tick_error(ControllerError::INVALID_ESTIMATE);
                };
                // Keep the setpoint from drifting, then take the signed
                // shortest-arc error.
                self.pos_setpoint = fmod_pos(self.pos_setpoint, wrap);
                wrap_pm(self.pos_setpoint - pos_circular, wrap)
            } else {
                let Some(pos_linear) = pos_estimate_linear else {
                    return self.tick_error(ControllerError::INVALID_ESTIMATE);
                };
                self.pos_setpoint - pos_linear
            };

            vel_des += self.config.pos_gain * pos_err;
            gain_scheduling = gain_scheduling_multiplier(
                pos_err,
                self.config.gain_scheduling_width,
                self.config.enable_gain_scheduling,
            );
        }

        // ─── Velocity limiting on the reference ─────────────────────
        let vel_lim = self.config.vel_limit;
        if self.config.enable_vel_limit {
            vel_des = vel_des.clamp(-vel_lim, vel_lim);
        }

        // ─── Overspeed detection ────────────────────────────────────
        if self.config.enable_overspeed_error {
            let Some(vel) = vel_estimate else {
                return self.tick_error(ControllerError::INVALID_ESTIMATE);
            };
            if vel.abs() > self.config.vel_limit_tolerance * vel_lim {
                return self.tick_error(ControllerError::OVERSPEED);
            }
        }

        // ─── ACIM gain normalisation ────────────────────────────────
        let mut vel_gain = self.config.vel_gain;
        let mut vel_integrator_gain = self.config.vel_integrator_gain;
        if bound.motor.motor_type == MotorType::Acim {
            let flux =
                acim_effective_flux(bound.motor.acim_rotor_flux, bound.motor.acim_gain_min_flux);
            vel_gain /= flux;
            vel_integrator_gain /= flux;
            // TODO: rescale vel_integrator_torque when the effective flux
            // changes between ticks; the accumulator keeps its old units.
        }

        // ─── Torque assembly ────────────────────────────────────────
        let mut torque = self.torque_setpoint;

        // Anticogging feed-forward runs live during calibration as well
        // as in normal enabled operation. It lands ahead of the velocity
        // loop so it stays inside the anti-windup accounting.
        if self.config.anticogging.calibrating || self.config.anticogging.enabled {
            let pos = match anticogging_pos {
                Some(pos) => pos,
                None => match pos_estimate_linear {
                    Some(pos) => pos,
                    None => return self.tick_error(ControllerError::INVALID_ESTIMATE),
                },
            };
            torque += self.anticogging.lookup(pos);
        }

        let mut v_err = 0.0;
        if self.config.control_mode >= ControlMode::Velocity {
            let Some(vel) = vel_estimate else {
                return self.tick_error(ControllerError::INVALID_ESTIMATE);
            };
            v_err = vel_des - vel;
            torque += vel_gain * gain_scheduling * v_err;
            torque += self.vel_integrator_torque;
        }

        // ─── Torque-mode velocity clamp ─────────────────────────────
        if self.config.control_mode < ControlMode::Velocity
            && self.config.enable_current_mode_vel_limit
        {
            let Some(vel) = vel_estimate else {
                return self.tick_error(ControllerError::INVALID_ESTIMATE);
            };
            torque = limit_vel(vel_lim, vel, vel_gain, torque);
        }

        // ─── Torque saturation ──────────────────────────────────────
        let (torque, limited) = saturate(torque, bound.motor.max_available_torque);

        // ─── Integrator anti-windup ─────────────────────────────────
        self.vel_integrator_torque = vel_integrator_step(
            self.vel_integrator_torque,
            self.config.control_mode >= ControlMode::Velocity,
            limited,
            vel_integrator_gain * gain_scheduling * dt * v_err,
        );

        Ok(torque)
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Latch an error raised from within the tick and abort it.
    fn tick_error(&mut self, error: ControllerError) -> Result<f32, ControllerError> {
        self.error.insert(error);
        Err(error)
    }

    /// Latch an error raised from a command operation.
    fn command_error(&mut self, error: ControllerError) -> Result<(), ControllerError> {
        self.error.insert(error);
        Err(error)
    }

    /// Derive the critically damped input-filter gains from the
    /// configured bandwidth, clamped to a quarter of the control rate.
    fn update_filter_gains(&mut self) {
        let bandwidth = self
            .config
            .input_filter_bandwidth
            .min(0.25 * self.ctrl_rate_hz);
        self.input_filter_ki = 2.0 * bandwidth;
        self.input_filter_kp = 0.25 * (self.input_filter_ki * self.input_filter_ki);
    }
}
