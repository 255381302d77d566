//! Configuration structs for the servo controller.
//!
//! All types derive serde so the command/telemetry transport and the
//! persistence collaborator can treat them as plain data. Every field
//! has a default, so a partial TOML table deserializes into a usable
//! configuration. `validate()` is the single gate for parameter bounds;
//! it runs at load time and again on config apply.
//!
//! The control task reads these fields once per tick; the command task
//! writes them between ticks. Fields are word-sized, so each individual
//! read is atomic on the target.

use serde::{Deserialize, Serialize};

use crate::state::{ControlMode, InputMode, MotorType};

/// Sentinel value of `axis_to_mirror` meaning "no mirror source selected".
pub const MIRROR_AXIS_NONE: u8 = 0xff;

// ─── Controller ─────────────────────────────────────────────────────

/// Per-axis controller configuration (§ cascade, input shaping, limits).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Which loops of the cascade are active.
    #[serde(default)]
    pub control_mode: ControlMode,
    /// How external inputs are shaped into stage setpoints.
    #[serde(default)]
    pub input_mode: InputMode,

    /// Position loop proportional gain [(turn/s) / turn].
    #[serde(default = "default_pos_gain")]
    pub pos_gain: f32,
    /// Velocity loop proportional gain [Nm / (turn/s)].
    #[serde(default = "default_vel_gain")]
    pub vel_gain: f32,
    /// Velocity loop integral gain [Nm / turn].
    #[serde(default = "default_vel_integrator_gain")]
    pub vel_integrator_gain: f32,

    /// Velocity reference limit [turn/s].
    #[serde(default = "default_vel_limit")]
    pub vel_limit: f32,
    /// Overspeed trips at `vel_limit_tolerance * vel_limit`.
    #[serde(default = "default_vel_limit_tolerance")]
    pub vel_limit_tolerance: f32,
    /// Clamp the velocity reference to `±vel_limit`.
    #[serde(default = "default_true")]
    pub enable_vel_limit: bool,
    /// Latch `OVERSPEED` when the measured speed exceeds the tolerance band.
    #[serde(default = "default_true")]
    pub enable_overspeed_error: bool,
    /// In torque mode, clamp the torque command so it cannot accelerate
    /// past `±vel_limit`.
    #[serde(default = "default_true")]
    pub enable_current_mode_vel_limit: bool,

    /// V-shaped reduction of the velocity-loop gains near zero position error.
    #[serde(default)]
    pub enable_gain_scheduling: bool,
    /// Position-error width of the gain scheduling V [turn].
    #[serde(default = "default_gain_scheduling_width")]
    pub gain_scheduling_width: f32,

    /// Slew rate for `InputMode::VelRamp` [turn/s²].
    #[serde(default = "default_vel_ramp_rate")]
    pub vel_ramp_rate: f32,
    /// Slew rate for `InputMode::TorqueRamp` [Nm/s].
    #[serde(default = "default_torque_ramp_rate")]
    pub torque_ramp_rate: f32,
    /// Tracking bandwidth for `InputMode::PosFilter` [Hz]; clamped to a
    /// quarter of the control rate when the filter gains are derived.
    #[serde(default = "default_input_filter_bandwidth")]
    pub input_filter_bandwidth: f32,
    /// Load inertia used for torque feed-forward [Nm / (turn/s²)].
    #[serde(default)]
    pub inertia: f32,

    /// Interpret position setpoints modulo `circular_setpoint_range`.
    #[serde(default)]
    pub circular_setpoints: bool,
    /// Wrap range for circular setpoints [turn].
    #[serde(default = "default_circular_setpoint_range")]
    pub circular_setpoint_range: f32,

    /// Source axis for `InputMode::Mirror` (`MIRROR_AXIS_NONE` = unset).
    #[serde(default = "default_axis_to_mirror")]
    pub axis_to_mirror: u8,
    /// Scale applied to the mirrored estimates.
    #[serde(default = "default_mirror_ratio")]
    pub mirror_ratio: f32,

    /// Anticogging feed-forward configuration.
    #[serde(default)]
    pub anticogging: AnticoggingConfig,
}

fn default_pos_gain() -> f32 {
    20.0
}
fn default_vel_gain() -> f32 {
    0.16
}
fn default_vel_integrator_gain() -> f32 {
    0.32
}
fn default_vel_limit() -> f32 {
    2.0
}
fn default_vel_limit_tolerance() -> f32 {
    1.2
}
fn default_gain_scheduling_width() -> f32 {
    10.0
}
fn default_vel_ramp_rate() -> f32 {
    10.0
}
fn default_torque_ramp_rate() -> f32 {
    0.01
}
fn default_input_filter_bandwidth() -> f32 {
    2.0
}
fn default_circular_setpoint_range() -> f32 {
    1.0
}
fn default_axis_to_mirror() -> u8 {
    MIRROR_AXIS_NONE
}
fn default_mirror_ratio() -> f32 {
    1.0
}
fn default_true() -> bool {
    true
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            control_mode: ControlMode::default(),
            input_mode: InputMode::default(),
            pos_gain: default_pos_gain(),
            vel_gain: default_vel_gain(),
            vel_integrator_gain: default_vel_integrator_gain(),
            vel_limit: default_vel_limit(),
            vel_limit_tolerance: default_vel_limit_tolerance(),
            enable_vel_limit: true,
            enable_overspeed_error: true,
            enable_current_mode_vel_limit: true,
            enable_gain_scheduling: false,
            gain_scheduling_width: default_gain_scheduling_width(),
            vel_ramp_rate: default_vel_ramp_rate(),
            torque_ramp_rate: default_torque_ramp_rate(),
            input_filter_bandwidth: default_input_filter_bandwidth(),
            inertia: 0.0,
            circular_setpoints: false,
            circular_setpoint_range: default_circular_setpoint_range(),
            axis_to_mirror: default_axis_to_mirror(),
            mirror_ratio: default_mirror_ratio(),
            anticogging: AnticoggingConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Validate parameter bounds. Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.pos_gain >= 0.0) {
            return Err(format!("pos_gain must be >= 0 (got {})", self.pos_gain));
        }
        if !(self.vel_gain >= 0.0) {
            return Err(format!("vel_gain must be >= 0 (got {})", self.vel_gain));
        }
        if !(self.vel_integrator_gain >= 0.0) {
            return Err(format!(
                "vel_integrator_gain must be >= 0 (got {})",
                self.vel_integrator_gain
            ));
        }
        if !(self.vel_limit >= 0.0) {
            return Err(format!("vel_limit must be >= 0 (got {})", self.vel_limit));
        }
        if !(self.vel_limit_tolerance >= 0.0) {
            return Err(format!(
                "vel_limit_tolerance must be >= 0 (got {})",
                self.vel_limit_tolerance
            ));
        }
        if self.enable_gain_scheduling && !(self.gain_scheduling_width > 0.0) {
            return Err(format!(
                "gain_scheduling_width must be > 0 when gain scheduling is enabled (got {})",
                self.gain_scheduling_width
            ));
        }
        if !(self.input_filter_bandwidth >= 0.0) {
            return Err(format!(
                "input_filter_bandwidth must be >= 0 (got {})",
                self.input_filter_bandwidth
            ));
        }
        if self.circular_setpoints && !(self.circular_setpoint_range > 0.0) {
            return Err(format!(
                "circular_setpoint_range must be > 0 (got {})",
                self.circular_setpoint_range
            ));
        }
        self.anticogging.validate()
    }
}

// ─── Anticogging ────────────────────────────────────────────────────

/// Anticogging feed-forward table configuration.
///
/// `calibrating` is a runtime flag, but it is persisted with the rest of
/// the config so a power cycle mid-calibration resumes where it left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnticoggingConfig {
    /// Apply the cogging map as feed-forward during normal operation.
    #[serde(default)]
    pub enabled: bool,
    /// Online integrator-driven calibration is active.
    #[serde(default)]
    pub calibrating: bool,
    /// Calibration integrator gain [Nm/s per turn/s of velocity error].
    #[serde(default = "default_anticogging_integrator_gain")]
    pub integrator_gain: f32,
    /// Per-bin clamp for map entries [Nm].
    #[serde(default = "default_anticogging_max_torque")]
    pub max_torque: f32,
    /// Number of bins per mechanical revolution. Fixed for the lifetime
    /// of the controller; changing it requires a reconstruction.
    #[serde(default = "default_cogging_map_size")]
    pub cogging_map_size: usize,
}

fn default_anticogging_integrator_gain() -> f32 {
    10.0
}
fn default_anticogging_max_torque() -> f32 {
    1.0
}
fn default_cogging_map_size() -> usize {
    1024
}

impl Default for AnticoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            calibrating: false,
            integrator_gain: default_anticogging_integrator_gain(),
            max_torque: default_anticogging_max_torque(),
            cogging_map_size: default_cogging_map_size(),
        }
    }
}

impl AnticoggingConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.cogging_map_size == 0 {
            return Err("anticogging.cogging_map_size must be > 0".to_string());
        }
        if !(self.integrator_gain >= 0.0) {
            return Err(format!(
                "anticogging.integrator_gain must be >= 0 (got {})",
                self.integrator_gain
            ));
        }
        if !(self.max_torque >= 0.0) {
            return Err(format!(
                "anticogging.max_torque must be >= 0 (got {})",
                self.max_torque
            ));
        }
        Ok(())
    }
}

// ─── Trajectory ─────────────────────────────────────────────────────

/// Limits for the trapezoidal trajectory planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapTrajConfig {
    /// Cruise velocity limit [turn/s].
    #[serde(default = "default_traj_vel_limit")]
    pub vel_limit: f32,
    /// Acceleration limit [turn/s²].
    #[serde(default = "default_traj_accel_limit")]
    pub accel_limit: f32,
    /// Deceleration limit [turn/s²].
    #[serde(default = "default_traj_decel_limit")]
    pub decel_limit: f32,
}

fn default_traj_vel_limit() -> f32 {
    2.0
}
fn default_traj_accel_limit() -> f32 {
    0.5
}
fn default_traj_decel_limit() -> f32 {
    0.5
}

impl Default for TrapTrajConfig {
    fn default() -> Self {
        Self {
            vel_limit: default_traj_vel_limit(),
            accel_limit: default_traj_accel_limit(),
            decel_limit: default_traj_decel_limit(),
        }
    }
}

impl TrapTrajConfig {
    /// Validate parameter bounds. All limits must be strictly positive,
    /// otherwise the planner's phase durations are undefined.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.vel_limit > 0.0) {
            return Err(format!(
                "trap_traj.vel_limit must be > 0 (got {})",
                self.vel_limit
            ));
        }
        if !(self.accel_limit > 0.0) {
            return Err(format!(
                "trap_traj.accel_limit must be > 0 (got {})",
                self.accel_limit
            ));
        }
        if !(self.decel_limit > 0.0) {
            return Err(format!(
                "trap_traj.decel_limit must be > 0 (got {})",
                self.decel_limit
            ));
        }
        Ok(())
    }
}

// ─── Motor ──────────────────────────────────────────────────────────

/// Static motor parameters the controller consults read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorParams {
    /// Motor construction.
    #[serde(default)]
    pub motor_type: MotorType,
    /// Initial torque bound [Nm]. Seeds the live `max_available_torque`
    /// once at construction; from the current controller's first report
    /// onward the live value alone bounds the output.
    #[serde(default = "default_torque_lim")]
    pub torque_lim: f32,
    /// Floor for the ACIM rotor flux magnitude used in gain normalisation.
    #[serde(default = "default_acim_gain_min_flux")]
    pub acim_gain_min_flux: f32,
}

fn default_torque_lim() -> f32 {
    10.0
}
fn default_acim_gain_min_flux() -> f32 {
    10.0
}

impl Default for MotorParams {
    fn default() -> Self {
        Self {
            motor_type: MotorType::default(),
            torque_lim: default_torque_lim(),
            acim_gain_min_flux: default_acim_gain_min_flux(),
        }
    }
}

impl MotorParams {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.torque_lim > 0.0) {
            return Err(format!("motor.torque_lim must be > 0 (got {})", self.torque_lim));
        }
        if !(self.acim_gain_min_flux > 0.0) {
            return Err(format!(
                "motor.acim_gain_min_flux must be > 0 (got {})",
                self.acim_gain_min_flux
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(ControllerConfig::default().validate().is_ok());
        assert!(TrapTrajConfig::default().validate().is_ok());
        assert!(MotorParams::default().validate().is_ok());
    }

    #[test]
    fn negative_gain_rejected() {
        let mut cfg = ControllerConfig::default();
        cfg.vel_gain = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn nan_gain_rejected() {
        let mut cfg = ControllerConfig::default();
        cfg.pos_gain = f32::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn circular_range_checked_only_when_circular() {
        let mut cfg = ControllerConfig::default();
        cfg.circular_setpoint_range = 0.0;
        assert!(cfg.validate().is_ok());
        cfg.circular_setpoints = true;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn gain_scheduling_width_checked_only_when_enabled() {
        let mut cfg = ControllerConfig::default();
        cfg.gain_scheduling_width = 0.0;
        assert!(cfg.validate().is_ok());
        cfg.enable_gain_scheduling = true;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_map_size_rejected() {
        let mut cfg = AnticoggingConfig::default();
        cfg.cogging_map_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn trap_traj_limits_must_be_positive() {
        for field in 0..3 {
            let mut cfg = TrapTrajConfig::default();
            match field {
                0 => cfg.vel_limit = 0.0,
                1 => cfg.accel_limit = 0.0,
                _ => cfg.decel_limit = -1.0,
            }
            assert!(cfg.validate().is_err(), "field {field} should be rejected");
        }
    }
}
