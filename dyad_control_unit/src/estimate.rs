//! Encoder estimates, motor feedback, and the axis registry.
//!
//! The registry is the controller's only window onto the rest of the
//! system: it holds, per axis, the latest encoder estimates and the
//! motor quantities the cascade consults read-only. It is passed into
//! `Controller::update` by reference — there is no process-wide axes
//! table — which keeps mirror mode and encoder re-binding testable
//! without global state.
//!
//! Estimates are written by the encoder task, motor feedback by the
//! current controller; both are observed by the control task at tick
//! entry. All axes live on the same control task, so a mirror read of
//! the other axis is a plain read of a stable snapshot.

use static_assertions::const_assert_eq;

use dyad_common::config::MotorParams;
use dyad_common::state::MotorType;

/// Number of axes serviced by the control task.
pub const AXIS_COUNT: usize = 2;

// ─── Encoder Estimates ──────────────────────────────────────────────

/// Latest state estimates from one encoder.
///
/// When a validity bit is false the corresponding values must not be
/// read; the accessors enforce that by returning `None`, and the
/// controller treats `None` as fatal for the tick (`INVALID_ESTIMATE`).
///
/// `repr(C)`: this block is written field-by-field by the encoder task
/// and read by the control task, so its layout is part of the
/// inter-task contract.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct EncoderEstimates {
    /// Linear (turn-counting) position estimate [turn].
    pub pos_estimate: f32,
    /// Circular position estimate, not guaranteed to lie in `[0, 1)`.
    pub pos_circular_estimate: f32,
    /// Velocity estimate [turn/s].
    pub vel_estimate: f32,
    /// Position estimates are usable.
    pub pos_valid: bool,
    /// Velocity estimate is usable.
    pub vel_valid: bool,
}

const_assert_eq!(core::mem::size_of::<EncoderEstimates>(), 16);

impl EncoderEstimates {
    /// Linear position, if valid.
    #[inline]
    pub fn pos_linear(&self) -> Option<f32> {
        self.pos_valid.then_some(self.pos_estimate)
    }

    /// Circular position, if valid.
    #[inline]
    pub fn pos_circular(&self) -> Option<f32> {
        self.pos_valid.then_some(self.pos_circular_estimate)
    }

    /// Velocity, if valid.
    #[inline]
    pub fn velocity(&self) -> Option<f32> {
        self.vel_valid.then_some(self.vel_estimate)
    }

    /// Mark both estimates valid with the given values (encoder task path).
    #[inline]
    pub fn set(&mut self, pos: f32, pos_circular: f32, vel: f32) {
        self.pos_estimate = pos;
        self.pos_circular_estimate = pos_circular;
        self.vel_estimate = vel;
        self.pos_valid = true;
        self.vel_valid = true;
    }

    /// Invalidate all estimates (encoder fault or startup).
    #[inline]
    pub fn invalidate(&mut self) {
        self.pos_valid = false;
        self.vel_valid = false;
    }
}

// ─── Motor Feedback ─────────────────────────────────────────────────

/// Motor quantities the controller consults read-only.
///
/// `max_available_torque` and `acim_rotor_flux` are live values written
/// by the current controller. `max_available_torque` is authoritative
/// on every tick — a value of `0.0` means the motor has no torque
/// authority right now and the cascade output saturates to zero.
/// `repr(C)` for the same inter-task layout contract as
/// [`EncoderEstimates`].
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct MotorFeedback {
    /// Motor construction.
    pub motor_type: MotorType,
    /// Torque the current controller can deliver right now [Nm].
    pub max_available_torque: f32,
    /// ACIM rotor flux estimate (signed).
    pub acim_rotor_flux: f32,
    /// Floor for the flux magnitude in gain normalisation.
    pub acim_gain_min_flux: f32,
}

const_assert_eq!(core::mem::size_of::<MotorFeedback>(), 16);

impl MotorFeedback {
    /// Build the initial feedback block from static motor parameters.
    /// `max_available_torque` starts at the configured `torque_lim` and
    /// is overwritten by the current controller from its first report
    /// onward.
    pub fn from_params(params: &MotorParams) -> Self {
        Self {
            motor_type: params.motor_type,
            max_available_torque: params.torque_lim,
            acim_rotor_flux: 0.0,
            acim_gain_min_flux: params.acim_gain_min_flux,
        }
    }
}

impl Default for MotorFeedback {
    fn default() -> Self {
        Self::from_params(&MotorParams::default())
    }
}

// ─── Axis Registry ──────────────────────────────────────────────────

/// Shared per-axis state observed by the controllers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisShared {
    /// Latest encoder estimates.
    pub encoder: EncoderEstimates,
    /// Motor feedback and parameters.
    pub motor: MotorFeedback,
}

/// Fixed-size registry of both axes' shared state.
#[derive(Debug, Clone, Default)]
pub struct AxisRegistry {
    axes: [AxisShared; AXIS_COUNT],
}

impl AxisRegistry {
    /// Build a registry with the given per-axis motor parameters.
    /// Encoder estimates start invalid.
    pub fn new(motors: [MotorFeedback; AXIS_COUNT]) -> Self {
        let mut axes = [AxisShared::default(); AXIS_COUNT];
        for (axis, motor) in axes.iter_mut().zip(motors) {
            axis.motor = motor;
        }
        Self { axes }
    }

    /// Shared state of one axis.
    ///
    /// # Panics
    /// When `index >= AXIS_COUNT`. Callers validate indices against
    /// `AXIS_COUNT` before binding (`select_encoder`, mirror dispatch).
    #[inline]
    pub fn axis(&self, index: usize) -> &AxisShared {
        &self.axes[index]
    }

    /// Mutable shared state of one axis (encoder/current-controller path).
    #[inline]
    pub fn axis_mut(&mut self, index: usize) -> &mut AxisShared {
        &mut self.axes[index]
    }
}
