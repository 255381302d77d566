//! Mode enumerations for the servo controller.
//!
//! All enums use `#[repr(u8)]` with discriminants fixed by the wire
//! protocol — the host addresses them by raw number over the object-tree
//! RPC, so the values here must never be renumbered.

use serde::{Deserialize, Serialize};

// ─── Control Mode ───────────────────────────────────────────────────

/// Which loops of the cascade are active.
///
/// The ordering is meaningful: each mode encloses all the loops of the
/// modes below it (`Position` runs the position loop *and* the velocity
/// loop, `Velocity` runs only the velocity loop, and so on). The derived
/// `Ord` follows declaration order and is relied on by the cascade
/// (`control_mode >= Velocity` etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ControlMode {
    /// Open-loop voltage output (handled entirely by the current controller).
    Voltage = 0,
    /// Direct torque command, no velocity or position loop.
    Torque = 1,
    /// Velocity loop (PI with anti-windup) on top of torque.
    Velocity = 2,
    /// Position loop (P) on top of velocity.
    Position = 3,
}

impl ControlMode {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Voltage),
            1 => Some(Self::Torque),
            2 => Some(Self::Velocity),
            3 => Some(Self::Position),
            _ => None,
        }
    }
}

impl Default for ControlMode {
    fn default() -> Self {
        Self::Position
    }
}

// ─── Input Mode ─────────────────────────────────────────────────────

/// How the raw external inputs (`input_pos/vel/torque`) are shaped into
/// the stage setpoints.
///
/// Discriminant 4 is a reserved hole (a withdrawn channel-mixing mode);
/// `from_u8(4)` returns `None` and the gap must be preserved for wire
/// compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum InputMode {
    /// Stage setpoints retain their last values.
    Inactive = 0,
    /// Inputs copied straight through to the stage setpoints.
    Passthrough = 1,
    /// Velocity setpoint slewed toward `input_vel` at `vel_ramp_rate`.
    VelRamp = 2,
    /// Critically damped 2nd-order tracking of `(input_pos, input_vel)`.
    PosFilter = 3,
    /// Trapezoidal trajectory playback toward `input_pos`.
    TrapTraj = 5,
    /// Torque setpoint slewed toward `input_torque` at `torque_ramp_rate`.
    TorqueRamp = 6,
    /// Setpoints copied from the other axis's encoder, scaled by `mirror_ratio`.
    Mirror = 7,
}

impl InputMode {
    /// Convert from raw `u8`. Returns `None` for invalid values,
    /// including the reserved discriminant 4.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Inactive),
            1 => Some(Self::Passthrough),
            2 => Some(Self::VelRamp),
            3 => Some(Self::PosFilter),
            5 => Some(Self::TrapTraj),
            6 => Some(Self::TorqueRamp),
            7 => Some(Self::Mirror),
            _ => None,
        }
    }
}

impl Default for InputMode {
    fn default() -> Self {
        Self::Passthrough
    }
}

// ─── Motor Type ─────────────────────────────────────────────────────

/// Motor construction, as far as the velocity loop cares about it.
///
/// For `Acim` the torque-per-amp depends on the rotor flux, so the
/// velocity-loop gains are normalised by the effective flux each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MotorType {
    /// Standard high-current PMSM/BLDC.
    HighCurrent = 0,
    /// Gimbal motor driven in voltage mode.
    Gimbal = 2,
    /// AC induction motor.
    Acim = 3,
}

impl MotorType {
    /// Convert from raw `u8`. Returns `None` for invalid values
    /// (discriminant 1 is a reserved hole).
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::HighCurrent),
            2 => Some(Self::Gimbal),
            3 => Some(Self::Acim),
            _ => None,
        }
    }
}

impl Default for MotorType {
    fn default() -> Self {
        Self::HighCurrent
    }
}
