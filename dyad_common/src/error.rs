//! Sticky error bitflags for the controller and the owning axis.
//!
//! Both latches use the `bitflags` crate. Bits are sticky: once raised
//! they stay set until the command layer clears them explicitly. Any set
//! bit in [`ControllerError`] aborts the control tick — the current
//! controller sees "no torque produced" and falls back to a safe state.
//!
//! Bit positions are fixed by the wire protocol; never renumber.

use bitflags::bitflags;

bitflags! {
    /// Controller-level error latch.
    ///
    /// Raised from within the tick (input shaping, cascade, anticogging)
    /// or from command operations (`select_encoder`, config apply).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControllerError: u8 {
        /// Measured speed exceeded `vel_limit_tolerance * vel_limit`.
        const OVERSPEED              = 0x01;
        /// `input_mode` raw value is not one of the recognized modes.
        const INVALID_INPUT_MODE     = 0x02;
        /// `axis_to_mirror` out of range while in mirror mode.
        const INVALID_MIRROR_AXIS    = 0x04;
        /// `select_encoder` index out of range.
        const INVALID_LOAD_ENCODER   = 0x08;
        /// A required position/velocity estimate was absent or invalid.
        const INVALID_ESTIMATE       = 0x10;
        /// `circular_setpoint_range` is not strictly positive.
        const INVALID_CIRCULAR_RANGE = 0x20;
    }
}

impl Default for ControllerError {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Axis-level error latch.
    ///
    /// The controller only ever raises `CONTROLLER_FAILED`; the other
    /// bits belong to the encoder and motor subsystems but share the
    /// latch so the command layer reads one word per axis.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AxisError: u8 {
        /// The encoder subsystem reported a fault.
        const ENCODER_FAILED    = 0x01;
        /// The controller aborted a tick; see the controller latch for why.
        const CONTROLLER_FAILED = 0x02;
        /// The motor/current-control subsystem reported a fault.
        const MOTOR_FAILED      = 0x04;
    }
}

impl Default for AxisError {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_error_wire_numbers() {
        assert_eq!(ControllerError::OVERSPEED.bits(), 0x01);
        assert_eq!(ControllerError::INVALID_INPUT_MODE.bits(), 0x02);
        assert_eq!(ControllerError::INVALID_MIRROR_AXIS.bits(), 0x04);
        assert_eq!(ControllerError::INVALID_LOAD_ENCODER.bits(), 0x08);
        assert_eq!(ControllerError::INVALID_ESTIMATE.bits(), 0x10);
        assert_eq!(ControllerError::INVALID_CIRCULAR_RANGE.bits(), 0x20);
    }

    #[test]
    fn controller_error_bits_roundtrip() {
        for flag in [
            ControllerError::OVERSPEED,
            ControllerError::INVALID_INPUT_MODE,
            ControllerError::INVALID_MIRROR_AXIS,
            ControllerError::INVALID_LOAD_ENCODER,
            ControllerError::INVALID_ESTIMATE,
            ControllerError::INVALID_CIRCULAR_RANGE,
        ] {
            let bits = flag.bits();
            let back = ControllerError::from_bits(bits).unwrap();
            assert_eq!(back, flag, "round-trip failed for 0x{bits:02x}");
        }
        let combo = ControllerError::OVERSPEED | ControllerError::INVALID_ESTIMATE;
        assert_eq!(ControllerError::from_bits(combo.bits()).unwrap(), combo);
    }

    #[test]
    fn latches_accumulate_and_clear() {
        let mut e = ControllerError::empty();
        assert!(e.is_empty());
        e.insert(ControllerError::OVERSPEED);
        e.insert(ControllerError::INVALID_ESTIMATE);
        assert!(e.contains(ControllerError::OVERSPEED));
        assert!(e.contains(ControllerError::INVALID_ESTIMATE));
        assert!(!e.contains(ControllerError::INVALID_INPUT_MODE));
        e = ControllerError::empty();
        assert!(e.is_empty());
    }

    #[test]
    fn axis_error_controller_failed() {
        let mut e = AxisError::default();
        assert!(e.is_empty());
        e.insert(AxisError::CONTROLLER_FAILED);
        assert!(e.contains(AxisError::CONTROLLER_FAILED));
        assert!(!e.contains(AxisError::ENCODER_FAILED));
    }
}
