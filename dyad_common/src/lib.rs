//! # Dyad Common Library
//!
//! Shared plain-data types for the dyad dual-axis servo controller:
//! mode enumerations, sticky error bitflags, and configuration structs.
//!
//! These types cross the boundary between the realtime control core
//! (`dyad_control_unit`) and the host-facing command/telemetry layer.
//! Everything here is plain data — the transport layer reflects on it
//! via the serde derives, and the control core reads it without locks
//! (word-sized fields, written by the command task, observed atomically
//! at tick entry). No control logic lives in this crate.

pub mod config;
pub mod error;
pub mod state;
