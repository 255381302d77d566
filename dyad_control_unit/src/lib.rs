//! # Dyad Control Unit
//!
//! Motor-control inner loop for a dual-axis brushless servo controller.
//! The core is the per-axis [`controller::Controller`]: a cascade of
//! input shaping → position loop → velocity loop → torque limiting that
//! runs once per current-measurement tick and produces a torque command
//! for the downstream field-oriented current controller.
//!
//! ## Tick discipline
//!
//! `Controller::update` is the body of a periodic task clocked by the
//! current-measurement interrupt. It runs to completion, performs no
//! allocation, no blocking I/O, and no unbounded loops. All runtime
//! state (including the anticogging table) is allocated once at
//! construction. On any error the tick aborts with *no torque produced*
//! and the fault latches stickily until the command layer clears it.
//!
//! ## Axis coupling
//!
//! Both axes are serviced by one task in a fixed order
//! ([`axis::DualAxisLoop`]). Mirror mode reads the *other* axis's
//! encoder estimates through the shared [`estimate::AxisRegistry`];
//! single-threaded servicing is what makes that cross-axis read sound.

pub mod axis;
pub mod config;
pub mod control;
pub mod controller;
pub mod estimate;
