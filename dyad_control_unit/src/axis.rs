//! Axis-level composition and the dual-axis loop driver.
//!
//! An [`Axis`] pairs a [`Controller`] with the axis-level error latch;
//! a failed controller tick ORs `CONTROLLER_FAILED` into that latch and
//! yields no torque. [`DualAxisLoop`] owns the shared registry and
//! services both axes on one task in a fixed order — the property that
//! makes mirror mode's cross-axis estimate read sound.

use dyad_common::error::AxisError;

use crate::config::LoopConfig;
use crate::controller::Controller;
use crate::estimate::{AxisRegistry, MotorFeedback, AXIS_COUNT};

// ─── Axis ───────────────────────────────────────────────────────────

/// One servo axis: controller plus the axis error latch.
#[derive(Debug, Clone)]
pub struct Axis {
    /// Axis index; doubles as the default encoder binding.
    pub id: u8,
    /// The per-axis controller.
    pub controller: Controller,
    /// Sticky axis-level error latch.
    pub error: AxisError,
}

impl Axis {
    /// Build an axis around an already-configured controller.
    pub fn new(id: u8, controller: Controller) -> Self {
        Self {
            id,
            controller,
            error: AxisError::empty(),
        }
    }

    /// Run one control tick. `None` means no torque was produced this
    /// tick; the axis latch then carries `CONTROLLER_FAILED` and the
    /// current controller must fall back to a safe state.
    pub fn tick(&mut self, registry: &AxisRegistry, dt: f32) -> Option<f32> {
        match self.controller.update(registry, dt) {
            Ok(torque) => Some(torque),
            Err(_) => {
                self.error.insert(AxisError::CONTROLLER_FAILED);
                None
            }
        }
    }

    /// Begin anticogging calibration; refused while this axis holds any
    /// error.
    pub fn start_anticogging_calibration(&mut self) -> bool {
        self.controller.start_anticogging_calibration(self.error)
    }

    /// Clear both the axis latch and the controller latch (command
    /// layer re-arm path).
    pub fn clear_errors(&mut self) {
        self.error = AxisError::empty();
        self.controller.clear_errors();
    }
}

// ─── Tick Statistics ────────────────────────────────────────────────

/// O(1) per-tick timing statistics, updated without allocation.
#[derive(Debug, Clone)]
pub struct TickStats {
    /// Total ticks executed.
    pub tick_count: u64,
    /// Last tick duration [ns].
    pub last_tick_ns: i64,
    /// Minimum tick duration [ns].
    pub min_tick_ns: i64,
    /// Maximum tick duration [ns].
    pub max_tick_ns: i64,
    /// Running sum for average computation.
    pub sum_tick_ns: i64,
    /// Number of ticks that exceeded the sample period.
    pub overruns: u64,
}

impl TickStats {
    /// Create a zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            tick_count: 0,
            last_tick_ns: 0,
            min_tick_ns: i64::MAX,
            max_tick_ns: 0,
            sum_tick_ns: 0,
            overruns: 0,
        }
    }

    /// Record one tick duration against the period budget.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, budget_ns: i64) {
        self.tick_count += 1;
        self.last_tick_ns = duration_ns;
        if duration_ns < self.min_tick_ns {
            self.min_tick_ns = duration_ns;
        }
        if duration_ns > self.max_tick_ns {
            self.max_tick_ns = duration_ns;
        }
        self.sum_tick_ns += duration_ns;
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }

    /// Average tick duration [ns] (0 before the first tick).
    #[inline]
    pub fn avg_tick_ns(&self) -> i64 {
        if self.tick_count == 0 {
            0
        } else {
            self.sum_tick_ns / self.tick_count as i64
        }
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Dual-Axis Loop ─────────────────────────────────────────────────

/// Both axes plus the shared registry, serviced by one control task.
#[derive(Debug)]
pub struct DualAxisLoop {
    /// Shared per-axis estimates and motor feedback.
    pub registry: AxisRegistry,
    /// The two axes, ticked in index order.
    pub axes: [Axis; AXIS_COUNT],
    /// Timing statistics, fed by the loop driver.
    pub stats: TickStats,
    dt: f32,
}

impl DualAxisLoop {
    /// Build the loop from a validated configuration.
    pub fn new(config: &LoopConfig) -> Self {
        let registry = AxisRegistry::new(std::array::from_fn(|i| {
            MotorFeedback::from_params(&config.axes[i].motor)
        }));
        let axes = std::array::from_fn(|i| {
            Axis::new(
                i as u8,
                Controller::new(
                    config.axes[i].controller.clone(),
                    config.axes[i].trap_traj.clone(),
                    i,
                    config.control_rate_hz,
                ),
            )
        });
        Self {
            registry,
            axes,
            stats: TickStats::new(),
            dt: 1.0 / config.control_rate_hz,
        }
    }

    /// Sample period [s].
    #[inline]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Run one tick of both axes in fixed order. Per axis, `None`
    /// means that axis produced no torque this tick.
    pub fn tick(&mut self) -> [Option<f32>; AXIS_COUNT] {
        let mut torques = [None; AXIS_COUNT];
        for (axis, torque) in self.axes.iter_mut().zip(torques.iter_mut()) {
            *torque = axis.tick(&self.registry, self.dt);
        }
        torques
    }
}
