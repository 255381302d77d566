//! # Dyad Control Unit binary
//!
//! Loads and validates the loop configuration, then runs the dual-axis
//! control loop in simulation pacing (`thread::sleep`) against a simple
//! double-integrator plant per axis. On target hardware the same tick
//! body is driven by the current-measurement interrupt instead; the
//! plant here exists so the loop can be exercised and profiled on a
//! workstation.

use std::path::Path;
use std::process;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use dyad_control_unit::axis::DualAxisLoop;
use dyad_control_unit::config::load_config;
use dyad_control_unit::control::math::fmod_pos;
use dyad_control_unit::estimate::AXIS_COUNT;

/// Plant inertia for the workstation simulation [Nm / (turn/s²)].
const SIM_INERTIA: f32 = 0.01;
/// Plant viscous damping [Nm / (turn/s)].
const SIM_DAMPING: f32 = 0.05;

/// Minimal per-axis plant: torque in, position/velocity out.
#[derive(Debug, Clone, Copy, Default)]
struct SimAxis {
    pos: f32,
    vel: f32,
}

impl SimAxis {
    fn step(&mut self, torque: f32, dt: f32) {
        let accel = (torque - SIM_DAMPING * self.vel) / SIM_INERTIA;
        self.vel += accel * dt;
        self.pos += self.vel * dt;
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/dyad.toml".to_string());

    let config = match load_config(Path::new(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load {config_path}: {e}");
            process::exit(1);
        }
    };
    info!(
        control_rate_hz = config.control_rate_hz as f64,
        "configuration loaded from {config_path}"
    );

    let mut servo = DualAxisLoop::new(&config);
    let dt = servo.dt();
    let tick_period = Duration::from_secs_f64(dt as f64);
    let budget_ns = tick_period.as_nanos() as i64;
    let stats_interval = (config.control_rate_hz as u64).max(1);

    let mut plants = [SimAxis::default(); AXIS_COUNT];

    info!("entering simulated control loop (ctrl-c to stop)");
    loop {
        let tick_start = Instant::now();

        // Feed the latest plant state into the registry, as the encoder
        // task would on hardware.
        for (i, plant) in plants.iter().enumerate() {
            servo
                .registry
                .axis_mut(i)
                .encoder
                .set(plant.pos, fmod_pos(plant.pos, 1.0), plant.vel);
        }

        let torques = servo.tick();

        // Apply the torque commands; a failed tick means zero torque.
        for (plant, torque) in plants.iter_mut().zip(torques) {
            plant.step(torque.unwrap_or(0.0), dt);
        }

        let elapsed = tick_start.elapsed();
        servo.stats.record(elapsed.as_nanos() as i64, budget_ns);

        if servo.stats.tick_count % stats_interval == 0 {
            info!(
                ticks = servo.stats.tick_count,
                avg_ns = servo.stats.avg_tick_ns(),
                max_ns = servo.stats.max_tick_ns,
                overruns = servo.stats.overruns,
                "loop stats"
            );
            for (i, axis) in servo.axes.iter().enumerate() {
                if !axis.error.is_empty() {
                    warn!(
                        axis = i,
                        axis_error = ?axis.error,
                        controller_error = ?axis.controller.error(),
                        "axis faulted"
                    );
                }
            }
        }

        if let Some(remaining) = tick_period.checked_sub(elapsed) {
            std::thread::sleep(remaining);
        }
    }
}
