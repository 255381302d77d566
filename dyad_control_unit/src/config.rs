//! TOML configuration loader with validation.
//!
//! Loads the full dual-axis [`LoopConfig`] from one TOML file and runs
//! every parameter-bound check before the loop is constructed. The
//! string-input path exists so tests and tooling can validate configs
//! without touching the filesystem.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dyad_common::config::{ControllerConfig, MotorParams, TrapTrajConfig};

use crate::estimate::AXIS_COUNT;

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("config I/O error: {0}")]
    Io(String),
    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Parameter validation error.
    #[error("config validation: {0}")]
    Validation(String),
}

// ─── Config Types ───────────────────────────────────────────────────

/// Everything one axis needs: controller, motor, trajectory limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Controller configuration.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Static motor parameters.
    #[serde(default)]
    pub motor: MotorParams,
    /// Trapezoidal trajectory limits.
    #[serde(default)]
    pub trap_traj: TrapTrajConfig,
}

/// Complete dual-axis loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Control tick rate [Hz]; the sample period is its reciprocal.
    #[serde(default = "default_control_rate_hz")]
    pub control_rate_hz: f32,
    /// Per-axis configuration.
    #[serde(default)]
    pub axes: [AxisConfig; AXIS_COUNT],
}

fn default_control_rate_hz() -> f32 {
    8000.0
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            control_rate_hz: default_control_rate_hz(),
            axes: Default::default(),
        }
    }
}

impl LoopConfig {
    /// Run all parameter-bound checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.control_rate_hz > 0.0) {
            return Err(ConfigError::Validation(format!(
                "control_rate_hz must be > 0 (got {})",
                self.control_rate_hz
            )));
        }
        for (i, axis) in self.axes.iter().enumerate() {
            axis.controller
                .validate()
                .map_err(|reason| ConfigError::Validation(format!("axis {i}: {reason}")))?;
            axis.motor
                .validate()
                .map_err(|reason| ConfigError::Validation(format!("axis {i}: {reason}")))?;
            axis.trap_traj
                .validate()
                .map_err(|reason| ConfigError::Validation(format!("axis {i}: {reason}")))?;
        }
        Ok(())
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the loop configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoopConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    load_config_from_str(&text)
}

/// Load and validate the loop configuration from a TOML string.
pub fn load_config_from_str(text: &str) -> Result<LoopConfig, ConfigError> {
    let config: LoopConfig =
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
