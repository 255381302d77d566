//! Anticogging feed-forward table.
//!
//! A fixed-size circular table of torque corrections indexed by
//! single-turn position. Entries are *written* by the integrator-driven
//! online calibration (velocity mode only) and *read* by the live
//! lookup on every tick where the feature is enabled or calibrating —
//! both on the same control task, so per-entry consistency is enough.
//!
//! The bin vector is allocated once at construction and never resized;
//! the tick path touches at most two entries.

use crate::control::math::fmod_pos;

/// Single-pole low-pass coefficient for the correction-power telemetry.
const CORRECTION_PWR_ALPHA: f32 = 0.001;

/// Circular torque feed-forward table, one mechanical revolution wide.
#[derive(Debug, Clone)]
pub struct AnticoggingMap {
    bins: Vec<f32>,
    /// Low-passed RMS of the calibration correction rate [Nm²/s²].
    correction_pwr: f32,
}

impl AnticoggingMap {
    /// Allocate a zeroed map with `size` bins. `size` must be non-zero
    /// (enforced by config validation).
    pub fn new(size: usize) -> Self {
        Self {
            bins: vec![0.0; size],
            correction_pwr: 0.0,
        }
    }

    /// Number of bins.
    #[inline]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True when the map has no bins.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Read-only view of the bins (telemetry / persistence).
    #[inline]
    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    /// Mutable view of the bins (persistence restore). The length is
    /// fixed; callers overwrite entries in place.
    #[inline]
    pub fn bins_mut(&mut self) -> &mut [f32] {
        &mut self.bins
    }

    /// Low-passed square of the calibration correction rate.
    #[inline]
    pub fn correction_pwr(&self) -> f32 {
        self.correction_pwr
    }

    /// Straddling bin pair and interpolation fraction for a position.
    ///
    /// `i = floor(frac(pos) * N)`, `i1 = (i + 1) mod N`, weights
    /// `(1 - f, f)`. The modulo on `i` absorbs the one-ulp case where
    /// `frac(pos) * N` rounds up to exactly `N`.
    #[inline]
    fn index(&self, pos: f32) -> (usize, usize, f32) {
        let n = self.bins.len();
        let x = fmod_pos(pos, 1.0) * n as f32;
        let i = x as usize;
        let frac = x - i as f32;
        let i = i % n;
        (i, (i + 1) % n, frac)
    }

    /// Interpolated feed-forward torque at a position [Nm].
    #[inline]
    pub fn lookup(&self, pos: f32) -> f32 {
        let (i, i1, frac) = self.index(pos);
        (1.0 - frac) * self.bins[i] + frac * self.bins[i1]
    }

    /// One calibration update: integrate the velocity error into the two
    /// straddling bins, clamp them to `±max_torque`, and refresh the
    /// correction-power telemetry.
    pub fn calibration_step(
        &mut self,
        pos: f32,
        vel_error: f32,
        integrator_gain: f32,
        max_torque: f32,
        dt: f32,
    ) {
        let (i, i1, frac) = self.index(pos);
        let rate = integrator_gain * vel_error;
        let delta = rate * dt;

        self.bins[i] += (1.0 - frac) * delta;
        self.bins[i1] += frac * delta;
        self.bins[i] = self.bins[i].clamp(-max_torque, max_torque);
        self.bins[i1] = self.bins[i1].clamp(-max_torque, max_torque);

        self.correction_pwr += CORRECTION_PWR_ALPHA * (rate * rate - self.correction_pwr);
    }

    /// Subtract the arithmetic mean from every bin, removing the
    /// constant-torque offset left behind by calibration. Idempotent.
    pub fn remove_bias(&mut self) {
        if self.bins.is_empty() {
            return;
        }
        let mean = self.bins.iter().sum::<f32>() / self.bins.len() as f32;
        for bin in &mut self.bins {
            *bin -= mean;
        }
    }
}
