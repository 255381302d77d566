//! Trapezoidal trajectory planner.
//!
//! Pure plan→eval: `plan` precomputes the phase durations once per goal
//! change, `eval` is a constant-time sample at an arbitrary trajectory
//! time. The playback clock lives in the controller, not here.
//!
//! The profile handles a moving start (including one already travelling
//! faster than the cruise limit, or moving away from the goal), an
//! asymmetric accel/decel pair, and degenerates to a triangle profile
//! when the move is too short to reach cruise velocity.

/// One sample of the planned profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajStep {
    /// Position [turn].
    pub y: f32,
    /// Velocity [turn/s].
    pub yd: f32,
    /// Acceleration [turn/s²].
    pub ydd: f32,
}

/// Planned trapezoidal profile.
#[derive(Debug, Clone, Copy)]
pub struct TrapezoidalTrajectory {
    start_pos: f32,
    start_vel: f32,
    end_pos: f32,
    /// Signed acceleration during the ramp-up phase.
    accel: f32,
    /// Signed cruise velocity.
    vel_cruise: f32,
    /// Signed acceleration during the ramp-down phase.
    decel: f32,
    t_accel: f32,
    t_vel: f32,
    t_decel: f32,
    tf: f32,
    /// Position at the end of the acceleration phase.
    pos_after_accel: f32,
}

/// `+1` for non-negative values, `-1` otherwise (no zero case, so a
/// zero-length move still gets a well-defined direction).
#[inline]
fn sign_hard(x: f32) -> f32 {
    if x.is_sign_negative() {
        -1.0
    } else {
        1.0
    }
}

impl Default for TrapezoidalTrajectory {
    fn default() -> Self {
        Self {
            start_pos: 0.0,
            start_vel: 0.0,
            end_pos: 0.0,
            accel: 0.0,
            vel_cruise: 0.0,
            decel: 0.0,
            t_accel: 0.0,
            t_vel: 0.0,
            t_decel: 0.0,
            tf: 0.0,
            pos_after_accel: 0.0,
        }
    }
}

impl TrapezoidalTrajectory {
    /// Plan a profile from `(start_pos, start_vel)` to rest at `goal`.
    ///
    /// `vel_limit`, `accel_limit`, and `decel_limit` must be strictly
    /// positive (enforced by config validation).
    pub fn plan(
        &mut self,
        goal: f32,
        start_pos: f32,
        start_vel: f32,
        vel_limit: f32,
        accel_limit: f32,
        decel_limit: f32,
    ) {
        let dx = goal - start_pos;
        // Distance consumed by braking to rest from the initial velocity;
        // decides on which side of the goal the profile has to work.
        let stop_dist = (start_vel * start_vel) / (2.0 * decel_limit);
        let dx_stop = stop_dist.copysign(start_vel);
        let s = sign_hard(dx - dx_stop);

        let mut accel = s * accel_limit;
        let decel = -s * decel_limit;
        let mut vel_cruise = s * vel_limit;

        // Entering faster than the cruise limit: the first phase brakes
        // down to it instead of ramping up.
        if s * start_vel > vel_limit {
            accel = -accel;
        }

        let mut t_accel = (vel_cruise - start_vel) / accel;
        let mut t_decel = -vel_cruise / decel;
        let dx_min = 0.5 * t_accel * (vel_cruise + start_vel) + 0.5 * t_decel * vel_cruise;

        let t_vel = if s * dx < s * dx_min {
            // Too short to reach cruise: peak velocity from the
            // accel/decel intersection, no constant-velocity phase.
            let peak_sq = (decel * start_vel * start_vel + 2.0 * accel * decel * dx)
                / (decel - accel);
            vel_cruise = s * peak_sq.max(0.0).sqrt();
            t_accel = ((vel_cruise - start_vel) / accel).max(0.0);
            t_decel = (-vel_cruise / decel).max(0.0);
            0.0
        } else {
            (dx - dx_min) / vel_cruise
        };

        self.start_pos = start_pos;
        self.start_vel = start_vel;
        self.end_pos = goal;
        self.accel = accel;
        self.vel_cruise = vel_cruise;
        self.decel = decel;
        self.t_accel = t_accel;
        self.t_vel = t_vel;
        self.t_decel = t_decel;
        self.tf = t_accel + t_vel + t_decel;
        self.pos_after_accel =
            start_pos + start_vel * t_accel + 0.5 * accel * t_accel * t_accel;
    }

    /// Total profile duration [s].
    #[inline]
    pub fn tf(&self) -> f32 {
        self.tf
    }

    /// Sample the profile at trajectory time `t`.
    ///
    /// `t < 0` holds the initial state; `t > tf` holds the goal at rest.
    pub fn eval(&self, t: f32) -> TrajStep {
        if t < 0.0 {
            TrajStep {
                y: self.start_pos,
                yd: self.start_vel,
                ydd: 0.0,
            }
        } else if t < self.t_accel {
            TrajStep {
                y: self.start_pos + self.start_vel * t + 0.5 * self.accel * t * t,
                yd: self.start_vel + self.accel * t,
                ydd: self.accel,
            }
        } else if t < self.t_accel + self.t_vel {
            TrajStep {
                y: self.pos_after_accel + self.vel_cruise * (t - self.t_accel),
                yd: self.vel_cruise,
                ydd: 0.0,
            }
        } else if t <= self.tf {
            // Count backwards from the end point; lands exactly on the
            // goal at t == tf.
            let td = t - self.tf;
            TrajStep {
                y: self.end_pos + 0.5 * self.decel * td * td,
                yd: self.decel * td,
                ydd: self.decel,
            }
        } else {
            TrajStep {
                y: self.end_pos,
                yd: 0.0,
                ydd: 0.0,
            }
        }
    }
}
