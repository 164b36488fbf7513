//! Adaptive time-step control
//!
//! The flow and thermal solvers report `dv_max`, the largest relative change a
//! face produced during the step. The controller scales dt so that the next
//! step aims at `dv_relative`:
//!
//! ```text
//! dt' = dt · min(2, √(dv_relative / dv_max))   if dv_max ≤ dv_relative
//! dt' = dt · dv_relative / dv_max              otherwise
//! ```
//!
//! The recommendation is advisory; callers may always pass their own dt.

use serde::{Deserialize, Serialize};

/// Maximum growth factor per step
const MAX_GROWTH: f64 = 2.0;

/// Step-size controller settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestepController {
    /// Target relative change per step
    pub dv_relative: f64,
    /// Smallest recommended dt (s)
    pub dt_min: f64,
    /// Largest recommended dt (s)
    pub dt_max: f64,
}

impl Default for TimestepController {
    fn default() -> Self {
        Self {
            dv_relative: 0.1,
            dt_min: 1.0e-6,
            dt_max: 1.0e6,
        }
    }
}

impl TimestepController {
    /// Recommended next dt after a step of length `dt` with largest change `dv_max`
    pub fn recommend(&self, dt: f64, dv_max: f64) -> f64 {
        if !dv_max.is_finite() {
            return self.dt_min;
        }
        let factor = if dv_max <= 0.0 {
            MAX_GROWTH
        } else if dv_max <= self.dv_relative {
            (self.dv_relative / dv_max).sqrt().min(MAX_GROWTH)
        } else {
            self.dv_relative / dv_max
        };
        self.clamp(dt * factor)
    }

    /// Limit `dt` to `[dt_min, dt_max]`
    pub fn clamp(&self, dt: f64) -> f64 {
        dt.clamp(self.dt_min, self.dt_max)
    }
}
