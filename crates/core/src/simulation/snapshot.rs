//! Read-only views of the model state for monitoring

use serde::{Deserialize, Serialize};

/// State of one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Pore pressure (Pa)
    pub pressure: f64,
    /// Mass per fluid slot (kg)
    pub masses: Vec<f64>,
    /// Volume per fluid slot (m³)
    pub volumes: Vec<f64>,
    /// Cell temperature (K), when a thermal binding provides one
    pub temperature: Option<f64>,
}

impl CellSnapshot {
    /// Total fluid mass (kg)
    pub fn total_mass(&self) -> f64 {
        self.masses.iter().sum()
    }

    /// Volume fraction of slot `index` (0 when empty)
    pub fn saturation(&self, index: usize) -> f64 {
        let total: f64 = self.volumes.iter().sum();
        match self.volumes.get(index) {
            Some(v) if total > 0.0 => v / total,
            _ => 0.0,
        }
    }
}

/// State of the whole model at one instant
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulated time (s)
    pub time: f64,
    /// Completed steps
    pub step: u64,
    /// Per-cell states, in cell order
    pub cells: Vec<CellSnapshot>,
}

impl Snapshot {
    /// Total fluid mass over all cells (kg)
    pub fn total_mass(&self) -> f64 {
        self.cells.iter().map(CellSnapshot::total_mass).sum()
    }

    /// Pressure range `(min, max)` over all cells
    pub fn pressure_range(&self) -> Option<(f64, f64)> {
        let mut pressures = self.cells.iter().map(|c| c.pressure);
        let first = pressures.next()?;
        Some(pressures.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}
