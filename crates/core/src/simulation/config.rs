//! Model-wide configuration

use crate::core_types::Vec3;
use crate::solver::{
    HeatExchangeBinding, KrPolicy, SolverConfig, ThermalBinding, TimestepController,
};
use serde::{Deserialize, Serialize};

/// Relaxation of stored density/viscosity toward the property tables
///
/// `new = old + relax·(table − old)`, then clamped to the configured range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    /// Relaxation factor in `[0, 1]`; 0 freezes the properties
    pub relax: f64,
    /// Allowed density range (kg/m³)
    pub density_range: (f64, f64),
    /// Allowed viscosity range (Pa·s)
    pub viscosity_range: (f64, f64),
}

impl Default for PropertyUpdate {
    fn default() -> Self {
        Self {
            relax: 1.0,
            density_range: (1.0e-3, 1.0e5),
            viscosity_range: (1.0e-8, 1.0e6),
        }
    }
}

impl PropertyUpdate {
    /// Relax `old` toward `table` and clamp to `range`
    #[inline]
    pub fn relax(&self, old: f64, table: f64, range: (f64, f64)) -> f64 {
        let relax = self.relax.clamp(0.0, 1.0);
        (old + relax * (table - old)).clamp(range.0, range.1)
    }
}

/// Configuration of a [`crate::Seepage`] model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeepageConfig {
    /// Linear solver settings shared by the flow and thermal solvers
    pub solver: SolverConfig,
    /// Run per-cell and per-face loops on the rayon pool
    pub parallel: bool,
    /// Step-size control
    pub timestep: TimestepController,
    /// Gravity acceleration (m/s²)
    pub gravity: Vec3,
    /// Relative permeability combination rule
    pub kr_policy: KrPolicy,
    /// Fluid slots treated as immobile solids (hydrate, ice, salt)
    pub solid_fluids: Vec<usize>,
    /// kr curve applied to `1 − s_solid`, when solids clog the pores
    pub solid_kr: Option<usize>,
    /// Density/viscosity relaxation
    pub property_update: PropertyUpdate,
    /// Fluid attribute holding temperature (K), used for table lookups
    pub fluid_temp: Option<usize>,
    /// Attributes driving the implicit heat conduction, if enabled
    pub thermal: Option<ThermalBinding>,
    /// Attributes driving fluid-rock heat exchange, if enabled
    pub heat_exchange: Option<HeatExchangeBinding>,
}

impl Default for SeepageConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            parallel: true,
            timestep: TimestepController::default(),
            gravity: Vec3::zeros(),
            kr_policy: KrPolicy::default(),
            solid_fluids: Vec::new(),
            solid_kr: None,
            property_update: PropertyUpdate::default(),
            fluid_temp: None,
            thermal: None,
            heat_exchange: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relax_and_clamp() {
        let update = PropertyUpdate {
            relax: 0.5,
            ..PropertyUpdate::default()
        };
        assert_eq!(update.relax(1000.0, 1010.0, (0.0, 2000.0)), 1005.0);
        assert_eq!(update.relax(1000.0, 5000.0, (0.0, 2000.0)), 2000.0);
    }

    #[test]
    fn test_defaults_deserialize_from_partial_json() {
        let config: SeepageConfig = serde_json::from_str(r#"{"parallel": false}"#).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.kr_policy, KrPolicy::PerFluid);
        assert_eq!(config.gravity, Vec3::zeros());
    }
}
