//! Finite-volume cells and the linear pore elastic model

use crate::core_types::{Attrs, Vec3};
use crate::error::SeepageError;
use crate::fluid::{distribute_volume, Fluid, Saturation};
use serde::{Deserialize, Serialize};

/// Linear pore elasticity: `volume(p) = v0 + k·p`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoreParams")]
pub struct PoreModel {
    v0: f64,
    k: f64,
}

/// Unchecked form of [`PoreModel`] read from storage
#[derive(Deserialize)]
struct PoreParams {
    v0: f64,
    k: f64,
}

impl TryFrom<PoreParams> for PoreModel {
    type Error = SeepageError;

    fn try_from(params: PoreParams) -> Result<Self, Self::Error> {
        Self::new(params.v0, params.k)
    }
}

impl PoreModel {
    /// Create a pore model with volume `v0` (m³) at zero pressure and
    /// compressibility `k` (m³/Pa)
    ///
    /// # Errors
    /// Returns `InvalidPore` unless both parameters are finite and positive.
    pub fn new(v0: f64, k: f64) -> Result<Self, SeepageError> {
        if v0.is_finite() && k.is_finite() && v0 > 0.0 && k > 0.0 {
            Ok(Self { v0, k })
        } else {
            Err(SeepageError::InvalidPore { v0, k })
        }
    }

    /// Pore model with volume `v` at pressure `p` and volume `v·(1 + dv)` at `p + dp`
    ///
    /// # Errors
    /// Returns `InvalidPore` when the implied `v0` or `k` is not positive.
    pub fn from_points(p: f64, v: f64, dp: f64, dv: f64) -> Result<Self, SeepageError> {
        let k = v * dv / dp;
        Self::new(v - k * p, k)
    }

    /// Volume at zero pressure (m³)
    #[inline]
    pub fn v0(&self) -> f64 {
        self.v0
    }

    /// Compressibility (m³/Pa)
    #[inline]
    pub fn k(&self) -> f64 {
        self.k
    }

    /// Pore volume at pressure `p`
    #[inline]
    pub fn volume(&self, p: f64) -> f64 {
        self.v0 + self.k * p
    }

    /// Pressure at which the pore volume equals `v`
    #[inline]
    pub fn pressure(&self, v: f64) -> f64 {
        (v - self.v0) / self.k
    }
}

/// A control volume holding fluids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell centre (m)
    pub pos: Vec3,
    /// Pore elastic model
    pub pore: PoreModel,
    fluids: Vec<Fluid>,
    /// User attributes (temperature, heat capacity, rate factors, ...)
    pub attrs: Attrs,
}

impl Cell {
    /// Create a cell with the given fluid slots
    pub fn new(pos: Vec3, pore: PoreModel, fluids: Vec<Fluid>) -> Self {
        Self {
            pos,
            pore,
            fluids,
            attrs: Attrs::new(),
        }
    }

    /// Fluid slots
    pub fn fluids(&self) -> &[Fluid] {
        &self.fluids
    }

    /// Mutable fluid slots (the slot count itself is fixed by the model)
    pub fn fluids_mut(&mut self) -> &mut [Fluid] {
        &mut self.fluids
    }

    /// Fluid in slot `index`
    pub fn fluid(&self, index: usize) -> Option<&Fluid> {
        self.fluids.get(index)
    }

    /// Mutable fluid in slot `index`
    pub fn fluid_mut(&mut self, index: usize) -> Option<&mut Fluid> {
        self.fluids.get_mut(index)
    }

    /// Component reached by `path`, whose first entry is the slot index
    pub fn component(&self, path: &[usize]) -> Option<&Fluid> {
        let (&slot, rest) = path.split_first()?;
        self.fluids.get(slot)?.get(rest)
    }

    /// Mutable component reached by `path`
    pub fn component_mut(&mut self, path: &[usize]) -> Option<&mut Fluid> {
        let (&slot, rest) = path.split_first()?;
        self.fluids.get_mut(slot)?.get_mut(rest)
    }

    pub(crate) fn push_fluid(&mut self, fluid: Fluid) {
        self.fluids.push(fluid);
    }

    /// Total fluid mass (kg)
    pub fn fluid_mass(&self) -> f64 {
        self.fluids.iter().map(Fluid::mass).sum()
    }

    /// Total fluid volume (m³)
    pub fn fluid_volume(&self) -> f64 {
        self.fluids.iter().map(Fluid::volume).sum()
    }

    /// Pore pressure implied by the current fluid volume (Pa)
    pub fn pressure(&self) -> f64 {
        self.pore.pressure(self.fluid_volume())
    }

    /// Volume fraction of slot `index` in the fluid volume (0 when empty)
    pub fn saturation(&self, index: usize) -> f64 {
        let total = self.fluid_volume();
        match self.fluids.get(index) {
            Some(fluid) if total > 0.0 => fluid.volume() / total,
            _ => 0.0,
        }
    }

    /// Bulk fluid density Σm / ΣV (0 when empty)
    pub fn bulk_density(&self) -> f64 {
        let volume = self.fluid_volume();
        if volume > 0.0 {
            self.fluid_mass() / volume
        } else {
            0.0
        }
    }

    /// Fill the pore at pressure `p` with fluids in the given volume ratios
    ///
    /// Saturations are normalized to sum 1. If they sum to zero every fluid is
    /// emptied, whatever `p` is.
    pub fn fill(&mut self, p: f64, saturations: &[Saturation]) {
        let total: f64 = saturations.iter().map(Saturation::total).sum();
        let volume = if total > 0.0 { self.pore.volume(p) } else { 0.0 };
        distribute_volume(&mut self.fluids, saturations, volume);
    }
}
