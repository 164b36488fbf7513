//! Fluid-rock heat exchange inside each cell
//!
//! The fluids of a cell (heat capacity `C_f = Σ m·c` from the definitions) and
//! the rock (capacity `C_r`, a cell attribute) relax toward their common
//! temperature through a conductance `g`:
//!
//! ```text
//! T_eq = (C_f·T_f + C_r·T_r) / (C_f + C_r)
//! a    = 1 − exp(−g·dt·(1/C_f + 1/C_r))
//! T'   = T + a·(T_eq − T)          for both bodies
//! ```
//!
//! The update is exact for the two-body problem and conserves `C_f·T_f + C_r·T_r`.

use crate::fluid::FluDef;
use crate::mesh::Cell;
use crate::parallel;
use serde::{Deserialize, Serialize};

/// Attribute ids driving the fluid-rock exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatExchangeBinding {
    /// Cell (rock) temperature (K)
    pub cell_temp: usize,
    /// Cell (rock) heat capacity (J/K)
    pub cell_capacity: usize,
    /// Fluid-rock conductance (W/K)
    pub cell_g: usize,
}

/// Fluid heat capacity and mean temperature of a cell
///
/// Leaves without a temperature attribute are assumed at `fallback`.
fn fluid_heat(cell: &Cell, defs: &[FluDef], fluid_temp: usize, fallback: f64) -> (f64, f64) {
    let mut capacity = 0.0;
    let mut enthalpy = 0.0;
    for (fluid, def) in cell.fluids().iter().zip(defs) {
        fluid.for_each_leaf_with_def(def, &mut |leaf, leaf_def| {
            let c = leaf.mass * leaf_def.specific_heat();
            capacity += c;
            enthalpy += c * leaf.attrs.get(fluid_temp).unwrap_or(fallback);
        });
    }
    if capacity > 0.0 {
        (capacity, enthalpy / capacity)
    } else {
        (0.0, fallback)
    }
}

fn exchange_cell(
    cell: &mut Cell,
    defs: &[FluDef],
    binding: &HeatExchangeBinding,
    fluid_temp: usize,
    dt: f64,
) -> f64 {
    let (Some(t_rock), Some(c_rock), Some(g)) = (
        cell.attrs.get(binding.cell_temp),
        cell.attrs.get(binding.cell_capacity),
        cell.attrs.get(binding.cell_g),
    ) else {
        return 0.0;
    };
    if c_rock <= 0.0 || g <= 0.0 {
        return 0.0;
    }
    let (c_fluid, t_fluid) = fluid_heat(cell, defs, fluid_temp, t_rock);
    if c_fluid <= 0.0 {
        return 0.0;
    }

    let t_eq = (c_fluid * t_fluid + c_rock * t_rock) / (c_fluid + c_rock);
    let a = 1.0 - (-g * dt * (1.0 / c_fluid + 1.0 / c_rock)).exp();
    let shift = a * (t_eq - t_fluid);
    cell.attrs.set(binding.cell_temp, t_rock + a * (t_eq - t_rock));
    for fluid in cell.fluids_mut() {
        fluid.for_each_leaf_mut(&mut |leaf| {
            let t = leaf.attrs.get(fluid_temp).unwrap_or(t_rock);
            leaf.attrs.set(fluid_temp, t + shift);
        });
    }
    shift * c_fluid
}

/// Relax fluid and rock temperatures of every cell over `dt`
///
/// Returns the total heat moved from rock to fluid (J).
pub(crate) fn exchange_heat(
    cells: &mut [Cell],
    defs: &[FluDef],
    binding: &HeatExchangeBinding,
    fluid_temp: usize,
    dt: f64,
    parallel: bool,
) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    parallel::map_mut(cells, parallel, |_, cell| {
        exchange_cell(cell, defs, binding, fluid_temp, dt)
    })
    .into_iter()
    .sum()
}
