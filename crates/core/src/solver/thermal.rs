//! Implicit heat conduction on a cell scalar
//!
//! ```text
//! mc_i·T_i' + dt·Σ_j g_ij·(T_i' − T_j') = mc_i·T_i
//! ```
//!
//! `T` and `mc` are cell attributes and `g` a face attribute, selected by a
//! [`ThermalBinding`]. Cells missing `T` or a positive `mc` are held fixed and
//! their faces are treated as insulated. Like the flow solver, the system is
//! solved for the increments `T' − T`.

use super::linear::{pcg_solve, SolveReport, SparseMatrix};
use crate::error::SeepageError;
use crate::mesh::{Cell, Face};
use crate::parallel;
use crate::simulation::SeepageConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Attribute ids driving the thermal solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermalBinding {
    /// Cell temperature (K)
    pub cell_temp: usize,
    /// Cell heat capacity mc (J/K)
    pub cell_capacity: usize,
    /// Face thermal conductance g (W/K)
    pub face_conductance: usize,
}

/// Outcome of one thermal step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThermalReport {
    /// Temperature solve statistics
    pub solve: SolveReport,
    /// Largest face heat transfer relative to the smaller cell's heat content
    pub dv_max: f64,
}

/// `(T, mc)` of a cell taking part in conduction
fn thermal_state(cell: &Cell, binding: &ThermalBinding) -> Option<(f64, f64)> {
    let t = cell.attrs.get(binding.cell_temp)?;
    let mc = cell.attrs.get(binding.cell_capacity)?;
    (mc > 0.0 && t.is_finite()).then_some((t, mc))
}

/// Advance cell temperatures by `dt`
///
/// # Errors
/// Returns `Allocation` when the linear system cannot be reserved.
pub(crate) fn iterate_thermal(
    cells: &mut [Cell],
    faces: &[Face],
    binding: &ThermalBinding,
    config: &SeepageConfig,
    dt: f64,
) -> Result<ThermalReport, SeepageError> {
    let n = cells.len();
    if n == 0 || dt <= 0.0 {
        return Ok(ThermalReport {
            solve: SolveReport {
                converged: true,
                ..SolveReport::default()
            },
            dv_max: 0.0,
        });
    }
    let par = config.parallel;
    let states = parallel::map_indexed(cells, par, |_, cell| thermal_state(cell, binding));

    let mut matrix = SparseMatrix::zeros(n)?;
    let mut rhs = Vec::new();
    rhs.try_reserve_exact(n)?;
    for (i, state) in states.iter().enumerate() {
        matrix.add_diagonal(i, state.map_or(1.0, |(_, mc)| mc));
        rhs.push(0.0);
    }

    let mut couplings = Vec::new();
    couplings.try_reserve(faces.len())?;
    for face in faces {
        let (a, b) = face.cells();
        let (Some((ta, _)), Some((tb, _))) = (states[a], states[b]) else {
            continue;
        };
        let g = face.attrs.get(binding.face_conductance).unwrap_or(0.0);
        if g <= 0.0 {
            continue;
        }
        let gdt = g * dt;
        matrix.add_coupling(a, b, gdt);
        let flux = gdt * (ta - tb);
        rhs[a] -= flux;
        rhs[b] += flux;
        couplings.push((a, b, gdt));
    }

    let (delta, solve) = pcg_solve(&matrix, &rhs, vec![0.0; n], &config.solver, par);
    if !solve.converged {
        warn!(
            "Temperature solve did not converge: {} iterations, residual {:.3e}",
            solve.iterations, solve.residual
        );
    }

    let mut dv_max: f64 = 0.0;
    for &(a, b, gdt) in &couplings {
        let (Some((ta, mca)), Some((tb, mcb))) = (states[a], states[b]) else {
            continue;
        };
        let heat = gdt * ((ta + delta[a]) - (tb + delta[b]));
        let content = (mca * ta.abs().max(1.0)).min(mcb * tb.abs().max(1.0));
        dv_max = dv_max.max(heat.abs() / content);
    }

    parallel::for_each_mut(cells, par, |i, cell| {
        if let Some((t, _)) = states[i] {
            cell.attrs.set(binding.cell_temp, t + delta[i]);
        }
    });

    Ok(ThermalReport { solve, dv_max })
}
