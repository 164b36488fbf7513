//! Implicit pressure solve and upwind multiphase transport
//!
//! # Physics Implementation
//!
//! Each cell's pressure follows from its fluid volume through the pore model,
//! `p = (V − v0)/k`. Conserving volume over a step of length `dt` gives one
//! equation per cell:
//!
//! ```text
//! k_i·p_i' + dt·Σ_j T_ij·(p_i' − p_j') = k_i·p_i − dt·Σ_j T_ij·G_ij
//! ```
//!
//! Where:
//! - `T_ij = cond·λ_up`: face conductance times the upstream mobility
//! - `G_ij = ρ_ij·g·(x_j − x_i)`: explicit gravity head along the face
//!
//! The system is solved for the increments `δ = p' − p`, whose right-hand side
//! is the explicit face flux. This keeps the residual on the scale of the flux
//! rather than of the absolute pressure.
//!
//! The face volumes `dV_ij = dt·T_ij·(p_i' − p_j' + G_ij)` are then split
//! across the upstream fluids by mobility share, converted to mass with the
//! upstream densities and moved through the shared transfer limiter.

use super::kr::{KrSettings, Mobility};
use super::linear::{pcg_solve, SolveReport, SparseMatrix};
use super::transfer::{apply_transfers, Transfer};
use crate::core_types::Interp1;
use crate::error::SeepageError;
use crate::mesh::{Cell, Face};
use crate::parallel;
use crate::simulation::SeepageConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Outcome of one flow step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowReport {
    /// Pressure solve statistics
    pub solve: SolveReport,
    /// Largest face volume transfer relative to the smaller cell's `v0`
    pub dv_max: f64,
    /// Number of `(cell, fluid)` sources whose outflow had to be truncated
    pub limited: usize,
}

/// Per-face quantities frozen at the start of the step
#[derive(Debug, Clone, Copy, Default)]
struct FaceTerm {
    /// Transmissibility `cond·λ` (m³/(Pa·s))
    trans: f64,
    /// Gravity head from the first to the second cell (Pa)
    head: f64,
}

/// Mean bulk density across a face; a single filled side wins
fn face_density(a: &Cell, b: &Cell) -> f64 {
    let (ra, rb) = (a.bulk_density(), b.bulk_density());
    match (ra > 0.0, rb > 0.0) {
        (true, true) => 0.5 * (ra + rb),
        (true, false) => ra,
        (false, true) => rb,
        (false, false) => 0.0,
    }
}

fn face_term(
    cells: &[Cell],
    face: &Face,
    pressures: &[f64],
    kr: &KrSettings<'_>,
    config: &SeepageConfig,
) -> FaceTerm {
    let (a, b) = face.cells();
    let (ca, cb) = (&cells[a], &cells[b]);
    let head = face_density(ca, cb) * config.gravity.dot(&(cb.pos - ca.pos));
    let potential = pressures[a] - pressures[b] + head;
    let lambda = if potential > 0.0 {
        kr.mobility(ca, face).total
    } else if potential < 0.0 {
        kr.mobility(cb, face).total
    } else {
        0.5 * (kr.mobility(ca, face).total + kr.mobility(cb, face).total)
    };
    FaceTerm {
        trans: face.cond.max(0.0) * lambda,
        head,
    }
}

/// Mass requests carried by one face volume `dv` (positive: first → second cell)
fn face_transfers(cells: &[Cell], face: &Face, dv: f64, kr: &KrSettings<'_>) -> Vec<Transfer> {
    let (a, b) = face.cells();
    let (from, to) = if dv > 0.0 { (a, b) } else { (b, a) };
    let upstream = &cells[from];
    let Mobility { fractions, .. } = kr.mobility(upstream, face);
    fractions
        .iter()
        .enumerate()
        .filter(|&(_, &share)| share > 0.0)
        .map(|(slot, &share)| Transfer {
            from,
            to,
            slot,
            mass: dv.abs() * share * upstream.fluids()[slot].density(),
        })
        .collect()
}

/// Advance pressures and fluid masses by `dt`
///
/// # Errors
/// Returns `Allocation` when the linear system cannot be reserved.
pub(crate) fn iterate_flow(
    cells: &mut [Cell],
    faces: &[Face],
    kr_curves: &[Interp1],
    config: &SeepageConfig,
    dt: f64,
) -> Result<FlowReport, SeepageError> {
    let n = cells.len();
    if n == 0 || dt <= 0.0 {
        return Ok(FlowReport {
            solve: SolveReport {
                converged: true,
                ..SolveReport::default()
            },
            ..FlowReport::default()
        });
    }
    let par = config.parallel;
    let kr = KrSettings {
        policy: config.kr_policy,
        curves: kr_curves,
        solid_fluids: &config.solid_fluids,
        solid_kr: config.solid_kr,
    };

    // Assemble
    let pressures = parallel::map_indexed(cells, par, |_, cell| cell.pressure());
    let terms: Vec<FaceTerm> = {
        let cells: &[Cell] = cells;
        parallel::map_indexed(faces, par, |_, face| {
            face_term(cells, face, &pressures, &kr, config)
        })
    };

    let mut matrix = SparseMatrix::zeros(n)?;
    let mut rhs = Vec::new();
    rhs.try_reserve_exact(n)?;
    for (i, cell) in cells.iter().enumerate() {
        matrix.add_diagonal(i, cell.pore.k());
        rhs.push(0.0);
    }
    for (face, term) in faces.iter().zip(&terms) {
        if term.trans <= 0.0 {
            continue;
        }
        let (a, b) = face.cells();
        let g = dt * term.trans;
        matrix.add_coupling(a, b, g);
        let flux = g * (pressures[a] - pressures[b] + term.head);
        rhs[a] -= flux;
        rhs[b] += flux;
    }

    // Solve
    let (delta, solve) = pcg_solve(&matrix, &rhs, vec![0.0; n], &config.solver, par);
    if !solve.converged {
        warn!(
            "Pressure solve did not converge: {} iterations, residual {:.3e}",
            solve.iterations, solve.residual
        );
    }

    // Transport
    let volumes: Vec<f64> = faces
        .iter()
        .zip(&terms)
        .map(|(face, term)| {
            let (a, b) = face.cells();
            let (pa, pb) = (pressures[a] + delta[a], pressures[b] + delta[b]);
            dt * term.trans * (pa - pb + term.head)
        })
        .collect();

    let dv_max = faces
        .iter()
        .zip(&volumes)
        .map(|(face, dv)| {
            let (a, b) = face.cells();
            dv.abs() / cells[a].pore.v0().min(cells[b].pore.v0())
        })
        .fold(0.0, f64::max);

    let transfers: Vec<Transfer> = {
        let cells: &[Cell] = cells;
        parallel::map_indexed(faces, par, |i, face| {
            if volumes[i] == 0.0 {
                Vec::new()
            } else {
                face_transfers(cells, face, volumes[i], &kr)
            }
        })
        .into_iter()
        .flatten()
        .collect()
    };
    let summary = apply_transfers(cells, &transfers);
    if summary.limited > 0 {
        debug!(
            "Flow truncated outflow of {} cell fluids to their available mass",
            summary.limited
        );
    }

    Ok(FlowReport {
        solve,
        dv_max,
        limited: summary.limited,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Vec3;
    use crate::fluid::Fluid;
    use crate::mesh::PoreModel;
    use approx::assert_relative_eq;

    fn water_cell(x: f64, p: f64) -> Cell {
        let mut cell = Cell::new(
            Vec3::new(x, 0.0, 0.0),
            PoreModel::new(1.0, 1.0e-9).unwrap(),
            vec![Fluid::leaf(0.0, 1000.0, 1.0e-3)],
        );
        cell.fill(p, &[1.0.into()]);
        cell
    }

    fn sequential() -> SeepageConfig {
        SeepageConfig {
            parallel: false,
            ..SeepageConfig::default()
        }
    }

    #[test]
    fn test_two_cells_equilibrate() {
        let mut cells = vec![water_cell(0.0, 1.0e6), water_cell(1.0, 0.0)];
        let faces = vec![Face::new(0, 1, 1.0e-6)];
        let mass: f64 = cells.iter().map(Cell::fluid_mass).sum();
        let report = iterate_flow(&mut cells, &faces, &[], &sequential(), 10.0).unwrap();
        assert!(report.solve.converged);
        assert!(report.dv_max > 0.0);
        assert_relative_eq!(cells[0].pressure(), 5.0e5, max_relative = 1e-3);
        assert_relative_eq!(cells[1].pressure(), 5.0e5, max_relative = 1e-3);
        let after: f64 = cells.iter().map(Cell::fluid_mass).sum();
        assert_relative_eq!(after, mass, max_relative = 1e-12);
    }

    #[test]
    fn test_gravity_drives_downward_flow() {
        let mut top = water_cell(0.0, 1.0e5);
        top.pos = Vec3::new(0.0, 0.0, 1.0);
        let bottom = water_cell(0.0, 1.0e5);
        let mut cells = vec![top, bottom];
        let faces = vec![Face::new(0, 1, 1.0e-9)];
        let config = SeepageConfig {
            gravity: Vec3::new(0.0, 0.0, -10.0),
            ..sequential()
        };
        iterate_flow(&mut cells, &faces, &[], &config, 1.0e-3).unwrap();
        assert!(cells[1].fluid_mass() > cells[0].fluid_mass());
    }

    #[test]
    fn test_solid_fluid_does_not_move() {
        let mut cells: Vec<Cell> = [1.0e6, 0.0]
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let mut cell = Cell::new(
                    Vec3::new(i as f64, 0.0, 0.0),
                    PoreModel::new(1.0, 1.0e-9).unwrap(),
                    vec![Fluid::leaf(0.0, 1000.0, 1.0e-3), Fluid::leaf(0.0, 900.0, 1.0)],
                );
                cell.fill(p, &[0.5.into(), 0.5.into()]);
                cell
            })
            .collect();
        let solid_before = cells[0].fluids()[1].mass();
        let faces = vec![Face::new(0, 1, 1.0e-6)];
        let config = SeepageConfig {
            solid_fluids: vec![1],
            ..sequential()
        };
        iterate_flow(&mut cells, &faces, &[], &config, 1.0).unwrap();
        assert_eq!(cells[0].fluids()[1].mass(), solid_before);
        assert!(cells[0].pressure() < 1.0e6);
    }

    #[test]
    fn test_zero_conductance_is_inert() {
        let mut cells = vec![water_cell(0.0, 1.0e6), water_cell(1.0, 0.0)];
        let faces = vec![Face::new(0, 1, 0.0)];
        let report = iterate_flow(&mut cells, &faces, &[], &sequential(), 1.0).unwrap();
        assert_eq!(report.dv_max, 0.0);
        assert_relative_eq!(cells[0].pressure(), 1.0e6, max_relative = 1e-9);
    }
}
