//! Counter-current capillary exchange
//!
//! A [`CapillaryRule`] pairs a wetting and a non-wetting fluid slot with a
//! capillary pressure curve `Pc(s_w)`. Across each face the wetting fluid moves
//! toward the higher capillary pressure and an equal volume of non-wetting
//! fluid moves back, so cell fluid volumes (and pressures) are unchanged.

use super::transfer::{apply_transfers, Transfer};
use crate::core_types::Interp1;
use crate::fluid::Fluid;
use crate::mesh::{Cell, Face};
use crate::parallel;
use serde::{Deserialize, Serialize};

/// Share of the saturation difference a single face may equalize per step
const MAX_EQUALIZATION: f64 = 0.5;

/// Capillary coupling between two fluid slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapillaryRule {
    /// Wetting fluid slot
    pub wetting: usize,
    /// Non-wetting fluid slot
    pub non_wetting: usize,
    /// Capillary pressure (Pa) as a function of wetting saturation
    pub pc: Interp1,
}

impl CapillaryRule {
    fn state(&self, cell: &Cell) -> Option<(f64, f64)> {
        let volume = cell.fluid_volume();
        if volume <= 0.0 {
            return None;
        }
        let s = cell.fluid(self.wetting)?.volume() / volume;
        cell.fluid(self.non_wetting)?;
        Some((s, self.pc.get(s)))
    }

    /// Wetting volume moving from the first to the second cell of `face`
    fn face_volume(&self, cells: &[Cell], face: &Face, dt: f64) -> f64 {
        let (a, b) = face.cells();
        let (ca, cb) = (&cells[a], &cells[b]);
        let (Some((sa, pca)), Some((sb, pcb))) = (self.state(ca), self.state(cb)) else {
            return 0.0;
        };
        let (up, down) = if pcb > pca { (ca, cb) } else { (cb, ca) };
        let (Some(wet), Some(dry)) = (up.fluid(self.wetting), down.fluid(self.non_wetting)) else {
            return 0.0;
        };
        let mu = wet.viscosity();
        if mu <= 0.0 || face.cond <= 0.0 {
            return 0.0;
        }
        let cap = MAX_EQUALIZATION * (sa - sb).abs() * ca.fluid_volume().min(cb.fluid_volume());
        let dv = (dt * face.cond * (pcb - pca).abs() / mu)
            .min(cap)
            .min(wet.volume())
            .min(dry.volume());
        if pcb > pca {
            dv
        } else {
            -dv
        }
    }

    /// Wetting mass leaving `from` and non-wetting mass leaving `to` across `face`
    fn face_exchange(&self, cells: &[Cell], face: &Face, dt: f64) -> Option<Exchange> {
        let dv = self.face_volume(cells, face, dt);
        if dv == 0.0 {
            return None;
        }
        let (a, b) = face.cells();
        let (from, to) = if dv > 0.0 { (a, b) } else { (b, a) };
        let dv = dv.abs();
        Some(Exchange {
            from,
            to,
            wet_mass: dv * cells[from].fluid(self.wetting)?.density(),
            dry_mass: dv * cells[to].fluid(self.non_wetting)?.density(),
        })
    }

    /// Exchange fluids across every face over `dt`, returning the moved mass
    ///
    /// Each cell's total wetting and non-wetting outflow is scaled by one
    /// shared factor, and every face takes the smaller factor of its two
    /// cells, so both legs of a face shrink together.
    pub(crate) fn apply(&self, cells: &mut [Cell], faces: &[Face], dt: f64, parallel: bool) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }
        let transfers: Vec<Transfer> = {
            let cells: &[Cell] = cells;
            let exchanges: Vec<Exchange> =
                parallel::map_indexed(faces, parallel, |_, face| {
                    self.face_exchange(cells, face, dt)
                })
                .into_iter()
                .flatten()
                .collect();

            let mut wet_out = vec![0.0; cells.len()];
            let mut dry_out = vec![0.0; cells.len()];
            for ex in &exchanges {
                wet_out[ex.from] += ex.wet_mass;
                dry_out[ex.to] += ex.dry_mass;
            }
            let scale = parallel::map_indexed(cells, parallel, |i, cell| {
                let share = |slot: usize, requested: f64| {
                    if requested > 0.0 {
                        cell.fluid(slot).map_or(0.0, Fluid::mass) / requested
                    } else {
                        1.0
                    }
                };
                share(self.wetting, wet_out[i])
                    .min(share(self.non_wetting, dry_out[i]))
                    .min(1.0)
            });

            exchanges
                .iter()
                .flat_map(|ex| {
                    let f = scale[ex.from].min(scale[ex.to]);
                    [
                        Transfer {
                            from: ex.from,
                            to: ex.to,
                            slot: self.wetting,
                            mass: ex.wet_mass * f,
                        },
                        Transfer {
                            from: ex.to,
                            to: ex.from,
                            slot: self.non_wetting,
                            mass: ex.dry_mass * f,
                        },
                    ]
                })
                .collect()
        };
        apply_transfers(cells, &transfers).moved
    }
}

/// Requested counter-current exchange across one face
#[derive(Debug, Clone, Copy)]
struct Exchange {
    from: usize,
    to: usize,
    wet_mass: f64,
    dry_mass: f64,
}
