//! Relative permeability and upstream mobility

use crate::core_types::Interp1;
use crate::fluid::Fluid;
use crate::mesh::{Cell, Face};
use serde::{Deserialize, Serialize};

/// How per-fluid relative permeabilities combine into a face mobility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KrPolicy {
    /// Σ kr_f(s_f)/μ_f over the mobile fluids, each with its own curve
    #[default]
    PerFluid,
    /// Mobile fluids lumped into one phase: kr(s_mobile)/μ_mix, curve from slot 0
    Lumped,
}

/// Mobility of the fluids of one cell as seen through one face
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Mobility {
    /// Total mobility (1/(Pa·s))
    pub total: f64,
    /// Share of the total carried by each fluid slot (sums to 1 when total > 0)
    pub fractions: Vec<f64>,
}

/// Settings shared by every mobility evaluation of a step
#[derive(Debug, Clone, Copy)]
pub(crate) struct KrSettings<'a> {
    pub policy: KrPolicy,
    pub curves: &'a [Interp1],
    pub solid_fluids: &'a [usize],
    pub solid_kr: Option<usize>,
}

impl KrSettings<'_> {
    fn curve(&self, index: Option<usize>) -> Option<&Interp1> {
        index.and_then(|i| self.curves.get(i))
    }

    fn kr(&self, index: Option<usize>, saturation: f64) -> f64 {
        self.curve(index)
            .map_or(saturation, |curve| curve.get(saturation))
            .max(0.0)
    }

    fn is_solid(&self, slot: usize) -> bool {
        self.solid_fluids.contains(&slot)
    }

    /// Mobility of `cell` for flow through `face`
    pub fn mobility(&self, cell: &Cell, face: &Face) -> Mobility {
        let fluids = cell.fluids();
        let mut fractions = vec![0.0; fluids.len()];
        let volumes: Vec<f64> = fluids.iter().map(Fluid::volume).collect();
        let total_volume: f64 = volumes.iter().sum();
        if total_volume <= 0.0 {
            return Mobility {
                total: 0.0,
                fractions,
            };
        }

        let mut total = match self.policy {
            KrPolicy::PerFluid => {
                let mut total = 0.0;
                for (slot, fluid) in fluids.iter().enumerate() {
                    if self.is_solid(slot) || volumes[slot] <= 0.0 {
                        continue;
                    }
                    let s = volumes[slot] / total_volume;
                    let lambda = self.kr(face.kr_curve(slot), s) / fluid.viscosity();
                    fractions[slot] = lambda;
                    total += lambda;
                }
                total
            }
            KrPolicy::Lumped => {
                let mut mobile_volume = 0.0;
                let mut weighted_viscosity = 0.0;
                for (slot, fluid) in fluids.iter().enumerate() {
                    if self.is_solid(slot) {
                        continue;
                    }
                    mobile_volume += volumes[slot];
                    weighted_viscosity += volumes[slot] * fluid.viscosity();
                    fractions[slot] = volumes[slot];
                }
                if mobile_volume > 0.0 {
                    let mu_mix = weighted_viscosity / mobile_volume;
                    self.kr(face.kr_curve(0), mobile_volume / total_volume) / mu_mix
                } else {
                    0.0
                }
            }
        };

        if let Some(curve) = self.solid_kr.and_then(|i| self.curves.get(i)) {
            let solid: f64 = self
                .solid_fluids
                .iter()
                .filter_map(|&slot| volumes.get(slot))
                .sum();
            total *= curve.get(1.0 - solid / total_volume).max(0.0);
        }

        let weight_sum: f64 = fractions.iter().sum();
        if total > 0.0 && weight_sum > 0.0 {
            for fraction in &mut fractions {
                *fraction /= weight_sum;
            }
        } else {
            total = 0.0;
            fractions.iter_mut().for_each(|f| *f = 0.0);
        }
        Mobility { total, fractions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Vec3;
    use crate::mesh::PoreModel;
    use approx::assert_relative_eq;

    fn cell(water: f64, gas: f64, hydrate: f64) -> Cell {
        Cell::new(
            Vec3::zeros(),
            PoreModel::new(1.0, 1.0e-9).unwrap(),
            vec![
                Fluid::leaf(water * 1000.0, 1000.0, 1.0e-3),
                Fluid::leaf(gas * 100.0, 100.0, 1.0e-5),
                Fluid::leaf(hydrate * 900.0, 900.0, 1.0),
            ],
        )
    }

    fn settings<'a>(policy: KrPolicy, curves: &'a [Interp1], solid: &'a [usize]) -> KrSettings<'a> {
        KrSettings {
            policy,
            curves,
            solid_fluids: solid,
            solid_kr: None,
        }
    }

    #[test]
    fn test_per_fluid_default_linear_kr() {
        let face = Face::new(0, 1, 1.0);
        let mobility =
            settings(KrPolicy::PerFluid, &[], &[2]).mobility(&cell(0.5, 0.5, 0.0), &face);
        // 0.5/1e-3 + 0.5/1e-5
        assert_relative_eq!(mobility.total, 500.0 + 50_000.0);
        assert_relative_eq!(mobility.fractions[0], 500.0 / 50_500.0);
        assert_eq!(mobility.fractions[2], 0.0);
    }

    #[test]
    fn test_per_fluid_uses_face_curve() {
        let curves = vec![Interp1::new(vec![0.0, 1.0], vec![0.0, 0.5]).unwrap()];
        let mut face = Face::new(0, 1, 1.0);
        face.set_kr_curve(0, Some(0));
        let mobility =
            settings(KrPolicy::PerFluid, &curves, &[]).mobility(&cell(1.0, 0.0, 0.0), &face);
        assert_relative_eq!(mobility.total, 0.5 / 1.0e-3);
        assert_relative_eq!(mobility.fractions[0], 1.0);
    }

    #[test]
    fn test_lumped_uses_mixture_viscosity() {
        let face = Face::new(0, 1, 1.0);
        let mobility =
            settings(KrPolicy::Lumped, &[], &[2]).mobility(&cell(0.25, 0.25, 0.5), &face);
        // s_mobile = 0.5, mu_mix = (0.25e-3 + 0.25e-5) / 0.5
        let mu_mix = (0.25 * 1.0e-3 + 0.25 * 1.0e-5) / 0.5;
        assert_relative_eq!(mobility.total, 0.5 / mu_mix, max_relative = 1e-12);
        assert_relative_eq!(mobility.fractions[0], 0.5);
        assert_relative_eq!(mobility.fractions[1], 0.5);
    }

    #[test]
    fn test_solid_kr_reduces_mobility() {
        let curves = vec![Interp1::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap()];
        let face = Face::new(0, 1, 1.0);
        let mut s = settings(KrPolicy::PerFluid, &curves, &[2]);
        let free = s.mobility(&cell(0.5, 0.0, 0.5), &face).total;
        s.solid_kr = Some(0);
        let blocked = s.mobility(&cell(0.5, 0.0, 0.5), &face).total;
        assert_relative_eq!(blocked, free * 0.5);
    }

    #[test]
    fn test_empty_cell_is_immobile() {
        let face = Face::new(0, 1, 1.0);
        let mobility = settings(KrPolicy::PerFluid, &[], &[]).mobility(&cell(0.0, 0.0, 0.0), &face);
        assert_eq!(mobility.total, 0.0);
        assert!(mobility.fractions.iter().all(|&f| f == 0.0));
    }
}
