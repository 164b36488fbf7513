//! Mass transfer between cells with availability limiting
//!
//! Flow and capillary exchange both produce a list of requested `(from, to,
//! slot, mass)` moves. Requests leaving the same `(cell, slot)` are scaled
//! together so the source never goes negative, then every move carries the
//! source fluid's composition and attributes at the start of the phase.

use crate::fluid::Fluid;
use crate::mesh::Cell;
use rustc_hash::FxHashMap;

/// A requested mass move of one fluid slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Transfer {
    pub from: usize,
    pub to: usize,
    pub slot: usize,
    /// Requested mass (kg), non-negative
    pub mass: f64,
}

/// Outcome of [`apply_transfers`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct TransferSummary {
    /// Mass actually moved (kg)
    pub moved: f64,
    /// Number of `(cell, slot)` sources whose requests had to be scaled down
    pub limited: usize,
}

/// Apply `transfers` to `cells`, limiting each source to its available mass
pub(crate) fn apply_transfers(cells: &mut [Cell], transfers: &[Transfer]) -> TransferSummary {
    let mut requested: FxHashMap<(usize, usize), f64> = FxHashMap::default();
    for t in transfers.iter().filter(|t| t.mass > 0.0) {
        *requested.entry((t.from, t.slot)).or_insert(0.0) += t.mass;
    }

    let mut limited = 0;
    let mut sources: FxHashMap<(usize, usize), (Fluid, f64)> = FxHashMap::default();
    for (&(cell, slot), &total) in &requested {
        let Some(fluid) = cells.get(cell).and_then(|c| c.fluid(slot)) else {
            continue;
        };
        let available = fluid.mass();
        if available <= 0.0 {
            continue;
        }
        if total > available {
            limited += 1;
        }
        // Fraction of the source mass granted per requested kilogram
        let per_kg = total.min(available) / total / available;
        sources.insert((cell, slot), (fluid.clone(), per_kg));
    }

    let mut removed: FxHashMap<(usize, usize), f64> = FxHashMap::default();
    let mut portions = Vec::with_capacity(transfers.len());
    for t in transfers.iter().filter(|t| t.mass > 0.0) {
        let Some((source, per_kg)) = sources.get(&(t.from, t.slot)) else {
            continue;
        };
        let fraction = t.mass * per_kg;
        *removed.entry((t.from, t.slot)).or_insert(0.0) += fraction;
        portions.push((t.to, t.slot, source.scaled(fraction)));
    }

    for (&(cell, slot), &fraction) in &removed {
        if let Some(fluid) = cells[cell].fluid_mut(slot) {
            fluid.scale(1.0 - fraction.min(1.0));
        }
    }

    let mut moved = 0.0;
    for (to, slot, portion) in portions {
        if let Some(target) = cells.get_mut(to).and_then(|c| c.fluid_mut(slot)) {
            moved += portion.mass();
            target.absorb(&portion);
        }
    }

    TransferSummary { moved, limited }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Vec3;
    use crate::mesh::PoreModel;
    use approx::assert_relative_eq;

    fn cells(masses: &[f64]) -> Vec<Cell> {
        masses
            .iter()
            .map(|&m| {
                Cell::new(
                    Vec3::zeros(),
                    PoreModel::new(1.0, 1.0e-9).unwrap(),
                    vec![Fluid::leaf(m, 1000.0, 1.0e-3)],
                )
            })
            .collect()
    }

    fn total(cells: &[Cell]) -> f64 {
        cells.iter().map(Cell::fluid_mass).sum()
    }

    #[test]
    fn test_unlimited_transfer() {
        let mut cells = cells(&[10.0, 0.0]);
        let summary = apply_transfers(
            &mut cells,
            &[Transfer {
                from: 0,
                to: 1,
                slot: 0,
                mass: 4.0,
            }],
        );
        assert_relative_eq!(cells[0].fluid_mass(), 6.0);
        assert_relative_eq!(cells[1].fluid_mass(), 4.0);
        assert_relative_eq!(summary.moved, 4.0);
        assert_eq!(summary.limited, 0);
    }

    #[test]
    fn test_requests_scaled_to_availability() {
        let mut cells = cells(&[3.0, 0.0, 0.0]);
        let transfers = [
            Transfer {
                from: 0,
                to: 1,
                slot: 0,
                mass: 4.0,
            },
            Transfer {
                from: 0,
                to: 2,
                slot: 0,
                mass: 2.0,
            },
        ];
        let summary = apply_transfers(&mut cells, &transfers);
        assert!(cells[0].fluid_mass().abs() < 1e-12);
        assert_relative_eq!(cells[1].fluid_mass(), 2.0, max_relative = 1e-12);
        assert_relative_eq!(cells[2].fluid_mass(), 1.0, max_relative = 1e-12);
        assert_relative_eq!(total(&cells), 3.0, max_relative = 1e-12);
        assert_eq!(summary.limited, 1);
    }

    #[test]
    fn test_swap_uses_initial_state() {
        let mut cells = cells(&[2.0, 6.0]);
        cells[0].fluid_mut(0).unwrap().set_attr(0, 300.0);
        cells[1].fluid_mut(0).unwrap().set_attr(0, 400.0);
        let transfers = [
            Transfer {
                from: 0,
                to: 1,
                slot: 0,
                mass: 1.0,
            },
            Transfer {
                from: 1,
                to: 0,
                slot: 0,
                mass: 3.0,
            },
        ];
        apply_transfers(&mut cells, &transfers);
        assert_relative_eq!(cells[0].fluid_mass(), 4.0, max_relative = 1e-12);
        assert_relative_eq!(cells[1].fluid_mass(), 4.0, max_relative = 1e-12);
        // Cell 0: 1 kg at 300 K kept, 3 kg at 400 K received
        assert_relative_eq!(cells[0].fluids()[0].attr(0).unwrap(), 375.0, max_relative = 1e-12);
    }
}
