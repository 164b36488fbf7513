//! Stoichiometric, equilibrium-driven reaction kinetics
//!
//! # Physics Implementation
//!
//! For every cell the driving force is the distance to the equilibrium
//! temperature at the cell pressure, shifted by inhibitors:
//!
//! ```text
//! ΔT   = T_cell − (T_eq(P) + Σ shift_k(m_sol / (m_sol + m_liq)))
//! c    = rate(ΔT) · irate · dt                 (kg of reference mass)
//! Δm_i = w_i · c                               (Σ w_i = 0)
//! Q    = heat · c                              (J released)
//! ```
//!
//! `c` is truncated so no reactant (or, when running backward, no product)
//! goes negative. Weights are normalized so reactants sum to −1 and products to
//! +1, which makes every conversion exactly mass conserving.
//!
//! Typical uses: hydrate dissociation/formation, ice melting, salt
//! precipitation, with the solid phase held in an immobile fluid slot.

use crate::core_types::Interp1;
use crate::error::SeepageError;
use crate::fluid::{FluDef, Fluid};
use crate::mesh::Cell;
use crate::parallel;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One participant of a reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionComponent {
    /// Fluid path: slot index followed by component indices
    pub path: Vec<usize>,
    /// Stoichiometric weight: negative for reactants, positive for products
    pub weight: f64,
    /// Fluid attribute holding the component temperature (K)
    pub temp_attr: Option<usize>,
    /// Fluid attribute holding the component specific heat (J/(kg·K))
    pub cp_attr: Option<usize>,
}

impl ReactionComponent {
    /// Participant at `path` with stoichiometric `weight`
    pub fn new(path: impl Into<Vec<usize>>, weight: f64) -> Self {
        Self {
            path: path.into(),
            weight,
            temp_attr: None,
            cp_attr: None,
        }
    }

    /// Read and write the component temperature through `temp_attr`; the
    /// specific heat comes from `cp_attr` when given, else from the definition
    pub fn with_temperature(mut self, temp_attr: usize, cp_attr: Option<usize>) -> Self {
        self.temp_attr = Some(temp_attr);
        self.cp_attr = cp_attr;
        self
    }
}

/// Shift of the equilibrium temperature driven by a dissolved inhibitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inhibitor {
    /// Fluid path of the inhibitor (e.g. dissolved salt)
    pub solute: Vec<usize>,
    /// Fluid path of the solvent (e.g. liquid water)
    pub solvent: Vec<usize>,
    /// Equilibrium temperature shift (K) as a function of the mass fraction
    pub shift: Interp1,
}

/// Result of applying one reaction to every cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReactionSummary {
    /// Reaction name
    pub name: String,
    /// Net converted reference mass over all cells (kg, negative when backward)
    pub converted: f64,
    /// Heat released over all cells (J)
    pub heat: f64,
    /// Cells where the reaction ran
    pub active_cells: usize,
    /// Cells where the conversion was truncated by availability
    pub truncated_cells: usize,
}

/// Per-cell outcome
#[derive(Debug, Clone, Copy, Default)]
struct CellOutcome {
    converted: f64,
    heat: f64,
    active: bool,
    truncated: bool,
}

/// A reaction between fluid components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    /// Display name
    pub name: String,
    components: Vec<ReactionComponent>,
    /// Equilibrium temperature (K) as a function of pressure (Pa)
    pub t_eq: Interp1,
    /// Conversion rate (kg/s) as a function of `T − T_eq`
    pub rate: Interp1,
    inhibitors: Vec<Inhibitor>,
    /// Heat released per kg of conversion (J/kg), negative when endothermic
    pub heat: f64,
    /// Reference temperature of `heat` (K)
    ///
    /// Informational only: `heat` is released as given, without a sensible
    /// heat correction between `temp` and the cell temperature.
    pub temp: f64,
    /// Cell attribute with the cell temperature, if the cell carries one
    pub cell_temp: Option<usize>,
    /// Cell attribute with the cell heat capacity (J/K)
    pub cell_capacity: Option<usize>,
    /// Cell attribute gating and scaling the rate
    pub irate: Option<usize>,
}

impl Reaction {
    /// Reaction with the given equilibrium and rate curves and no participants
    pub fn new(name: impl Into<String>, t_eq: Interp1, rate: Interp1) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            t_eq,
            rate,
            inhibitors: Vec::new(),
            heat: 0.0,
            temp: crate::fluid::DEFAULT_REFERENCE_TEMPERATURE,
            cell_temp: None,
            cell_capacity: None,
            irate: None,
        }
    }

    /// Set the reaction heat (J/kg) at reference temperature `temp`
    pub fn with_heat(mut self, heat: f64, temp: f64) -> Self {
        self.heat = heat;
        self.temp = temp;
        self
    }

    /// Use cell attributes for temperature and heat capacity
    pub fn with_cell_thermal(mut self, cell_temp: usize, cell_capacity: Option<usize>) -> Self {
        self.cell_temp = Some(cell_temp);
        self.cell_capacity = cell_capacity;
        self
    }

    /// Gate and scale the rate by a cell attribute
    pub fn with_irate(mut self, irate: usize) -> Self {
        self.irate = Some(irate);
        self
    }

    /// Add a participant
    pub fn add_component(&mut self, component: ReactionComponent) -> &mut Self {
        self.components.push(component);
        self
    }

    /// Add an inhibitor
    pub fn add_inhibitor(&mut self, inhibitor: Inhibitor) -> &mut Self {
        self.inhibitors.push(inhibitor);
        self
    }

    /// Participants
    pub fn components(&self) -> &[ReactionComponent] {
        &self.components
    }

    /// Inhibitors
    pub fn inhibitors(&self) -> &[Inhibitor] {
        &self.inhibitors
    }

    /// Normalize weights so reactants sum to −1 and products to +1
    ///
    /// # Errors
    /// Returns `InvalidReaction` when either side is empty or a weight is not finite.
    pub fn adjust_weights(&mut self) -> Result<(), SeepageError> {
        if self.components.iter().any(|c| !c.weight.is_finite()) {
            return Err(SeepageError::InvalidReaction(format!(
                "{}: weights must be finite",
                self.name
            )));
        }
        let negative: f64 = self.components.iter().map(|c| c.weight.min(0.0)).sum();
        let positive: f64 = self.components.iter().map(|c| c.weight.max(0.0)).sum();
        if negative >= 0.0 || positive <= 0.0 {
            return Err(SeepageError::InvalidReaction(format!(
                "{}: needs at least one reactant and one product",
                self.name
            )));
        }
        for component in &mut self.components {
            component.weight /= if component.weight < 0.0 {
                -negative
            } else {
                positive
            };
        }
        Ok(())
    }

    /// Check every path against the fluid definitions
    ///
    /// # Errors
    /// Returns `InvalidReaction` when a component or inhibitor path does not
    /// resolve, or when either side of the reaction is empty.
    pub fn validate(&self, defs: &[FluDef]) -> Result<(), SeepageError> {
        let resolves = |path: &[usize]| {
            path.split_first()
                .and_then(|(&slot, rest)| defs.get(slot)?.get(rest))
                .is_some()
        };
        let paths = self
            .components
            .iter()
            .map(|c| c.path.as_slice())
            .chain(
                self.inhibitors
                    .iter()
                    .flat_map(|i| [i.solute.as_slice(), i.solvent.as_slice()]),
            );
        for path in paths {
            if !resolves(path) {
                return Err(SeepageError::InvalidReaction(format!(
                    "{}: fluid path {path:?} does not exist",
                    self.name
                )));
            }
        }
        if !self.components.iter().any(|c| c.weight < 0.0)
            || !self.components.iter().any(|c| c.weight > 0.0)
        {
            return Err(SeepageError::InvalidReaction(format!(
                "{}: needs at least one reactant and one product",
                self.name
            )));
        }
        Ok(())
    }

    /// Cell temperature: the cell attribute, else the mass-weighted component temperature
    fn cell_temperature(&self, cell: &Cell) -> Option<f64> {
        if let Some(t) = self.cell_temp.and_then(|id| cell.attrs.get(id)) {
            return Some(t);
        }
        let mut weighted = 0.0;
        let mut mass = 0.0;
        for component in &self.components {
            let Some(fluid) = cell.component(&component.path) else {
                continue;
            };
            if let Some(t) = component.temp_attr.and_then(|id| fluid.attr(id)) {
                weighted += t * fluid.mass();
                mass += fluid.mass();
            }
        }
        (mass > 0.0).then(|| weighted / mass)
    }

    /// Equilibrium temperature at the cell state, inhibitors included
    fn equilibrium(&self, cell: &Cell) -> f64 {
        let mass_of = |path: &[usize]| cell.component(path).map_or(0.0, Fluid::mass);
        self.inhibitors
            .iter()
            .fold(self.t_eq.get(cell.pressure()), |t, inhibitor| {
                let solute = mass_of(&inhibitor.solute);
                let total = solute + mass_of(&inhibitor.solvent);
                let concentration = if total > 0.0 { solute / total } else { 0.0 };
                t + inhibitor.shift.get(concentration)
            })
    }

    /// Largest |c| allowed by the mass on the consuming side
    fn limit(&self, cell: &Cell, forward: bool) -> f64 {
        self.components
            .iter()
            .filter(|c| if forward { c.weight < 0.0 } else { c.weight > 0.0 })
            .map(|c| {
                let available = cell.component(&c.path).map_or(0.0, Fluid::mass);
                available / c.weight.abs()
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Heat capacity of a participant (J/K)
    fn component_capacity(
        &self,
        cell: &Cell,
        component: &ReactionComponent,
        defs: &[FluDef],
    ) -> f64 {
        let Some(fluid) = cell.component(&component.path) else {
            return 0.0;
        };
        if let Some(cp) = component.cp_attr.and_then(|id| fluid.attr(id)) {
            return fluid.mass() * cp;
        }
        component
            .path
            .split_first()
            .and_then(|(&slot, rest)| defs.get(slot)?.get(rest))
            .map_or(0.0, |def| fluid.heat_capacity(def))
    }

    fn release_heat(&self, cell: &mut Cell, defs: &[FluDef], q: f64) {
        if q == 0.0 {
            return;
        }
        let cell_state = self.cell_temp.and_then(|t_id| {
            let t = cell.attrs.get(t_id)?;
            let mc = cell.attrs.get(self.cell_capacity?)?;
            (mc > 0.0).then_some((t_id, t, mc))
        });
        if let Some((t_id, t, mc)) = cell_state {
            cell.attrs.set(t_id, t + q / mc);
            return;
        }

        let capacity: f64 = self
            .components
            .iter()
            .filter(|c| c.temp_attr.is_some())
            .map(|c| self.component_capacity(cell, c, defs))
            .sum();
        if capacity <= 0.0 {
            return;
        }
        let dt = q / capacity;
        for component in &self.components {
            let Some(t_id) = component.temp_attr else {
                continue;
            };
            if let Some(fluid) = cell.component_mut(&component.path) {
                if let Some(t) = fluid.attr(t_id) {
                    fluid.set_attr(t_id, t + dt);
                }
            }
        }
    }

    fn apply_cell(&self, cell: &mut Cell, defs: &[FluDef], dt: f64) -> CellOutcome {
        let factor = match self.irate.map(|id| cell.attrs.get(id)) {
            Some(Some(value)) if value <= 0.0 => return CellOutcome::default(),
            Some(Some(value)) => value,
            _ => 1.0,
        };
        let Some(t_cell) = self.cell_temperature(cell) else {
            return CellOutcome::default();
        };

        let requested = self.rate.get(t_cell - self.equilibrium(cell)) * factor * dt;
        if requested == 0.0 || !requested.is_finite() {
            return CellOutcome::default();
        }
        let limit = self.limit(cell, requested > 0.0);
        let truncated = requested.abs() > limit;
        let c = requested.signum() * requested.abs().min(limit);
        if c == 0.0 {
            return CellOutcome {
                truncated,
                ..CellOutcome::default()
            };
        }

        for component in &self.components {
            let Some(fluid) = cell.component_mut(&component.path) else {
                continue;
            };
            if let Some(t_id) = component.temp_attr {
                // Newly formed mass starts at the cell temperature
                if fluid.attr(t_id).is_none() || fluid.mass() <= 0.0 {
                    fluid.set_attr(t_id, t_cell);
                }
            }
            fluid.add_mass(component.weight * c);
        }

        let q = self.heat * c;
        self.release_heat(cell, defs, q);
        CellOutcome {
            converted: c,
            heat: q,
            active: true,
            truncated,
        }
    }

    /// Apply the reaction to every cell over `dt`
    pub(crate) fn apply(
        &self,
        cells: &mut [Cell],
        defs: &[FluDef],
        dt: f64,
        parallel: bool,
    ) -> ReactionSummary {
        let mut summary = ReactionSummary {
            name: self.name.clone(),
            ..ReactionSummary::default()
        };
        if dt <= 0.0 {
            return summary;
        }
        let outcomes =
            parallel::map_mut(cells, parallel, |_, cell| self.apply_cell(cell, defs, dt));
        for outcome in outcomes {
            summary.converted += outcome.converted;
            summary.heat += outcome.heat;
            summary.active_cells += usize::from(outcome.active);
            summary.truncated_cells += usize::from(outcome.truncated);
        }
        if summary.truncated_cells > 0 {
            warn!(
                "Reaction '{}' truncated in {} cells by reactant availability",
                self.name, summary.truncated_cells
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Vec3;
    use crate::fluid::Fluid;
    use crate::mesh::PoreModel;
    use approx::assert_relative_eq;

    const TEMP: usize = 0;
    const CELL_T: usize = 0;
    const CELL_MC: usize = 1;
    const IRATE: usize = 2;

    fn defs() -> Vec<FluDef> {
        vec![
            FluDef::constant("water", 1000.0, 1.0e-3, 4200.0).unwrap(),
            FluDef::constant("gas", 100.0, 1.0e-5, 2200.0).unwrap(),
            FluDef::constant("hydrate", 900.0, 1.0, 2100.0).unwrap(),
        ]
    }

    /// Hydrate (slot 2) dissociating into water (slot 0) and gas (slot 1)
    fn dissociation() -> Reaction {
        let mut reaction = Reaction::new(
            "hydrate",
            Interp1::constant(280.0),
            Interp1::linear(-10.0, -1.0, 10.0, 1.0).unwrap(),
        )
        .with_heat(-4.0e5, 280.0)
        .with_cell_thermal(CELL_T, Some(CELL_MC));
        reaction
            .add_component(ReactionComponent::new([2], -1.0))
            .add_component(ReactionComponent::new([0], 0.87))
            .add_component(ReactionComponent::new([1], 0.13));
        reaction.adjust_weights().unwrap();
        reaction
    }

    fn cell(t: f64, hydrate: f64) -> Cell {
        let mut cell = Cell::new(
            Vec3::zeros(),
            PoreModel::new(1.0, 1.0e-9).unwrap(),
            vec![
                Fluid::leaf(10.0, 1000.0, 1.0e-3),
                Fluid::leaf(1.0, 100.0, 1.0e-5),
                Fluid::leaf(hydrate, 900.0, 1.0),
            ],
        );
        cell.attrs.set(CELL_T, t);
        cell.attrs.set(CELL_MC, 1.0e6);
        cell
    }

    #[test]
    fn test_adjust_weights_normalizes_sides() {
        let mut reaction = Reaction::new("r", Interp1::constant(0.0), Interp1::constant(0.0));
        reaction
            .add_component(ReactionComponent::new([0], -2.0))
            .add_component(ReactionComponent::new([1], -2.0))
            .add_component(ReactionComponent::new([2], 3.0));
        reaction.adjust_weights().unwrap();
        let weights: Vec<f64> = reaction.components().iter().map(|c| c.weight).collect();
        assert_relative_eq!(weights[0], -0.5);
        assert_relative_eq!(weights[1], -0.5);
        assert_relative_eq!(weights[2], 1.0);
        assert_relative_eq!(weights.iter().sum::<f64>(), 0.0);

        let mut one_sided = Reaction::new("bad", Interp1::constant(0.0), Interp1::constant(0.0));
        one_sided.add_component(ReactionComponent::new([0], -1.0));
        assert!(one_sided.adjust_weights().is_err());
    }

    #[test]
    fn test_nan_temperature_is_inert() {
        let reaction = dissociation();
        let mut cells = vec![cell(f64::NAN, 100.0)];
        let before = cells[0].clone();
        let summary = reaction.apply(&mut cells, &defs(), 2.0, false);
        assert_eq!(summary.converted, 0.0);
        assert_eq!(summary.active_cells, 0);
        assert_eq!(cells[0].fluid_mass(), before.fluid_mass());
    }

    #[test]
    fn test_validate_paths() {
        let defs = defs();
        assert!(dissociation().validate(&defs).is_ok());
        let mut bad = dissociation();
        bad.add_component(ReactionComponent::new([7], 1.0));
        assert!(matches!(bad.validate(&defs), Err(SeepageError::InvalidReaction(_))));
    }

    #[test]
    fn test_mass_conserved_and_heat_absorbed() {
        let reaction = dissociation();
        let mut cells = vec![cell(285.0, 100.0)];
        let before = cells[0].fluid_mass();
        let summary = reaction.apply(&mut cells, &defs(), 2.0, false);
        // rate(5 K) = 0.5 kg/s for 2 s
        assert_relative_eq!(summary.converted, 1.0, max_relative = 1e-12);
        assert_relative_eq!(cells[0].fluid_mass(), before, max_relative = 1e-12);
        assert_relative_eq!(cells[0].fluids()[2].mass(), 99.0, max_relative = 1e-12);
        assert_relative_eq!(cells[0].fluids()[0].mass(), 10.87, max_relative = 1e-12);
        // 4e5 J absorbed from a 1e6 J/K cell
        assert_relative_eq!(cells[0].attrs.get(CELL_T).unwrap(), 284.6, max_relative = 1e-12);
    }

    #[test]
    fn test_truncated_by_available_reactant() {
        let reaction = dissociation();
        let mut cells = vec![cell(290.0, 0.3)];
        let summary = reaction.apply(&mut cells, &defs(), 100.0, false);
        assert_relative_eq!(summary.converted, 0.3, max_relative = 1e-12);
        assert_eq!(summary.truncated_cells, 1);
        assert_eq!(cells[0].fluids()[2].mass(), 0.0);
    }

    #[test]
    fn test_backward_reaction_limited_by_products() {
        let reaction = dissociation();
        // Cold cell: formation consumes water and gas, gas runs out first
        let mut cells = vec![cell(270.0, 0.0)];
        let summary = reaction.apply(&mut cells, &defs(), 100.0, false);
        assert_relative_eq!(summary.converted, -1.0 / 0.13, max_relative = 1e-12);
        assert!(cells[0].fluids()[1].mass().abs() < 1e-12);
        assert_relative_eq!(cells[0].fluids()[2].mass(), 1.0 / 0.13, max_relative = 1e-12);
    }

    #[test]
    fn test_irate_gates_cells() {
        let reaction = dissociation().with_irate(IRATE);
        let mut cells = vec![cell(285.0, 100.0), cell(285.0, 100.0), cell(285.0, 100.0)];
        cells[0].attrs.set(IRATE, 0.0);
        cells[1].attrs.set(IRATE, 2.0);
        let summary = reaction.apply(&mut cells, &defs(), 1.0, true);
        assert_eq!(cells[0].fluids()[2].mass(), 100.0);
        assert_relative_eq!(cells[1].fluids()[2].mass(), 99.0, max_relative = 1e-12);
        assert_relative_eq!(cells[2].fluids()[2].mass(), 99.5, max_relative = 1e-12);
        assert_eq!(summary.active_cells, 2);
    }

    #[test]
    fn test_inhibitor_shifts_equilibrium() {
        let mut reaction = dissociation();
        // Salt in slot 1 standing in for the inhibitor: 1/11 mass fraction
        reaction.add_inhibitor(Inhibitor {
            solute: vec![1],
            solvent: vec![0],
            shift: Interp1::linear(0.0, 0.0, 1.0, -55.0).unwrap(),
        });
        let mut cells = vec![cell(280.0, 100.0)];
        let summary = reaction.apply(&mut cells, &defs(), 1.0, false);
        // T_eq = 280 - 5 → rate(5 K) = 0.5
        assert_relative_eq!(summary.converted, 0.5, max_relative = 1e-12);
    }

    #[test]
    fn test_heat_spread_over_components() {
        let mut reaction = Reaction::new(
            "melt",
            Interp1::constant(273.15),
            Interp1::linear(0.0, 0.0, 1.0, 1.0).unwrap(),
        )
        .with_heat(-3.34e5, 273.15);
        reaction
            .add_component(ReactionComponent::new([2], -1.0).with_temperature(TEMP, None))
            .add_component(ReactionComponent::new([0], 1.0).with_temperature(TEMP, None));
        let mut cells = vec![cell(0.0, 10.0)];
        cells[0].attrs = crate::core_types::Attrs::new();
        for slot in [0, 2] {
            cells[0].fluid_mut(slot).unwrap().set_attr(TEMP, 274.15);
        }
        let summary = reaction.apply(&mut cells, &defs(), 1.0, false);
        assert_relative_eq!(summary.converted, 1.0, max_relative = 1e-12);
        // C = 11 kg · 4200 + 9 kg · 2100
        let capacity = 11.0 * 4200.0 + 9.0 * 2100.0;
        let t = cells[0].fluids()[0].attr(TEMP).unwrap();
        assert_relative_eq!(t, 274.15 - 3.34e5 / capacity, max_relative = 1e-12);
    }
}
