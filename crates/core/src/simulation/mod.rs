//! The seepage model and its step pipeline
//!
//! [`Seepage`] owns every cell, face, fluid definition, reaction, kr curve,
//! capillary rule and injector of a model; everything else refers to them by
//! index. One call to [`Seepage::iterate`] runs the phases in order:
//!
//! 1. Injectors (scheduled mass and heat sources)
//! 2. Density/viscosity relaxation toward the property tables
//! 3. Implicit pressure solve and upwind transport
//! 4. Capillary exchange
//! 5. Implicit heat conduction, then fluid-rock heat exchange
//! 6. Reactions
//! 7. Time-step re-estimation
//!
//! Each phase is also callable on its own for scripted workflows.

pub mod config;
pub mod keys;
pub mod persistence;
pub mod snapshot;

pub use config::{PropertyUpdate, SeepageConfig};
pub use keys::AttrKeys;
pub use persistence::PersistenceError;
pub use snapshot::{CellSnapshot, Snapshot};

use crate::core_types::{Interp1, Vec3};
use crate::error::SeepageError;
use crate::fluid::{FluDef, Fluid, Saturation};
use crate::injector::{Injection, Injector};
use crate::mesh::{Cell, Face, PoreModel, Topology};
use crate::parallel;
use crate::reaction::{Reaction, ReactionSummary};
use crate::solver::{self, CapillaryRule, FlowReport, PhaseTimes, ProfilerScope, ThermalReport};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Simulated time bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    /// Simulated time (s)
    pub time: f64,
    /// Step size used by [`Seepage::advance`] (s)
    pub dt: f64,
    /// Completed steps
    pub step: u64,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            time: 0.0,
            dt: 1.0,
            step: 0,
        }
    }
}

/// Everything one call to [`Seepage::iterate`] did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Step size used (s)
    pub dt: f64,
    /// Mass and heat added by injectors
    pub injection: Injection,
    /// Pressure solve and transport
    pub flow: FlowReport,
    /// Wetting mass moved by capillary exchange (kg)
    pub capillary_mass: f64,
    /// Heat conduction, when a thermal binding is configured
    pub thermal: Option<ThermalReport>,
    /// Heat moved from rock to fluid (J)
    pub heat_exchanged: f64,
    /// One summary per reaction, in reaction order
    pub reactions: Vec<ReactionSummary>,
    /// Step size suggested for the next step (s)
    pub recommended_dt: f64,
    /// Wall-clock time per phase
    pub times: PhaseTimes,
}

impl StepReport {
    /// Largest relative change of the step, over flow and heat
    pub fn dv_max(&self) -> f64 {
        self.thermal
            .map_or(self.flow.dv_max, |t| self.flow.dv_max.max(t.dv_max))
    }
}

/// A finite-volume model of coupled flow, heat and reactions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seepage {
    cells: Vec<Cell>,
    faces: Vec<Face>,
    #[serde(skip)]
    topology: Topology,
    fludefs: Vec<FluDef>,
    reactions: Vec<Reaction>,
    kr_curves: Vec<Interp1>,
    capillary: Vec<CapillaryRule>,
    injectors: Vec<Injector>,
    /// Solver, property and coupling settings
    pub config: SeepageConfig,
    clock: Clock,
    keys: AttrKeys,
    #[serde(skip)]
    buffers: FxHashMap<String, Vec<f64>>,
}

impl Seepage {
    /// Empty model with the given configuration
    pub fn new(config: SeepageConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Fluid definitions
    // ------------------------------------------------------------------

    /// Register a fluid definition, returning its slot index
    ///
    /// Existing cells receive an empty instance of the new fluid.
    pub fn add_fludef(&mut self, def: FluDef) -> usize {
        for cell in &mut self.cells {
            let p = cell.pressure();
            cell.push_fluid(Fluid::from_def(&def, p, None));
        }
        info!(
            name = def.name(),
            slot = self.fludefs.len(),
            components = def.component_count(),
            "Registered fluid"
        );
        self.fludefs.push(def);
        self.fludefs.len() - 1
    }

    /// Fluid definitions, by slot
    pub fn fludefs(&self) -> &[FluDef] {
        &self.fludefs
    }

    // ------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------

    /// Append a cell with one empty instance of every registered fluid
    pub fn add_cell(&mut self, pos: Vec3, pore: PoreModel) -> usize {
        let fluids = self
            .fludefs
            .iter()
            .map(|def| Fluid::from_def(def, 0.0, None))
            .collect();
        self.cells.push(Cell::new(pos, pore, fluids));
        self.topology.add_cell()
    }

    /// Connect two distinct cells, returning the face index
    ///
    /// # Errors
    /// Returns `IndexOutOfRange`, `SelfFace` or `DuplicateFace`.
    pub fn add_face(&mut self, a: usize, b: usize, cond: f64) -> Result<usize, SeepageError> {
        let index = self.topology.link(a, b)?;
        self.faces.push(Face::new(a, b, cond));
        Ok(index)
    }

    /// Remove a face; faces after it shift down by one index
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` for an unknown face.
    pub fn remove_face(&mut self, index: usize) -> Result<Face, SeepageError> {
        SeepageError::check_index("face", index, self.faces.len())?;
        let face = self.faces.remove(index);
        self.topology = Topology::build(self.cells.len(), &self.faces)?;
        Ok(face)
    }

    /// Number of cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// All cells
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell `index`
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Mutable cell `index`
    pub fn cell_mut(&mut self, index: usize) -> Option<&mut Cell> {
        self.cells.get_mut(index)
    }

    /// All faces
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Face `index`
    pub fn face(&self, index: usize) -> Option<&Face> {
        self.faces.get(index)
    }

    /// Mutable face `index`
    pub fn face_mut(&mut self, index: usize) -> Option<&mut Face> {
        self.faces.get_mut(index)
    }

    /// Face joining `a` and `b`, in either order
    pub fn face_between(&self, a: usize, b: usize) -> Option<usize> {
        self.topology.face_between(a, b)
    }

    /// Faces touching `cell`
    pub fn faces_of(&self, cell: usize) -> &[usize] {
        self.topology.faces_of(cell)
    }

    /// Fill cell `index` at pressure `p` with the given saturations
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` for an unknown cell.
    pub fn fill(
        &mut self,
        index: usize,
        p: f64,
        saturations: &[Saturation],
    ) -> Result<(), SeepageError> {
        SeepageError::check_index("cell", index, self.cells.len())?;
        self.cells[index].fill(p, saturations);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Curves, reactions, injectors and capillary rules
    // ------------------------------------------------------------------

    /// Register a relative permeability curve, returning its index
    pub fn add_kr_curve(&mut self, curve: Interp1) -> usize {
        self.kr_curves.push(curve);
        self.kr_curves.len() - 1
    }

    /// Relative permeability curves
    pub fn kr_curves(&self) -> &[Interp1] {
        &self.kr_curves
    }

    /// Select the kr curve of `fluid` on `face` (`None` restores `kr = s`)
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` for an unknown face, fluid slot or curve.
    pub fn set_face_kr(
        &mut self,
        face: usize,
        fluid: usize,
        curve: Option<usize>,
    ) -> Result<(), SeepageError> {
        SeepageError::check_index("face", face, self.faces.len())?;
        SeepageError::check_index("fluid", fluid, self.fludefs.len())?;
        if let Some(curve) = curve {
            SeepageError::check_index("kr curve", curve, self.kr_curves.len())?;
        }
        self.faces[face].set_kr_curve(fluid, curve);
        Ok(())
    }

    /// Validate, normalize and register a reaction
    ///
    /// # Errors
    /// Returns `InvalidReaction` when a side is empty or a component path does
    /// not resolve against the registered fluids.
    pub fn add_reaction(&mut self, mut reaction: Reaction) -> Result<usize, SeepageError> {
        reaction.validate(&self.fludefs)?;
        reaction.adjust_weights()?;
        info!(
            name = %reaction.name,
            components = reaction.components().len(),
            heat = reaction.heat,
            "Registered reaction"
        );
        self.reactions.push(reaction);
        Ok(self.reactions.len() - 1)
    }

    /// Registered reactions
    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// Validate and register an injector
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` for an unknown cell and `InvalidSchedule`
    /// when the target fluid does not exist.
    pub fn add_injector(&mut self, injector: Injector) -> Result<usize, SeepageError> {
        injector.validate(self.cells.len(), &self.fludefs)?;
        info!(
            cell = injector.cell(),
            operations = injector.schedule().len(),
            radius = injector.radius,
            "Registered injector"
        );
        self.injectors.push(injector);
        Ok(self.injectors.len() - 1)
    }

    /// Registered injectors
    pub fn injectors(&self) -> &[Injector] {
        &self.injectors
    }

    /// Register a capillary rule between two distinct fluid slots
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` for unknown slots and `InvalidFluid` when
    /// both slots are the same.
    pub fn add_capillary_rule(&mut self, rule: CapillaryRule) -> Result<usize, SeepageError> {
        SeepageError::check_index("fluid", rule.wetting, self.fludefs.len())?;
        SeepageError::check_index("fluid", rule.non_wetting, self.fludefs.len())?;
        if rule.wetting == rule.non_wetting {
            return Err(SeepageError::InvalidFluid(format!(
                "capillary rule couples slot {} with itself",
                rule.wetting
            )));
        }
        self.capillary.push(rule);
        Ok(self.capillary.len() - 1)
    }

    /// Registered capillary rules
    pub fn capillary_rules(&self) -> &[CapillaryRule] {
        &self.capillary
    }

    // ------------------------------------------------------------------
    // Keys, buffers and clock
    // ------------------------------------------------------------------

    /// Id of cell attribute `name`, registering it if new
    pub fn reg_cell_key(&mut self, name: &str) -> usize {
        self.keys.reg_cell_key(name)
    }

    /// Id of face attribute `name`, registering it if new
    pub fn reg_face_key(&mut self, name: &str) -> usize {
        self.keys.reg_face_key(name)
    }

    /// Id of fluid attribute `name`, registering it if new
    pub fn reg_fluid_key(&mut self, name: &str) -> usize {
        self.keys.reg_fluid_key(name)
    }

    /// Registered attribute keys
    pub fn keys(&self) -> &AttrKeys {
        &self.keys
    }

    /// Scratch buffer `name`, created or resized to `len` (new entries are 0)
    pub fn buffer_mut(&mut self, name: &str, len: usize) -> &mut Vec<f64> {
        let buffer = self.buffers.entry(name.to_string()).or_default();
        buffer.resize(len, 0.0);
        buffer
    }

    /// Scratch buffer `name`, if it exists
    pub fn buffer(&self, name: &str) -> Option<&[f64]> {
        self.buffers.get(name).map(Vec::as_slice)
    }

    /// Simulated time (s)
    pub fn time(&self) -> f64 {
        self.clock.time
    }

    /// Set the simulated time (s)
    pub fn set_time(&mut self, time: f64) {
        self.clock.time = time;
    }

    /// Step size used by [`Seepage::advance`] (s)
    pub fn dt(&self) -> f64 {
        self.clock.dt
    }

    /// Set the step size, clamped to the controller bounds
    pub fn set_dt(&mut self, dt: f64) {
        self.clock.dt = self.config.timestep.clamp(dt);
    }

    /// Completed steps
    pub fn step(&self) -> u64 {
        self.clock.step
    }

    /// Time, step size and step count
    pub fn clock(&self) -> Clock {
        self.clock
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    /// Relax stored densities toward the property tables
    pub fn update_den(&mut self) {
        self.relax_properties(true, false);
    }

    /// Relax stored viscosities toward the property tables
    pub fn update_vis(&mut self) {
        self.relax_properties(false, true);
    }

    /// Relax densities and viscosities toward the property tables
    pub fn update_properties(&mut self) {
        self.relax_properties(true, true);
    }

    fn relax_properties(&mut self, density: bool, viscosity: bool) {
        let update = self.config.property_update;
        let fluid_temp = self.config.fluid_temp;
        let defs = &self.fludefs;
        parallel::for_each_mut(&mut self.cells, self.config.parallel, |_, cell| {
            let p = cell.pressure();
            for (fluid, def) in cell.fluids_mut().iter_mut().zip(defs) {
                fluid.for_each_leaf_with_def_mut(def, &mut |leaf, leaf_def| {
                    let t = fluid_temp
                        .and_then(|id| leaf.attrs.get(id))
                        .unwrap_or(leaf_def.reference_temperature());
                    if density {
                        leaf.density = update.relax(
                            leaf.density,
                            leaf_def.density(p, t),
                            update.density_range,
                        );
                    }
                    if viscosity {
                        leaf.viscosity = update.relax(
                            leaf.viscosity,
                            leaf_def.viscosity(p, t),
                            update.viscosity_range,
                        );
                    }
                });
            }
        });
    }

    /// Implicit pressure solve and transport over `dt`
    ///
    /// # Errors
    /// Returns `Allocation` when the linear system cannot be reserved.
    pub fn iterate_flow(&mut self, dt: f64) -> Result<FlowReport, SeepageError> {
        solver::iterate_flow(&mut self.cells, &self.faces, &self.kr_curves, &self.config, dt)
    }

    /// Implicit heat conduction over `dt`, when a thermal binding is configured
    ///
    /// # Errors
    /// Returns `Allocation` when the linear system cannot be reserved.
    pub fn iterate_thermal(&mut self, dt: f64) -> Result<Option<ThermalReport>, SeepageError> {
        let Some(binding) = self.config.thermal else {
            return Ok(None);
        };
        solver::iterate_thermal(&mut self.cells, &self.faces, &binding, &self.config, dt).map(Some)
    }

    /// Capillary exchange over `dt`, returning the wetting mass moved (kg)
    pub fn exchange_capillary(&mut self, dt: f64) -> f64 {
        let parallel = self.config.parallel;
        self.capillary
            .iter()
            .map(|rule| rule.apply(&mut self.cells, &self.faces, dt, parallel))
            .sum()
    }

    /// Fluid-rock heat exchange over `dt`, returning the heat moved to the
    /// fluids (J)
    ///
    /// Does nothing unless both a heat-exchange binding and a fluid
    /// temperature key are configured.
    pub fn exchange_heat(&mut self, dt: f64) -> f64 {
        match (self.config.heat_exchange, self.config.fluid_temp) {
            (Some(binding), Some(fluid_temp)) => solver::exchange_heat(
                &mut self.cells,
                &self.fludefs,
                &binding,
                fluid_temp,
                dt,
                self.config.parallel,
            ),
            _ => 0.0,
        }
    }

    /// Run every reaction over `dt`, in registration order
    pub fn react(&mut self, dt: f64) -> Vec<ReactionSummary> {
        let parallel = self.config.parallel;
        self.reactions
            .iter()
            .map(|reaction| reaction.apply(&mut self.cells, &self.fludefs, dt, parallel))
            .collect()
    }

    /// Apply every injector over `[time, time + dt]`
    pub fn apply_injectors(&mut self, dt: f64) -> Injection {
        let mut total = Injection::default();
        for injector in &self.injectors {
            total += injector.work(&mut self.cells, self.clock.time, dt);
        }
        total
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Run one full step of size `dt`
    ///
    /// Advances the clock and stores the recommended step size for
    /// [`Seepage::advance`]. A non-positive `dt` runs no phase but still
    /// counts as a step.
    ///
    /// # Errors
    /// Returns `Allocation` when a linear system cannot be reserved; the model
    /// is then left with the phases before the failing one applied.
    pub fn iterate(&mut self, dt: f64) -> Result<StepReport, SeepageError> {
        let mut report = StepReport {
            dt,
            ..StepReport::default()
        };

        {
            let scope = ProfilerScope::new("injectors");
            report.injection = self.apply_injectors(dt);
            report.times.injectors = scope.elapsed_ms();
        }
        {
            let scope = ProfilerScope::new("properties");
            self.update_properties();
            report.times.properties = scope.elapsed_ms();
        }
        {
            let scope = ProfilerScope::new("flow");
            report.flow = self.iterate_flow(dt)?;
            report.times.flow = scope.elapsed_ms();
        }
        {
            let scope = ProfilerScope::new("capillary");
            report.capillary_mass = self.exchange_capillary(dt);
            report.times.capillary = scope.elapsed_ms();
        }
        {
            let scope = ProfilerScope::new("thermal");
            report.thermal = self.iterate_thermal(dt)?;
            report.heat_exchanged = self.exchange_heat(dt);
            report.times.thermal = scope.elapsed_ms();
        }
        {
            let scope = ProfilerScope::new("reactions");
            report.reactions = self.react(dt);
            report.times.reactions = scope.elapsed_ms();
        }

        report.recommended_dt = if dt > 0.0 {
            self.config.timestep.recommend(dt, report.dv_max())
        } else {
            self.clock.dt
        };
        if dt > 0.0 {
            self.clock.time += dt;
        }
        self.clock.step += 1;
        self.clock.dt = report.recommended_dt;

        debug!(
            step = self.clock.step,
            time = self.clock.time,
            dt,
            dv_max = report.dv_max(),
            cg_iterations = report.flow.solve.iterations,
            next_dt = report.recommended_dt,
            elapsed_ms = report.times.total(),
            "Step complete"
        );
        Ok(report)
    }

    /// Run one step with the stored step size
    ///
    /// # Errors
    /// Same as [`Seepage::iterate`].
    pub fn advance(&mut self) -> Result<StepReport, SeepageError> {
        self.iterate(self.clock.dt)
    }

    /// Step with the adaptive step size until `time` is reached
    ///
    /// The last step is shortened to land on `time` exactly. Returns the
    /// number of steps taken.
    ///
    /// # Errors
    /// Returns `InvalidTimestep` when the stored step size is not positive,
    /// otherwise the same as [`Seepage::iterate`].
    pub fn run_until(&mut self, time: f64) -> Result<u64, SeepageError> {
        let mut steps = 0;
        while self.clock.time < time {
            if self.clock.dt.is_nan() || self.clock.dt <= 0.0 {
                return Err(SeepageError::InvalidTimestep(self.clock.dt));
            }
            let dt = self.clock.dt.min(time - self.clock.time);
            self.iterate(dt)?;
            steps += 1;
        }
        info!(steps, time = self.clock.time, "Reached target time");
        Ok(steps)
    }

    // ------------------------------------------------------------------
    // Monitoring
    // ------------------------------------------------------------------

    /// Copy of the per-cell state
    ///
    /// Temperatures come from the thermal binding, or else the heat-exchange
    /// binding, when one is configured.
    pub fn snapshot(&self) -> Snapshot {
        let temp_key = self
            .config
            .thermal
            .map(|t| t.cell_temp)
            .or_else(|| self.config.heat_exchange.map(|h| h.cell_temp));
        let cells = self
            .cells
            .iter()
            .map(|cell| CellSnapshot {
                pressure: cell.pressure(),
                masses: cell.fluids().iter().map(Fluid::mass).collect(),
                volumes: cell.fluids().iter().map(Fluid::volume).collect(),
                temperature: temp_key.and_then(|id| cell.attrs.get(id)),
            })
            .collect();
        Snapshot {
            time: self.clock.time,
            step: self.clock.step,
            cells,
        }
    }

    /// Total fluid mass over all cells (kg)
    pub fn total_fluid_mass(&self) -> f64 {
        self.cells.iter().map(Cell::fluid_mass).sum()
    }

    /// Total mass of fluid slot `index` over all cells (kg)
    pub fn fluid_mass(&self, index: usize) -> f64 {
        self.cells
            .iter()
            .filter_map(|cell| cell.fluid(index))
            .map(Fluid::mass)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injector::{InjectorMode, InjectorTarget};
    use crate::reaction::ReactionComponent;
    use approx::assert_relative_eq;

    fn water() -> FluDef {
        FluDef::constant("water", 1000.0, 1.0e-3, 4200.0).unwrap()
    }

    fn pore() -> PoreModel {
        PoreModel::new(1.0, 1.0e-9).unwrap()
    }

    #[test]
    fn test_fludef_added_after_cells() {
        let mut model = Seepage::default();
        let a = model.add_cell(Vec3::zeros(), pore());
        assert_eq!(model.add_fludef(water()), 0);
        assert_eq!(model.cell(a).unwrap().fluids().len(), 1);
        assert_eq!(model.cell(a).unwrap().fluid_mass(), 0.0);
    }

    #[test]
    fn test_face_rules() {
        let mut model = Seepage::default();
        let a = model.add_cell(Vec3::zeros(), pore());
        let b = model.add_cell(Vec3::new(1.0, 0.0, 0.0), pore());
        let c = model.add_cell(Vec3::new(2.0, 0.0, 0.0), pore());
        assert_eq!(model.add_face(a, b, 1.0).unwrap(), 0);
        assert_eq!(model.add_face(b, a, 1.0), Err(SeepageError::DuplicateFace(a, b)));
        assert_eq!(model.add_face(c, c, 1.0), Err(SeepageError::SelfFace(c)));
        assert!(matches!(
            model.add_face(a, 7, 1.0),
            Err(SeepageError::IndexOutOfRange { kind: "cell", .. })
        ));
        assert_eq!(model.add_face(b, c, 1.0).unwrap(), 1);

        model.remove_face(0).unwrap();
        assert_eq!(model.face_count(), 1);
        assert_eq!(model.face_between(a, b), None);
        assert_eq!(model.face_between(c, b), Some(0));
        assert_eq!(model.faces_of(b), &[0]);
    }

    #[test]
    fn test_run_until_rejects_zero_step() {
        let mut model = Seepage::new(SeepageConfig {
            timestep: crate::solver::TimestepController {
                dt_min: 0.0,
                ..Default::default()
            },
            ..SeepageConfig::default()
        });
        model.add_fludef(water());
        model.add_cell(Vec3::zeros(), pore());
        model.set_dt(0.0);

        assert_eq!(model.run_until(10.0), Err(SeepageError::InvalidTimestep(0.0)));
        assert_eq!(model.time(), 0.0);
        // Nothing to do once the target is already reached
        assert_eq!(model.run_until(0.0), Ok(0));
    }

    #[test]
    fn test_set_face_kr_checks_indices() {
        let mut model = Seepage::default();
        model.add_fludef(water());
        let a = model.add_cell(Vec3::zeros(), pore());
        let b = model.add_cell(Vec3::zeros(), pore());
        let face = model.add_face(a, b, 1.0).unwrap();
        assert!(model.set_face_kr(face, 0, Some(0)).is_err());
        let curve = model.add_kr_curve(Interp1::linear(0.0, 0.0, 1.0, 1.0).unwrap());
        model.set_face_kr(face, 0, Some(curve)).unwrap();
        assert_eq!(model.face(face).unwrap().kr_curve(0), Some(curve));
        assert!(model.set_face_kr(face, 3, None).is_err());
    }

    #[test]
    fn test_iterate_advances_clock() {
        let mut model = Seepage::default();
        model.add_fludef(water());
        let a = model.add_cell(Vec3::zeros(), pore());
        let b = model.add_cell(Vec3::new(1.0, 0.0, 0.0), pore());
        model.add_face(a, b, 1.0e-6).unwrap();
        model.fill(a, 1.0e6, &[1.0.into()]).unwrap();
        model.fill(b, 0.0, &[1.0.into()]).unwrap();

        let report = model.iterate(10.0).unwrap();
        assert!(report.flow.solve.converged);
        assert_eq!(model.step(), 1);
        assert_relative_eq!(model.time(), 10.0);
        assert_relative_eq!(model.dt(), report.recommended_dt);
        assert!(report.reactions.is_empty());
        assert!(report.thermal.is_none());
    }

    #[test]
    fn test_zero_dt_is_noop() {
        let mut model = Seepage::default();
        model.add_fludef(water());
        let a = model.add_cell(Vec3::zeros(), pore());
        let b = model.add_cell(Vec3::zeros(), pore());
        model.add_face(a, b, 1.0e-6).unwrap();
        model.fill(a, 1.0e6, &[1.0.into()]).unwrap();
        let before = model.snapshot();

        model.iterate(0.0).unwrap();
        let after = model.snapshot();
        assert_eq!(before.cells, after.cells);
        assert_eq!(model.time(), 0.0);
    }

    #[test]
    fn test_run_until_lands_on_target() {
        let mut model = Seepage::default();
        model.add_fludef(water());
        let a = model.add_cell(Vec3::zeros(), pore());
        let b = model.add_cell(Vec3::zeros(), pore());
        model.add_face(a, b, 1.0e-6).unwrap();
        model.fill(a, 1.0e6, &[1.0.into()]).unwrap();
        model.fill(b, 0.0, &[1.0.into()]).unwrap();
        model.set_dt(1.0);

        let steps = model.run_until(100.0).unwrap();
        assert!(steps > 0);
        assert_relative_eq!(model.time(), 100.0, epsilon = 1e-9);
        assert_eq!(model.step(), steps);
    }

    #[test]
    fn test_registration_validates() {
        let mut model = Seepage::default();
        model.add_fludef(water());
        let cell = model.add_cell(Vec3::zeros(), pore());

        let mut reaction = Reaction::new("r", Interp1::constant(300.0), Interp1::constant(0.0));
        reaction.add_component(ReactionComponent::new(vec![0], -1.0));
        assert!(model.add_reaction(reaction).is_err());

        let injector = Injector::new(
            cell + 5,
            InjectorTarget::Fluid { path: vec![0] },
            vec![(0.0, InjectorMode::Rate(1.0))],
        )
        .unwrap();
        assert!(model.add_injector(injector).is_err());

        let rule = CapillaryRule {
            wetting: 0,
            non_wetting: 0,
            pc: Interp1::constant(0.0),
        };
        assert!(matches!(model.add_capillary_rule(rule), Err(SeepageError::InvalidFluid(_))));
    }

    #[test]
    fn test_property_update_uses_fluid_temperature() {
        let mut model = Seepage::default();
        let t_key = model.reg_fluid_key("temperature");
        model.config.fluid_temp = Some(t_key);
        let table = crate::core_types::Interp2::from_fn(
            crate::core_types::Axis::span(0.0, 1.0e7, 2),
            crate::core_types::Axis::span(273.0, 373.0, 2),
            |_, t| 1000.0 - (t - 273.0),
        )
        .unwrap();
        let def = FluDef::leaf(
            "water",
            table,
            crate::core_types::Interp2::constant(1.0e-3),
            4200.0,
        )
        .unwrap();
        model.add_fludef(def);
        let cell = model.add_cell(Vec3::zeros(), pore());
        model.fill(cell, 0.0, &[1.0.into()]).unwrap();
        model
            .cell_mut(cell)
            .unwrap()
            .fluid_mut(0)
            .unwrap()
            .set_attr(t_key, 323.0);

        model.update_den();
        let fluid = model.cell(cell).unwrap().fluid(0).unwrap();
        assert_relative_eq!(fluid.density(), 950.0, epsilon = 1e-9);
    }

    #[test]
    fn test_buffers() {
        let mut model = Seepage::default();
        model.buffer_mut("dp", 3)[1] = 2.0;
        assert_eq!(model.buffer("dp"), Some(&[0.0, 2.0, 0.0][..]));
        assert_eq!(model.buffer_mut("dp", 2).len(), 2);
        assert!(model.buffer("other").is_none());
    }
}
