//! Scheduled mass and heat sources
//!
//! An [`Injector`] targets one cell (or, with a positive radius, every cell
//! within that distance, weighted by `v0`) and follows a time-ordered schedule
//! of [`InjectorMode`] operations. Rates and powers are integrated as
//! piecewise-constant over `[time, time + dt]`; a fixed boundary temperature
//! uses the operation active at `time`.

use crate::core_types::Vec3;
use crate::error::SeepageError;
use crate::fluid::{FluDef, Fluid};
use crate::mesh::Cell;
use serde::{Deserialize, Serialize};

/// One scheduled operation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InjectorMode {
    /// Volumetric fluid rate (m³/s); negative values withdraw
    Rate(f64),
    /// Heat power (W); negative values extract heat
    Power(f64),
    /// Fixed boundary temperature (K) coupled through a conductance (W/K)
    Temperature {
        /// Boundary temperature (K)
        value: f64,
        /// Boundary conductance (W/K)
        conductance: f64,
    },
}

/// What the injector acts on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InjectorTarget {
    /// A fluid component: slot index followed by component indices
    Fluid {
        /// Fluid path inside the cell
        path: Vec<usize>,
    },
    /// The cell temperature
    Heat {
        /// Cell temperature attribute (K)
        temp_attr: usize,
        /// Cell heat capacity attribute (J/K)
        capacity_attr: usize,
    },
}

/// Mass and heat delivered by injectors during one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    /// Net fluid mass added (kg)
    pub mass: f64,
    /// Net heat added (J)
    pub heat: f64,
}

impl std::ops::AddAssign for Injection {
    fn add_assign(&mut self, other: Self) {
        self.mass += other.mass;
        self.heat += other.heat;
    }
}

/// A scheduled source attached to a cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Injector {
    cell: usize,
    target: InjectorTarget,
    /// Influence radius (m); 0 acts on the target cell only
    pub radius: f64,
    schedule: Vec<(f64, InjectorMode)>,
    template: Option<Fluid>,
}

impl Injector {
    /// Create an injector on `cell` following `schedule`
    ///
    /// # Errors
    /// Returns `InvalidSchedule` when the times are not finite and
    /// non-decreasing, or when a mode does not fit the target (rates need a
    /// fluid target, powers and temperatures a heat target).
    pub fn new(
        cell: usize,
        target: InjectorTarget,
        schedule: Vec<(f64, InjectorMode)>,
    ) -> Result<Self, SeepageError> {
        if schedule.iter().any(|(t, _)| !t.is_finite()) {
            return Err(SeepageError::InvalidSchedule(
                "operation times must be finite".to_string(),
            ));
        }
        if let Some(w) = schedule.windows(2).find(|w| w[1].0 < w[0].0) {
            return Err(SeepageError::InvalidSchedule(format!(
                "operation at t={} follows t={}",
                w[1].0, w[0].0
            )));
        }
        for (t, mode) in &schedule {
            let fits = matches!(
                (&target, mode),
                (InjectorTarget::Fluid { .. }, InjectorMode::Rate(_))
                    | (
                        InjectorTarget::Heat { .. },
                        InjectorMode::Power(_) | InjectorMode::Temperature { .. }
                    )
            );
            if !fits {
                return Err(SeepageError::InvalidSchedule(format!(
                    "operation {mode:?} at t={t} does not apply to {target:?}"
                )));
            }
        }
        Ok(Self {
            cell,
            target,
            radius: 0.0,
            schedule,
            template: None,
        })
    }

    /// Spread the source over cells within `radius` of the target cell
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius.max(0.0);
        self
    }

    /// Inject fluid with the composition, density and attributes of `template`
    pub fn with_template(mut self, template: Fluid) -> Self {
        self.template = Some(template);
        self
    }

    /// Target cell
    pub fn cell(&self) -> usize {
        self.cell
    }

    /// Target channel
    pub fn target(&self) -> &InjectorTarget {
        &self.target
    }

    /// Scheduled operations
    pub fn schedule(&self) -> &[(f64, InjectorMode)] {
        &self.schedule
    }

    /// Check the injector against the model it is added to
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` for an unknown cell and `InvalidSchedule` for a
    /// fluid path that does not exist.
    pub fn validate(&self, cell_count: usize, defs: &[FluDef]) -> Result<(), SeepageError> {
        SeepageError::check_index("cell", self.cell, cell_count)?;
        if let InjectorTarget::Fluid { path } = &self.target {
            let resolves = path
                .split_first()
                .and_then(|(&slot, rest)| defs.get(slot)?.get(rest))
                .is_some();
            if !resolves {
                return Err(SeepageError::InvalidSchedule(format!(
                    "fluid path {path:?} does not exist"
                )));
            }
        }
        Ok(())
    }

    /// Operation active at `time`
    pub fn mode_at(&self, time: f64) -> Option<InjectorMode> {
        self.schedule
            .iter()
            .take_while(|(t, _)| *t <= time)
            .last()
            .map(|(_, mode)| *mode)
    }

    /// ∫ value dt over `[time, time + dt]` of the rate or power schedule
    fn integrate(&self, time: f64, dt: f64) -> f64 {
        let end = time + dt;
        let mut total = 0.0;
        for (k, (start, mode)) in self.schedule.iter().enumerate() {
            let stop = self.schedule.get(k + 1).map_or(f64::INFINITY, |(t, _)| *t);
            let span = stop.min(end) - start.max(time);
            if span <= 0.0 {
                continue;
            }
            if let InjectorMode::Rate(value) | InjectorMode::Power(value) = mode {
                total += value * span;
            }
        }
        total
    }

    /// Cells reached by the injector with their normalized weights
    fn reach(&self, cells: &[Cell]) -> Vec<(usize, f64)> {
        let Some(center) = cells.get(self.cell).map(|c| c.pos) else {
            return Vec::new();
        };
        if self.radius <= 0.0 {
            return vec![(self.cell, 1.0)];
        }
        let within = |pos: &Vec3| (pos - center).norm() <= self.radius;
        let reached: Vec<(usize, f64)> = cells
            .iter()
            .enumerate()
            .filter(|(_, c)| within(&c.pos))
            .map(|(i, c)| (i, c.pore.v0()))
            .collect();
        let total: f64 = reached.iter().map(|(_, w)| w).sum();
        reached.into_iter().map(|(i, w)| (i, w / total)).collect()
    }

    fn inject_fluid(&self, cell: &mut Cell, path: &[usize], volume: f64) -> f64 {
        let template = self.template.as_ref();
        let Some(fluid) = cell.component_mut(path) else {
            return 0.0;
        };
        let density = template.map_or_else(|| fluid.density(), Fluid::density);
        let mass = volume * density;
        if mass > 0.0 {
            match template {
                Some(template) => {
                    let mut portion = template.clone();
                    portion.set_mass(mass);
                    fluid.absorb(&portion);
                }
                None => fluid.add_mass(mass),
            }
            mass
        } else {
            let removed = (-mass).min(fluid.mass());
            fluid.add_mass(-removed);
            -removed
        }
    }

    /// Apply the schedule over `[time, time + dt]`
    pub fn work(&self, cells: &mut [Cell], time: f64, dt: f64) -> Injection {
        let mut injection = Injection::default();
        if dt <= 0.0 {
            return injection;
        }
        let reach = self.reach(cells);
        match &self.target {
            InjectorTarget::Fluid { path } => {
                let volume = self.integrate(time, dt);
                if volume == 0.0 {
                    return injection;
                }
                for (i, weight) in reach {
                    injection.mass += self.inject_fluid(&mut cells[i], path, volume * weight);
                }
            }
            InjectorTarget::Heat {
                temp_attr,
                capacity_attr,
            } => {
                let fixed = match self.mode_at(time) {
                    Some(InjectorMode::Temperature { value, conductance }) => {
                        Some((value, conductance))
                    }
                    _ => None,
                };
                let energy = self.integrate(time, dt);
                for (i, weight) in reach {
                    let cell = &mut cells[i];
                    let (Some(t), Some(mc)) =
                        (cell.attrs.get(*temp_attr), cell.attrs.get(*capacity_attr))
                    else {
                        continue;
                    };
                    if mc <= 0.0 {
                        continue;
                    }
                    let dt_cell = match fixed {
                        Some((value, g)) => {
                            (value - t) * (1.0 - (-g.max(0.0) * weight * dt / mc).exp())
                        }
                        None => energy * weight / mc,
                    };
                    cell.attrs.set(*temp_attr, t + dt_cell);
                    injection.heat += dt_cell * mc;
                }
            }
        }
        injection
    }
}
