//! Live per-cell fluid instances
//!
//! A [`Fluid`] mirrors the shape of its [`FluDef`]: leaves store mass, density,
//! viscosity and attributes; composites only store their components. Every
//! aggregate (mass, volume, density, attributes) is a recursive fold over the
//! components and is never cached.

use super::definition::FluDef;
use crate::core_types::Attrs;
use serde::{Deserialize, Serialize};

/// State of a pure fluid inside one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafFluid {
    /// Mass (kg), never negative
    pub mass: f64,
    /// Current density (kg/m³)
    pub density: f64,
    /// Current viscosity (Pa·s)
    pub viscosity: f64,
    /// User attributes (temperature, specific heat, ...)
    pub attrs: Attrs,
}

/// Fluid instance: a pure fluid or a mixture of components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fluid {
    /// Pure fluid
    Leaf(LeafFluid),
    /// Mixture, component order matches the definition
    Composite(Vec<Fluid>),
}

impl Fluid {
    /// Empty instance shaped like `def`, with properties evaluated at `(p, t)`
    ///
    /// When `t` is `None` each leaf uses its reference temperature.
    pub fn from_def(def: &FluDef, p: f64, t: Option<f64>) -> Self {
        match def {
            FluDef::Leaf(leaf) => {
                let t = t.unwrap_or(leaf.reference_temperature());
                Fluid::Leaf(LeafFluid {
                    mass: 0.0,
                    density: leaf.density(p, t),
                    viscosity: leaf.viscosity(p, t),
                    attrs: Attrs::new(),
                })
            }
            FluDef::Composite { components, .. } => Fluid::Composite(
                components
                    .iter()
                    .map(|c| Fluid::from_def(c, p, t))
                    .collect(),
            ),
        }
    }

    /// Pure fluid with the given state
    pub fn leaf(mass: f64, density: f64, viscosity: f64) -> Self {
        Fluid::Leaf(LeafFluid {
            mass: mass.max(0.0),
            density,
            viscosity,
            attrs: Attrs::new(),
        })
    }

    /// True when the instance has the same tree shape as `def`
    pub fn matches(&self, def: &FluDef) -> bool {
        match (self, def) {
            (Fluid::Leaf(_), FluDef::Leaf(_)) => true,
            (Fluid::Composite(parts), FluDef::Composite { components, .. }) => {
                parts.len() == components.len()
                    && parts.iter().zip(components).all(|(p, d)| p.matches(d))
            }
            _ => false,
        }
    }

    /// Total mass (kg)
    pub fn mass(&self) -> f64 {
        match self {
            Fluid::Leaf(leaf) => leaf.mass,
            Fluid::Composite(parts) => parts.iter().map(Fluid::mass).sum(),
        }
    }

    /// Total volume Σ mᵢ/ρᵢ (m³)
    pub fn volume(&self) -> f64 {
        match self {
            Fluid::Leaf(leaf) => leaf.mass / leaf.density,
            Fluid::Composite(parts) => parts.iter().map(Fluid::volume).sum(),
        }
    }

    /// Density (kg/m³); a mixture with no volume reports the mean component density
    pub fn density(&self) -> f64 {
        match self {
            Fluid::Leaf(leaf) => leaf.density,
            Fluid::Composite(parts) => {
                let volume = self.volume();
                if volume > 0.0 {
                    self.mass() / volume
                } else {
                    parts.iter().map(Fluid::density).sum::<f64>() / parts.len() as f64
                }
            }
        }
    }

    /// Viscosity (Pa·s); mixtures use the volume-weighted mean
    pub fn viscosity(&self) -> f64 {
        match self {
            Fluid::Leaf(leaf) => leaf.viscosity,
            Fluid::Composite(parts) => {
                let volume = self.volume();
                if volume > 0.0 {
                    parts
                        .iter()
                        .map(|p| p.volume() * p.viscosity())
                        .sum::<f64>()
                        / volume
                } else {
                    parts.iter().map(Fluid::viscosity).sum::<f64>() / parts.len() as f64
                }
            }
        }
    }

    /// Attribute `id`: leaf value, or the mass-weighted mean over the components
    /// that define it (plain mean when those components hold no mass)
    pub fn attr(&self, id: usize) -> Option<f64> {
        match self {
            Fluid::Leaf(leaf) => leaf.attrs.get(id),
            Fluid::Composite(parts) => {
                let mut weighted = 0.0;
                let mut mass = 0.0;
                let mut plain = 0.0;
                let mut count = 0usize;
                for part in parts {
                    if let Some(value) = part.attr(id) {
                        let m = part.mass();
                        weighted += value * m;
                        mass += m;
                        plain += value;
                        count += 1;
                    }
                }
                match count {
                    0 => None,
                    _ if mass > 0.0 => Some(weighted / mass),
                    _ => Some(plain / count as f64),
                }
            }
        }
    }

    /// Set attribute `id` on this fluid and, for mixtures, on every component
    pub fn set_attr(&mut self, id: usize, value: f64) {
        self.for_each_leaf_mut(&mut |leaf| leaf.attrs.set(id, value));
    }

    /// Component reached by `path` (empty path = self)
    pub fn get(&self, path: &[usize]) -> Option<&Fluid> {
        match path.split_first() {
            None => Some(self),
            Some((&head, rest)) => match self {
                Fluid::Leaf(_) => None,
                Fluid::Composite(parts) => parts.get(head)?.get(rest),
            },
        }
    }

    /// Mutable component reached by `path`
    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Fluid> {
        match path.split_first() {
            None => Some(self),
            Some((&head, rest)) => match self {
                Fluid::Leaf(_) => None,
                Fluid::Composite(parts) => parts.get_mut(head)?.get_mut(rest),
            },
        }
    }

    /// Direct components (empty for a leaf)
    pub fn components(&self) -> &[Fluid] {
        match self {
            Fluid::Leaf(_) => &[],
            Fluid::Composite(parts) => parts,
        }
    }

    /// Multiply every mass by `factor` (clamped at zero)
    pub fn scale(&mut self, factor: f64) {
        let factor = factor.max(0.0);
        self.for_each_leaf_mut(&mut |leaf| leaf.mass *= factor);
    }

    /// Copy of this fluid with every mass multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Fluid {
        let mut copy = self.clone();
        copy.scale(factor);
        copy
    }

    /// Set the total mass keeping the composition (equal split when empty)
    pub fn set_mass(&mut self, mass: f64) {
        let mass = mass.max(0.0);
        match self {
            Fluid::Leaf(leaf) => leaf.mass = mass,
            Fluid::Composite(parts) => {
                let current: f64 = parts.iter().map(Fluid::mass).sum();
                if current > 0.0 {
                    let factor = mass / current;
                    for part in parts {
                        part.scale(factor);
                    }
                } else {
                    let share = mass / parts.len() as f64;
                    for part in parts {
                        part.set_mass(share);
                    }
                }
            }
        }
    }

    /// Add `delta` kg keeping the composition; the result never drops below zero
    pub fn add_mass(&mut self, delta: f64) {
        let mass = self.mass();
        self.set_mass(mass + delta);
    }

    /// Set the total volume keeping the composition (equal volume split when empty)
    pub fn set_volume(&mut self, volume: f64) {
        let volume = volume.max(0.0);
        match self {
            Fluid::Leaf(leaf) => leaf.mass = volume * leaf.density,
            Fluid::Composite(parts) => {
                let current: f64 = parts.iter().map(Fluid::volume).sum();
                if current > 0.0 {
                    let factor = volume / current;
                    for part in parts {
                        part.scale(factor);
                    }
                } else {
                    let share = volume / parts.len() as f64;
                    for part in parts {
                        part.set_volume(share);
                    }
                }
            }
        }
    }

    /// Merge `other` (same shape) into this fluid
    ///
    /// Masses add component-wise. Attributes are mixed mass-weighted, so a
    /// temperature attribute carries the enthalpy of the incoming fluid along.
    /// Density and viscosity stay those of the receiving fluid.
    pub fn absorb(&mut self, other: &Fluid) {
        match (self, other) {
            (Fluid::Leaf(mine), Fluid::Leaf(theirs)) => {
                let total = mine.mass + theirs.mass;
                if total > 0.0 {
                    for (id, value) in theirs.attrs.iter() {
                        let mixed = match mine.attrs.get(id) {
                            Some(own) => (own * mine.mass + value * theirs.mass) / total,
                            None => value,
                        };
                        mine.attrs.set(id, mixed);
                    }
                }
                mine.mass = total;
            }
            (Fluid::Composite(mine), Fluid::Composite(theirs)) => {
                for (part, incoming) in mine.iter_mut().zip(theirs) {
                    part.absorb(incoming);
                }
            }
            (mine, theirs) => {
                // Shapes differ: keep the receiving composition
                mine.add_mass(theirs.mass());
            }
        }
    }

    /// Visit every leaf
    pub fn for_each_leaf(&self, f: &mut impl FnMut(&LeafFluid)) {
        match self {
            Fluid::Leaf(leaf) => f(leaf),
            Fluid::Composite(parts) => {
                for part in parts {
                    part.for_each_leaf(f);
                }
            }
        }
    }

    /// Visit every leaf mutably
    pub fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&mut LeafFluid)) {
        match self {
            Fluid::Leaf(leaf) => f(leaf),
            Fluid::Composite(parts) => {
                for part in parts {
                    part.for_each_leaf_mut(f);
                }
            }
        }
    }

    /// Visit every leaf together with its definition
    ///
    /// Leaves whose position does not exist in `def` are skipped.
    pub fn for_each_leaf_with_def<'d>(
        &self,
        def: &'d FluDef,
        f: &mut impl FnMut(&LeafFluid, &'d super::LeafDef),
    ) {
        match (self, def) {
            (Fluid::Leaf(leaf), FluDef::Leaf(leaf_def)) => f(leaf, leaf_def),
            (Fluid::Composite(parts), FluDef::Composite { components, .. }) => {
                for (part, part_def) in parts.iter().zip(components) {
                    part.for_each_leaf_with_def(part_def, f);
                }
            }
            _ => {}
        }
    }

    /// Mutable variant of [`Fluid::for_each_leaf_with_def`]
    pub fn for_each_leaf_with_def_mut<'d>(
        &mut self,
        def: &'d FluDef,
        f: &mut impl FnMut(&mut LeafFluid, &'d super::LeafDef),
    ) {
        match (self, def) {
            (Fluid::Leaf(leaf), FluDef::Leaf(leaf_def)) => f(leaf, leaf_def),
            (Fluid::Composite(parts), FluDef::Composite { components, .. }) => {
                for (part, part_def) in parts.iter_mut().zip(components) {
                    part.for_each_leaf_with_def_mut(part_def, f);
                }
            }
            _ => {}
        }
    }

    /// Heat capacity Σ mᵢ·cᵢ (J/K) using the definition's specific heats
    pub fn heat_capacity(&self, def: &FluDef) -> f64 {
        let mut capacity = 0.0;
        self.for_each_leaf_with_def(def, &mut |leaf, leaf_def| {
            capacity += leaf.mass * leaf_def.specific_heat();
        });
        capacity
    }
}
