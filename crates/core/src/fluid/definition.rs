//! Static fluid property definitions
//!
//! A [`FluDef`] is either a leaf (a pure fluid with density and viscosity
//! tables and a constant specific heat) or a composite made of sub-definitions,
//! e.g. a gas phase of methane and CO2, or a liquid of water and dissolved salt.

use crate::core_types::Interp2;
use crate::error::SeepageError;
use serde::{Deserialize, Serialize};

/// Default reference temperature for table lookups (K)
pub const DEFAULT_REFERENCE_TEMPERATURE: f64 = 293.15;

/// Property definition of a pure fluid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafDef {
    /// Display name (e.g. `"water"`)
    pub name: String,
    /// Density table ρ(P, T) in kg/m³
    density: Interp2,
    /// Viscosity table μ(P, T) in Pa·s
    viscosity: Interp2,
    /// Specific heat in J/(kg·K)
    specific_heat: f64,
    /// Temperature used when a fluid carries no temperature attribute (K)
    reference_temperature: f64,
}

impl LeafDef {
    /// Density at pressure `p` (Pa) and temperature `t` (K), clamped to the table
    #[inline]
    pub fn density(&self, p: f64, t: f64) -> f64 {
        self.density.get(p, t)
    }

    /// Viscosity at pressure `p` (Pa) and temperature `t` (K), clamped to the table
    #[inline]
    pub fn viscosity(&self, p: f64, t: f64) -> f64 {
        self.viscosity.get(p, t)
    }

    /// Specific heat (J/(kg·K))
    pub fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    /// Reference temperature (K)
    pub fn reference_temperature(&self) -> f64 {
        self.reference_temperature
    }
}

/// Recursive fluid definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FluDef {
    /// Pure fluid
    Leaf(LeafDef),
    /// Mixture of sub-components
    Composite {
        /// Display name (e.g. `"gas"`)
        name: String,
        /// Component definitions, index-addressed
        components: Vec<FluDef>,
    },
}

impl FluDef {
    /// Define a pure fluid from property tables
    ///
    /// # Errors
    /// Returns `InvalidFluid` when a table has a non-positive entry or the
    /// specific heat is not positive.
    pub fn leaf(
        name: impl Into<String>,
        density: Interp2,
        viscosity: Interp2,
        specific_heat: f64,
    ) -> Result<Self, SeepageError> {
        let name = name.into();
        if density.min_value() <= 0.0 {
            return Err(SeepageError::InvalidFluid(format!(
                "{name}: density table must be positive"
            )));
        }
        if viscosity.min_value() <= 0.0 {
            return Err(SeepageError::InvalidFluid(format!(
                "{name}: viscosity table must be positive"
            )));
        }
        if !(specific_heat.is_finite() && specific_heat > 0.0) {
            return Err(SeepageError::InvalidFluid(format!(
                "{name}: specific heat must be positive, got {specific_heat}"
            )));
        }
        Ok(FluDef::Leaf(LeafDef {
            name,
            density,
            viscosity,
            specific_heat,
            reference_temperature: DEFAULT_REFERENCE_TEMPERATURE,
        }))
    }

    /// Define a pure fluid with constant properties
    ///
    /// # Errors
    /// Same as [`FluDef::leaf`].
    pub fn constant(
        name: impl Into<String>,
        density: f64,
        viscosity: f64,
        specific_heat: f64,
    ) -> Result<Self, SeepageError> {
        Self::leaf(
            name,
            Interp2::constant(density),
            Interp2::constant(viscosity),
            specific_heat,
        )
    }

    /// Define a mixture
    ///
    /// # Errors
    /// Returns `InvalidFluid` when `components` is empty.
    pub fn composite(
        name: impl Into<String>,
        components: Vec<FluDef>,
    ) -> Result<Self, SeepageError> {
        let name = name.into();
        if components.is_empty() {
            return Err(SeepageError::InvalidFluid(format!(
                "{name}: a mixture needs at least one component"
            )));
        }
        Ok(FluDef::Composite { name, components })
    }

    /// Override the reference temperature of every leaf
    pub fn with_reference_temperature(mut self, temperature: f64) -> Self {
        self.for_each_leaf_mut(&mut |leaf| leaf.reference_temperature = temperature);
        self
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            FluDef::Leaf(leaf) => &leaf.name,
            FluDef::Composite { name, .. } => name,
        }
    }

    /// Number of direct components (0 for a leaf)
    pub fn component_count(&self) -> usize {
        match self {
            FluDef::Leaf(_) => 0,
            FluDef::Composite { components, .. } => components.len(),
        }
    }

    /// Definition reached by following `path` (empty path = self)
    pub fn get(&self, path: &[usize]) -> Option<&FluDef> {
        match path.split_first() {
            None => Some(self),
            Some((&head, rest)) => match self {
                FluDef::Leaf(_) => None,
                FluDef::Composite { components, .. } => components.get(head)?.get(rest),
            },
        }
    }

    /// Leaf definition, if this is a pure fluid
    pub fn as_leaf(&self) -> Option<&LeafDef> {
        match self {
            FluDef::Leaf(leaf) => Some(leaf),
            FluDef::Composite { .. } => None,
        }
    }

    fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&mut LeafDef)) {
        match self {
            FluDef::Leaf(leaf) => f(leaf),
            FluDef::Composite { components, .. } => {
                for component in components {
                    component.for_each_leaf_mut(f);
                }
            }
        }
    }
}
