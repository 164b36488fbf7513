//! Fluid property model
//!
//! [`FluDef`] holds the static definition (tables, specific heat) and
//! [`Fluid`] the live per-cell state. [`Saturation`] describes how a pore
//! volume is split between fluids and, recursively, their components.

mod data;
mod definition;

pub use data::{Fluid, LeafFluid};
pub use definition::{FluDef, LeafDef, DEFAULT_REFERENCE_TEMPERATURE};

/// Volume share of one fluid slot, possibly broken down by component
#[derive(Debug, Clone, PartialEq)]
pub enum Saturation {
    /// Share of the slot; a mixture keeps its current composition
    Value(f64),
    /// Shares of the components of a mixture
    Nested(Vec<Saturation>),
}

impl Saturation {
    /// Total share of this entry (nested entries sum their children)
    pub fn total(&self) -> f64 {
        match self {
            Saturation::Value(v) => v.max(0.0),
            Saturation::Nested(parts) => parts.iter().map(Saturation::total).sum(),
        }
    }
}

impl From<f64> for Saturation {
    fn from(value: f64) -> Self {
        Saturation::Value(value)
    }
}

impl From<Vec<f64>> for Saturation {
    fn from(values: Vec<f64>) -> Self {
        Saturation::Nested(values.into_iter().map(Saturation::Value).collect())
    }
}

/// Distribute `volume` over `fluids` proportionally to `saturations`
///
/// Missing trailing entries count as zero. When all shares are zero, every
/// fluid is emptied.
pub(crate) fn distribute_volume(fluids: &mut [Fluid], saturations: &[Saturation], volume: f64) {
    let total: f64 = saturations.iter().map(Saturation::total).sum();
    for (i, fluid) in fluids.iter_mut().enumerate() {
        let share = match saturations.get(i) {
            Some(s) if total > 0.0 => s.total() / total,
            _ => 0.0,
        };
        let slot_volume = volume.max(0.0) * share;
        match (fluid, saturations.get(i)) {
            (Fluid::Composite(parts), Some(Saturation::Nested(nested))) => {
                distribute_volume(parts, nested, slot_volume);
            }
            (fluid, _) => {
                if slot_volume > 0.0 {
                    fluid.set_volume(slot_volume);
                } else {
                    fluid.set_mass(0.0);
                }
            }
        }
    }
}
