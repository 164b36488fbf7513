//! Faces connecting two cells

use crate::core_types::Attrs;
use serde::{Deserialize, Serialize};

/// Connector between exactly two cells
///
/// The cell pair is stored ordered (`cells.0 < cells.1`) so a pair maps to a
/// single face whatever order the caller used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    cells: (usize, usize),
    /// Cross-section area (m²)
    pub area: f64,
    /// Distance between the two cell centres (m)
    pub length: f64,
    /// Conductance, permeability × area / length (m³)
    pub cond: f64,
    ikr: Vec<Option<usize>>,
    /// User attributes (thermal conductance, apertures, ...)
    pub attrs: Attrs,
}

impl Face {
    pub(crate) fn new(a: usize, b: usize, cond: f64) -> Self {
        Self {
            cells: (a.min(b), a.max(b)),
            area: 1.0,
            length: 1.0,
            cond,
            ikr: Vec::new(),
            attrs: Attrs::new(),
        }
    }

    /// The two cells, lower index first
    #[inline]
    pub fn cells(&self) -> (usize, usize) {
        self.cells
    }

    /// The cell on the other side of `cell`, if `cell` touches this face
    pub fn other(&self, cell: usize) -> Option<usize> {
        match self.cells {
            (a, b) if a == cell => Some(b),
            (a, b) if b == cell => Some(a),
            _ => None,
        }
    }

    /// Set area and length and derive the conductance from a permeability (m²)
    pub fn set_geometry(&mut self, area: f64, length: f64, permeability: f64) {
        self.area = area;
        self.length = length;
        self.cond = if length > 0.0 {
            permeability * area / length
        } else {
            0.0
        };
    }

    /// Relative permeability curve chosen for fluid slot `fluid`
    pub fn kr_curve(&self, fluid: usize) -> Option<usize> {
        self.ikr.get(fluid).copied().flatten()
    }

    /// Select (or clear) the relative permeability curve for fluid slot `fluid`
    pub(crate) fn set_kr_curve(&mut self, fluid: usize, curve: Option<usize>) {
        if fluid >= self.ikr.len() {
            self.ikr.resize(fluid + 1, None);
        }
        self.ikr[fluid] = curve;
    }
}
