//! Sparse per-entity attribute storage
//!
//! Cells, faces and fluids carry user-defined scalar attributes addressed by a
//! small integer id (usually obtained from the model's key registry). A slot
//! that was never written reads as `None`, meaning "no contract enforced".

use serde::{Deserialize, Serialize};

/// Attribute slots indexed by id; unset slots are `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs(Vec<Option<f64>>);

impl Attrs {
    /// Create an empty attribute array
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Read attribute `id`
    #[inline]
    pub fn get(&self, id: usize) -> Option<f64> {
        self.0.get(id).copied().flatten()
    }

    /// Write attribute `id`, growing the slot array as needed
    pub fn set(&mut self, id: usize, value: f64) {
        if id >= self.0.len() {
            self.0.resize(id + 1, None);
        }
        self.0[id] = Some(value);
    }

    /// Remove attribute `id`
    pub fn clear(&mut self, id: usize) {
        if let Some(slot) = self.0.get_mut(id) {
            *slot = None;
        }
        while matches!(self.0.last(), Some(None)) {
            self.0.pop();
        }
    }

    /// Number of allocated slots (set or not)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no slot has ever been allocated
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the attributes that are set, as `(id, value)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(id, value)| value.map(|v| (id, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_reads_none() {
        let attrs = Attrs::new();
        assert_eq!(attrs.get(0), None);
        assert_eq!(attrs.get(100), None);
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_set_grows_and_clear_shrinks() {
        let mut attrs = Attrs::new();
        attrs.set(3, 2.5);
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs.get(3), Some(2.5));
        assert_eq!(attrs.get(1), None);

        attrs.set(1, -1.0);
        assert_eq!(attrs.iter().collect::<Vec<_>>(), vec![(1, -1.0), (3, 2.5)]);

        attrs.clear(3);
        assert_eq!(attrs.get(3), None);
        assert_eq!(attrs.len(), 2);
    }
}
