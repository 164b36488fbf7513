//! Named attribute keys
//!
//! Attributes are addressed by small integer ids. The registry hands out ids
//! for names so model scripts can say `reg_cell_key("temperature")` and keep
//! the id stable across save/load.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Name → id registries for cell, face and fluid attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrKeys {
    cell: FxHashMap<String, usize>,
    face: FxHashMap<String, usize>,
    fluid: FxHashMap<String, usize>,
}

fn register(map: &mut FxHashMap<String, usize>, name: &str) -> usize {
    if let Some(&id) = map.get(name) {
        return id;
    }
    let id = map.len();
    map.insert(name.to_string(), id);
    id
}

impl AttrKeys {
    /// Id of cell attribute `name`, registering it if new
    pub fn reg_cell_key(&mut self, name: &str) -> usize {
        register(&mut self.cell, name)
    }

    /// Id of face attribute `name`, registering it if new
    pub fn reg_face_key(&mut self, name: &str) -> usize {
        register(&mut self.face, name)
    }

    /// Id of fluid attribute `name`, registering it if new
    pub fn reg_fluid_key(&mut self, name: &str) -> usize {
        register(&mut self.fluid, name)
    }

    /// Registered cell attribute id
    pub fn cell_key(&self, name: &str) -> Option<usize> {
        self.cell.get(name).copied()
    }

    /// Registered face attribute id
    pub fn face_key(&self, name: &str) -> Option<usize> {
        self.face.get(name).copied()
    }

    /// Registered fluid attribute id
    pub fn fluid_key(&self, name: &str) -> Option<usize> {
        self.fluid.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_stable_per_kind() {
        let mut keys = AttrKeys::default();
        assert_eq!(keys.reg_cell_key("temperature"), 0);
        assert_eq!(keys.reg_cell_key("capacity"), 1);
        assert_eq!(keys.reg_cell_key("temperature"), 0);
        assert_eq!(keys.reg_face_key("g_heat"), 0);
        assert_eq!(keys.reg_fluid_key("temperature"), 0);
        assert_eq!(keys.cell_key("capacity"), Some(1));
        assert_eq!(keys.face_key("capacity"), None);
    }
}
