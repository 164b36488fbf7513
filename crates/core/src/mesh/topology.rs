//! Cell/face adjacency graph
//!
//! The topology owns no physics: it only answers "which faces touch this cell"
//! and "which face joins these two cells". It is rebuilt from the face list
//! whenever faces are removed, and after a model is loaded from disk.

use super::face::Face;
use crate::error::SeepageError;
use rustc_hash::FxHashMap;

/// Adjacency lists and the pair → face lookup
#[derive(Debug, Clone, Default)]
pub struct Topology {
    cell_faces: Vec<Vec<usize>>,
    pairs: FxHashMap<(usize, usize), usize>,
}

impl Topology {
    /// Build the adjacency of `cell_count` cells joined by `faces`
    ///
    /// # Errors
    /// Returns `IndexOutOfRange`, `SelfFace` or `DuplicateFace` when the face
    /// list is inconsistent.
    pub fn build(cell_count: usize, faces: &[Face]) -> Result<Self, SeepageError> {
        let mut topology = Self {
            cell_faces: vec![Vec::new(); cell_count],
            pairs: FxHashMap::default(),
        };
        for face in faces {
            let (a, b) = face.cells();
            topology.link(a, b)?;
        }
        Ok(topology)
    }

    /// Register a new cell, returning its index
    pub fn add_cell(&mut self) -> usize {
        self.cell_faces.push(Vec::new());
        self.cell_faces.len() - 1
    }

    /// Check that a face between `a` and `b` could be added
    ///
    /// # Errors
    /// Same conditions as [`Topology::link`].
    pub fn check_pair(&self, a: usize, b: usize) -> Result<(), SeepageError> {
        SeepageError::check_index("cell", a, self.cell_faces.len())?;
        SeepageError::check_index("cell", b, self.cell_faces.len())?;
        if a == b {
            return Err(SeepageError::SelfFace(a));
        }
        if self.pairs.contains_key(&(a.min(b), a.max(b))) {
            return Err(SeepageError::DuplicateFace(a.min(b), a.max(b)));
        }
        Ok(())
    }

    /// Register a face between `a` and `b`, returning its index
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` for unknown cells, `SelfFace` when `a == b`
    /// and `DuplicateFace` when the pair is already connected.
    pub fn link(&mut self, a: usize, b: usize) -> Result<usize, SeepageError> {
        self.check_pair(a, b)?;
        let face = self.pairs.len();
        self.pairs.insert((a.min(b), a.max(b)), face);
        self.cell_faces[a].push(face);
        self.cell_faces[b].push(face);
        Ok(face)
    }

    /// Number of cells
    pub fn cell_count(&self) -> usize {
        self.cell_faces.len()
    }

    /// Number of faces
    pub fn face_count(&self) -> usize {
        self.pairs.len()
    }

    /// Faces touching `cell`
    pub fn faces_of(&self, cell: usize) -> &[usize] {
        self.cell_faces.get(cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Face joining `a` and `b`, in either order
    pub fn face_between(&self, a: usize, b: usize) -> Option<usize> {
        self.pairs.get(&(a.min(b), a.max(b))).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_and_lookup() {
        let mut topology = Topology::default();
        for _ in 0..3 {
            topology.add_cell();
        }
        assert_eq!(topology.link(0, 1).unwrap(), 0);
        assert_eq!(topology.link(2, 1).unwrap(), 1);
        assert_eq!(topology.face_between(1, 0), Some(0));
        assert_eq!(topology.face_between(1, 2), Some(1));
        assert_eq!(topology.face_between(0, 2), None);
        assert_eq!(topology.faces_of(1), &[0, 1]);
        assert_eq!(topology.face_count(), 2);
    }

    #[test]
    fn test_rejects_bad_faces() {
        let mut topology = Topology::default();
        topology.add_cell();
        topology.add_cell();
        topology.link(0, 1).unwrap();
        assert_eq!(topology.link(1, 0), Err(SeepageError::DuplicateFace(0, 1)));
        assert_eq!(topology.link(1, 1), Err(SeepageError::SelfFace(1)));
        assert!(matches!(
            topology.link(0, 7),
            Err(SeepageError::IndexOutOfRange { kind: "cell", .. })
        ));
    }

    #[test]
    fn test_build_from_faces() {
        let faces = vec![Face::new(0, 1, 1.0), Face::new(1, 2, 1.0)];
        let topology = Topology::build(3, &faces).unwrap();
        assert_eq!(topology.faces_of(0), &[0]);
        assert_eq!(topology.faces_of(2), &[1]);
        assert!(Topology::build(2, &faces).is_err());
    }
}
