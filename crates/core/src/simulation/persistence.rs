//! JSON persistence of whole models
//!
//! The adjacency index is not stored; it is rebuilt from the face list when a
//! model is read back. Floats are written with `float_roundtrip`, so a
//! save/load cycle reproduces every value bit for bit.

use super::Seepage;
use crate::mesh::Topology;
use std::fs;
use std::path::Path;
use tracing::info;

impl Seepage {
    /// Serialize the model to a JSON string
    ///
    /// # Errors
    /// Returns `SerializeFailed` if a value cannot be represented in JSON.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PersistenceError::SerializeFailed(e.to_string()))
    }

    /// Read a model back from [`Seepage::to_json`] output
    ///
    /// Tables and pore models are checked as they are read, so anything
    /// their constructors would reject fails here too.
    ///
    /// # Errors
    /// Returns `ParseFailed` for malformed JSON, invalid tables or pore
    /// parameters, an inconsistent face list or unresolvable reaction paths.
    pub fn from_json(contents: &str) -> Result<Self, PersistenceError> {
        let mut model: Self = serde_json::from_str(contents)
            .map_err(|e| PersistenceError::ParseFailed(e.to_string()))?;
        model.topology = Topology::build(model.cells.len(), &model.faces)
            .map_err(|e| PersistenceError::ParseFailed(e.to_string()))?;
        let mismatched = model.cells.iter().position(|cell| {
            cell.fluids().len() != model.fludefs.len()
                || !cell.fluids().iter().zip(&model.fludefs).all(|(f, d)| f.matches(d))
        });
        if let Some(index) = mismatched {
            return Err(PersistenceError::ParseFailed(format!(
                "fluids of cell {index} do not match the fluid definitions"
            )));
        }
        for reaction in &model.reactions {
            reaction
                .validate(&model.fludefs)
                .map_err(|e| PersistenceError::ParseFailed(e.to_string()))?;
        }
        Ok(model)
    }

    /// Load a model from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let contents =
            fs::read_to_string(&path).map_err(|e| PersistenceError::LoadFailed(e.to_string()))?;

        let model = Self::from_json(&contents)?;

        info!(
            path = %path.as_ref().display(),
            cells = model.cell_count(),
            faces = model.face_count(),
            time = model.time(),
            "Loaded seepage model"
        );
        Ok(model)
    }

    /// Save the model to file
    ///
    /// # Errors
    /// Returns error if file cannot be written or the model cannot be serialized
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistenceError> {
        let contents = self.to_json()?;

        fs::write(path, contents).map_err(|e| PersistenceError::SaveFailed(e.to_string()))?;

        Ok(())
    }
}

/// Errors that can occur with persistence operations
#[derive(Debug)]
pub enum PersistenceError {
    /// Failed to load file
    LoadFailed(String),
    /// Failed to parse file contents
    ParseFailed(String),
    /// Failed to serialize state
    SerializeFailed(String),
    /// Failed to save file
    SaveFailed(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::LoadFailed(msg) => write!(f, "Failed to load: {msg}"),
            PersistenceError::ParseFailed(msg) => write!(f, "Failed to parse: {msg}"),
            PersistenceError::SerializeFailed(msg) => write!(f, "Failed to serialize: {msg}"),
            PersistenceError::SaveFailed(msg) => write!(f, "Failed to save: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}
