//! Error types for model construction and stepping
//!
//! Only configuration and resource problems are reported through
//! [`SeepageError`]. Numerical non-convergence is surfaced in solver reports
//! and physical constraint violations (negative masses, pressures outside a
//! table) are clamped locally.

use std::fmt;

/// Errors raised while building or stepping a [`crate::Seepage`] model
#[derive(Debug, Clone, PartialEq)]
pub enum SeepageError {
    /// Pore model parameters must satisfy `v0 > 0` and `k > 0`
    InvalidPore {
        /// Volume at zero pressure (m³)
        v0: f64,
        /// Pore compressibility (m³/Pa)
        k: f64,
    },
    /// Malformed interpolation table
    InvalidTable(String),
    /// Malformed fluid definition or fluid path
    InvalidFluid(String),
    /// Malformed reaction (empty side, unknown component, bad curve)
    InvalidReaction(String),
    /// Injector schedule is not time-ordered or targets something missing
    InvalidSchedule(String),
    /// Index into one of the model arenas is out of range
    IndexOutOfRange {
        /// Arena name (`"cell"`, `"face"`, `"fluid"`, ...)
        kind: &'static str,
        /// Requested index
        index: usize,
        /// Current arena length
        len: usize,
    },
    /// A face between these two cells already exists
    DuplicateFace(usize, usize),
    /// A face must connect two distinct cells
    SelfFace(usize),
    /// Step size that cannot advance the clock
    InvalidTimestep(f64),
    /// Buffer reservation failed during assembly
    Allocation(String),
}

impl SeepageError {
    /// Check `index < len`, producing [`SeepageError::IndexOutOfRange`] otherwise
    ///
    /// # Errors
    /// Returns `IndexOutOfRange` when the index is past the end of the arena.
    pub fn check_index(kind: &'static str, index: usize, len: usize) -> Result<(), Self> {
        if index < len {
            Ok(())
        } else {
            Err(SeepageError::IndexOutOfRange { kind, index, len })
        }
    }
}

impl fmt::Display for SeepageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeepageError::InvalidPore { v0, k } => {
                write!(f, "Invalid pore model: v0={v0} and k={k} must both be positive")
            }
            SeepageError::InvalidTable(msg) => write!(f, "Invalid table: {msg}"),
            SeepageError::InvalidFluid(msg) => write!(f, "Invalid fluid: {msg}"),
            SeepageError::InvalidReaction(msg) => write!(f, "Invalid reaction: {msg}"),
            SeepageError::InvalidSchedule(msg) => write!(f, "Invalid injector schedule: {msg}"),
            SeepageError::IndexOutOfRange { kind, index, len } => {
                write!(f, "{kind} index {index} out of range ({len} available)")
            }
            SeepageError::DuplicateFace(a, b) => {
                write!(f, "Face between cells {a} and {b} already exists")
            }
            SeepageError::SelfFace(cell) => write!(f, "Face cannot connect cell {cell} to itself"),
            SeepageError::InvalidTimestep(dt) => {
                write!(f, "Step size {dt} cannot advance the clock")
            }
            SeepageError::Allocation(msg) => write!(f, "Allocation failed: {msg}"),
        }
    }
}

impl std::error::Error for SeepageError {}

impl From<std::collections::TryReserveError> for SeepageError {
    fn from(err: std::collections::TryReserveError) -> Self {
        SeepageError::Allocation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_index() {
        assert!(SeepageError::check_index("cell", 2, 3).is_ok());
        let err = SeepageError::check_index("cell", 3, 3).unwrap_err();
        assert_eq!(
            err,
            SeepageError::IndexOutOfRange {
                kind: "cell",
                index: 3,
                len: 3
            }
        );
        assert_eq!(err.to_string(), "cell index 3 out of range (3 available)");
    }

    #[test]
    fn test_display_messages() {
        let err = SeepageError::InvalidPore { v0: 0.0, k: 1.0 };
        assert!(err.to_string().contains("v0=0"));
        assert_eq!(
            SeepageError::DuplicateFace(1, 2).to_string(),
            "Face between cells 1 and 2 already exists"
        );
    }
}
