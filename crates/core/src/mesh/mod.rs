//! Cell/face mesh state
//!
//! Cells and faces live in arenas owned by the model and refer to each other
//! by index only. The [`Topology`] keeps the adjacency needed by the solvers.

mod cell;
mod face;
mod topology;

pub use cell::{Cell, PoreModel};
pub use face::Face;
pub use topology::Topology;
