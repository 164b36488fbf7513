//! Core types and utilities

pub mod attributes;
pub mod interp;
pub mod vec3;

pub use attributes::Attrs;
pub use interp::{Axis, Interp1, Interp2};
pub use vec3::Vec3;
