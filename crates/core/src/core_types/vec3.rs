//! Vector type alias for cell positions and the gravity vector.

use nalgebra::Vector3;

/// 3D vector type for positions and body forces.
///
/// This is a simple alias for `nalgebra::Vector3<f64>`, used for cell centres,
/// the gravity vector and injector influence radii.
pub type Vec3 = Vector3<f64>;
