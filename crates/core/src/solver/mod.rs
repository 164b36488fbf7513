//! Numerical solvers of the seepage engine
//!
//! This module holds the per-phase kernels driven by [`crate::Seepage`]:
//!
//! - [`linear`]: the Jacobi-preconditioned conjugate-gradient primitive
//! - [`flow`]: implicit pressure solve and upwind multiphase transport
//! - [`thermal`]: implicit heat conduction on a cell scalar
//! - [`capillary`]: counter-current wetting/non-wetting exchange
//! - [`heat_exchange`]: fluid-rock temperature relaxation
//! - [`timestep`]: adaptive dt recommendation
//!
//! Kernels take the model arenas as slices and honour the `parallel` switch
//! of [`crate::SeepageConfig`].
//!
//! # Example
//!
//! ```rust
//! use seepage_core::solver::{pcg_solve, SolverConfig, SparseMatrix};
//!
//! let mut a = SparseMatrix::zeros(2).unwrap();
//! a.add_diagonal(0, 1.0);
//! a.add_diagonal(1, 1.0);
//! a.add_coupling(0, 1, 1.0);
//! let (x, report) = pcg_solve(&a, &[1.0, 1.0], vec![0.0; 2], &SolverConfig::default(), false);
//! assert!(report.converged);
//! assert!((x[0] - 1.0).abs() < 1e-9);
//! ```

pub mod capillary;
pub mod flow;
pub mod heat_exchange;
mod kr;
pub mod linear;
pub mod profiler;
pub mod thermal;
pub mod timestep;
mod transfer;

// Re-exports
pub use capillary::CapillaryRule;
pub use flow::FlowReport;
pub use heat_exchange::HeatExchangeBinding;
pub use kr::KrPolicy;
pub use linear::{pcg_solve, LinearOperator, SolveReport, SolverConfig, SparseMatrix};
pub use profiler::{PhaseTimes, ProfilerScope};
pub use thermal::{ThermalBinding, ThermalReport};
pub use timestep::TimestepController;

pub(crate) use flow::iterate_flow;
pub(crate) use heat_exchange::exchange_heat;
pub(crate) use thermal::iterate_thermal;
