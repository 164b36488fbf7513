//! Seepage Engine Core Library
//!
//! A finite-volume simulator for coupled fluid flow, heat transport and chemical
//! reaction in porous and fractured media. The model is an unstructured cell-face
//! mesh: cells own their pore model, fluids and attributes, faces connect exactly
//! two cells and carry the conductance used by the implicit solvers.
//!
//! ## Engine Overview
//!
//! One simulation step runs the following phases in order:
//! - Injectors (scheduled mass and heat sources)
//! - Density/viscosity relaxation toward the property tables
//! - Implicit pressure solve and upwind multiphase transport
//! - Capillary exchange between wetting and non-wetting fluids
//! - Implicit heat conduction and fluid-rock heat exchange
//! - Stoichiometric reaction kinetics with heat release
//! - Adaptive time-step re-estimation
//!
//! ```rust
//! use seepage_core::{FluDef, PoreModel, Seepage, Vec3};
//!
//! let mut model = Seepage::default();
//! model.add_fludef(FluDef::constant("water", 1000.0, 1.0e-3, 4200.0).unwrap());
//! let a = model.add_cell(Vec3::zeros(), PoreModel::new(1.0, 1.0e-9).unwrap());
//! let b = model.add_cell(Vec3::new(1.0, 0.0, 0.0), PoreModel::new(1.0, 1.0e-9).unwrap());
//! model.add_face(a, b, 1.0e-6).unwrap();
//! model.fill(a, 1.0e6, &[1.0.into()]).unwrap();
//! model.fill(b, 0.0, &[1.0.into()]).unwrap();
//! let report = model.iterate(1.0).unwrap();
//! assert!(report.flow.solve.converged);
//! ```

// Core types and utilities
pub mod core_types;
pub mod error;
pub mod fluid;
pub mod mesh;
mod parallel;

// Physics and solvers
pub mod injector;
pub mod reaction;
pub mod simulation;
pub mod solver;

pub use core_types::{Attrs, Axis, Interp1, Interp2, Vec3};
pub use error::SeepageError;
pub use fluid::{FluDef, Fluid, LeafDef, LeafFluid, Saturation};
pub use injector::{Injection, Injector, InjectorMode, InjectorTarget};
pub use mesh::{Cell, Face, PoreModel, Topology};
pub use reaction::{Inhibitor, Reaction, ReactionComponent, ReactionSummary};
pub use simulation::{
    AttrKeys, CellSnapshot, Clock, PersistenceError, PropertyUpdate, Seepage, SeepageConfig,
    Snapshot, StepReport,
};
pub use solver::{
    pcg_solve, CapillaryRule, FlowReport, HeatExchangeBinding, KrPolicy, LinearOperator,
    PhaseTimes, SolveReport, SolverConfig, SparseMatrix, ThermalBinding, ThermalReport,
    TimestepController,
};
