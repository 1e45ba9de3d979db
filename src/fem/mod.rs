//! Finite-element engine: sparse operators, the BiCGSTAB/ILUT solver,
//! and the diffusion time-stepper over geodesic triangular meshes.

pub mod assembly;
pub mod diffusion;
pub mod solver;
pub mod sparse;

pub use assembly::{load, mass, stiffness};
pub use diffusion::{SteadyStateSolver, TimeDependentSolver};
pub use solver::{BiCgStab, IlutPreconditioner, SolverConfig};
pub use sparse::CsrMatrix;
