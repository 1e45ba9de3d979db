//! Discrete spherical-harmonic transforms on the Driscoll-Healy grid.
//!
//! The grid at bandlimit B samples colatitudes theta_j = pi (j + 1/2) / N
//! and azimuths phi_k = 2 pi (k + 1/2) / N with N = 2B. A precomputed
//! [`Workspace`] holds the quadrature weights and normalized associated
//! Legendre tables; [`analysis`] and [`Synthesis`] perform the forward
//! and inverse transforms, the latter including the spectral partials
//! with respect to both angles.

pub mod legendre;
pub mod transform;
pub mod workspace;

pub use legendre::{assoc_index, legendre, normalized_triangle, spherical_harmonic};
pub use transform::{Synthesis, analysis, evaluate, harmonic_index};
pub use workspace::Workspace;

/// Bandlimit at or above which the independent per-task and per-row
/// loops dispatch to the rayon thread pool.
pub const PARALLEL_BANDLIMIT: usize = 128;
