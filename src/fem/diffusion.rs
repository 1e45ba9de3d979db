//! Steady-state and time-dependent solvers for the diffusion equation
//! du/dt - lapl u = f on the sphere.
//!
//! Time stepping is implicit Euler: each step solves
//! (A + M/dt) u_next = b + (M/dt) u by one BiCGSTAB solve. The velocity
//! field returned for advection is v = -grad u, the Fick's-law flux of
//! the diffusing quantity.

use crate::Point;
use crate::Vector;
use crate::fem::assembly::{load, mass, stiffness};
use crate::fem::solver::BiCgStab;
use crate::fem::sparse::CsrMatrix;
use crate::geom::mesh::TriangularMesh;
use crate::geom::triangle::Integrator;
use log::debug;

/// Solves the steady problem -lapl u = f directly.
///
/// The stiffness matrix is singular with the constants in its kernel;
/// for zero-mean forcing the iterative solve settles on one
/// representative solution.
pub struct SteadyStateSolver {
    mesh: TriangularMesh,
    stiffness: CsrMatrix,
    rule: Integrator,
    solution: Vec<f64>,
    iterations: usize,
    error: f64,
}

impl SteadyStateSolver {
    pub fn new(mesh: &TriangularMesh, rule: Integrator) -> Self {
        let stiffness = stiffness(mesh, rule);
        Self {
            mesh: mesh.clone(),
            stiffness,
            rule,
            solution: Vec::new(),
            iterations: 0,
            error: 0.0,
        }
    }

    /// Assembles the load vector of `f` and solves for the nodal field.
    pub fn solve<F>(&mut self, f: F) -> &[f64]
    where
        F: Fn(&Point) -> f64,
    {
        let b = load(&self.mesh, f, self.rule);
        let mut solver = BiCgStab::new(&self.stiffness);
        self.solution = solver.solve(&self.stiffness, &b);
        self.iterations = solver.iterations();
        self.error = solver.error();
        debug!(
            "steady solve: {} iterations, relative residual {:.3e}",
            self.iterations, self.error
        );
        &self.solution
    }

    pub fn solution(&self) -> &[f64] {
        &self.solution
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn error(&self) -> f64 {
        self.error
    }
}

/// Implicit-Euler integrator for the time-dependent diffusion problem.
pub struct TimeDependentSolver {
    mesh: TriangularMesh,
    stiffness: CsrMatrix,
    mass: CsrMatrix,
    load: Vec<f64>,
    solution: Vec<f64>,
    rule: Integrator,
    iterations: usize,
    error: f64,
}

impl TimeDependentSolver {
    /// Assembles the stiffness and mass operators for `mesh`. The
    /// forcing defaults to zero and the state to the zero field.
    pub fn new(mesh: &TriangularMesh, rule: Integrator) -> Self {
        let a = stiffness(mesh, rule);
        let m = mass(mesh, rule);
        let n = mesh.vertices().len();
        Self {
            mesh: mesh.clone(),
            stiffness: a,
            mass: m,
            load: vec![0.0; n],
            solution: vec![0.0; n],
            rule,
            iterations: 0,
            error: 0.0,
        }
    }

    /// Sets the forcing term by assembling its load vector.
    pub fn set_forcing<F>(&mut self, f: F)
    where
        F: Fn(&Point) -> f64,
    {
        self.load = load(&self.mesh, f, self.rule);
    }

    /// Sets the initial condition by sampling `g` at the vertices.
    pub fn initialize<G>(&mut self, g: G)
    where
        G: Fn(&Point) -> f64,
    {
        self.solution = self.mesh.vertices().iter().map(|p| g(p)).collect();
        self.mesh.set_values(self.solution.clone());
    }

    /// Advances one implicit-Euler step of size `dt` and returns the
    /// Euclidean norm of the nodal change.
    pub fn advance(&mut self, dt: f64) -> f64 {
        let lhs = self.stiffness.add_scaled(&self.mass, 1.0 / dt);
        let mut rhs = self.mass.apply(&self.solution);
        for (r, b) in rhs.iter_mut().zip(&self.load) {
            *r = *r / dt + b;
        }
        let mut solver = BiCgStab::new(&lhs);
        let next = solver.solve(&lhs, &rhs);
        self.iterations = solver.iterations();
        self.error = solver.error();

        let change = self
            .solution
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        self.solution = next;
        self.mesh.set_values(self.solution.clone());
        change
    }

    /// Advection velocities v = -grad u at the query points.
    ///
    /// Points that cannot be located (never, on a closed mesh) get the
    /// zero vector.
    pub fn velocity(&self, points: &[Point]) -> Vec<Vector> {
        points.iter().map(|p| -self.mesh.gradient(p)).collect()
    }

    pub fn solution(&self) -> &[f64] {
        &self.solution
    }

    pub fn mesh(&self) -> &TriangularMesh {
        &self.mesh
    }

    /// Iterations of the last step's linear solve.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Relative residual of the last step's linear solve.
    pub fn error(&self) -> f64 {
        self.error
    }
}
