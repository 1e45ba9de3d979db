//! Cartogram pipelines: advect point sets by the gradient of a
//! time-evolving scalar field.
//!
//! Two engines share the same advection loop. The finite-element globe
//! steps the diffusion equation on a geodesic mesh and queries the
//! piecewise-linear gradient; the spectral globe evolves the harmonic
//! spectrum with the exact heat semigroup and reads the gradient from
//! synthesized partial-derivative grids. Both move points along
//! v = -grad u with explicit Euler and a geometrically growing step.

use crate::Point;
use crate::Vector;
use crate::fem::TimeDependentSolver;
use crate::geom::mesh::TriangularMesh;
use crate::geom::triangle::Integrator;
use crate::sht::{Synthesis, Workspace, analysis, harmonic_index};
use log::{debug, info};

/// Step schedule of the advection loop.
#[derive(Debug, Clone, Copy)]
pub struct AdvectionSchedule {
    /// First time step.
    pub time_initial: f64,
    /// Geometric growth factor applied after every step.
    pub time_ratio: f64,
    /// Total simulated time cap.
    pub time_max: f64,
    /// Stop once the field (or displacement) change falls below this.
    pub change_tolerance: f64,
}

impl Default for AdvectionSchedule {
    fn default() -> Self {
        Self {
            time_initial: 1e-4,
            time_ratio: 1.01,
            time_max: 50.0,
            change_tolerance: 1e-6,
        }
    }
}

/// Cartogram driver backed by the finite-element diffusion solver.
pub struct FiniteElementGlobe {
    solver: TimeDependentSolver,
    schedule: AdvectionSchedule,
}

impl FiniteElementGlobe {
    /// Builds the solver on `mesh` with zero forcing.
    pub fn new(mesh: &TriangularMesh, rule: Integrator) -> Self {
        let mut solver = TimeDependentSolver::new(mesh, rule);
        solver.set_forcing(|_| 0.0);
        Self {
            solver,
            schedule: AdvectionSchedule::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: AdvectionSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Sets the density field the cartogram equalizes.
    pub fn initialize<G>(&mut self, g: G)
    where
        G: Fn(&Point) -> f64,
    {
        self.solver.initialize(g);
    }

    /// Advects `points` until the field settles; returns the step count.
    pub fn transform(&mut self, points: &mut [Point]) -> usize {
        let schedule = self.schedule;
        let mut dt = schedule.time_initial;
        let mut cumulative = 0.0;
        let mut change = f64::MAX;
        let mut steps = 0;

        // Half-step priming so the first velocity sees a smoothed field.
        self.solver.advance(dt / 2.0);
        while cumulative < schedule.time_max && change > schedule.change_tolerance {
            let velocities = self.solver.velocity(points);
            for (p, v) in points.iter_mut().zip(&velocities) {
                *p = p.displace(&(*v * dt));
            }
            steps += 1;
            cumulative += dt;
            dt *= schedule.time_ratio;
            change = self.solver.advance(dt);
            if steps % 100 == 0 {
                debug!("advection step {steps}: t = {cumulative:.3}, change = {change:.3e}");
            }
        }
        info!("finite-element advection finished after {steps} steps (t = {cumulative:.3})");
        steps
    }

    pub fn solver(&self) -> &TimeDependentSolver {
        &self.solver
    }
}

/// Cartogram driver backed by the spectral transforms.
pub struct SpectralGlobe {
    workspace: Workspace,
    synthesis: Synthesis,
    harmonics: Vec<f64>,
    schedule: AdvectionSchedule,
}

impl SpectralGlobe {
    pub fn new(bandlimit: usize) -> Self {
        Self {
            workspace: Workspace::new(bandlimit),
            synthesis: Synthesis::new(bandlimit),
            harmonics: vec![0.0; bandlimit * bandlimit],
            schedule: AdvectionSchedule::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: AdvectionSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Samples the density on the Driscoll-Healy grid and analyzes it
    /// into the harmonic spectrum.
    pub fn initialize<G>(&mut self, g: G)
    where
        G: Fn(&Point) -> f64,
    {
        let n = self.workspace.samples();
        let mut data = vec![0.0; n * n];
        for j in 0..n {
            for k in 0..n {
                let p = Point::from_spherical(self.workspace.theta(j), self.workspace.phi(k));
                data[j * n + k] = g(&p);
            }
        }
        self.harmonics = analysis(&self.workspace, &data);
    }

    /// The spectrum after diffusing for time `t`: each harmonic decays
    /// by exp(-l (l + 1) t).
    fn decayed(&self, t: f64) -> Vec<f64> {
        let b = self.workspace.bandlimit();
        let mut h = self.harmonics.clone();
        for l in 0..b {
            let decay = (-(l as f64) * (l as f64 + 1.0) * t).exp();
            for m in -(l as isize)..=(l as isize) {
                h[harmonic_index(b, l, m)] *= decay;
            }
        }
        h
    }

    /// Bilinear sample of an N x N grid at (theta, phi), periodic in
    /// phi and clamped in theta.
    fn sample(&self, grid: &[f64], theta: f64, phi: f64) -> f64 {
        let n = self.workspace.samples();
        let nf = n as f64;
        let jf = (theta / (std::f64::consts::PI / nf) - 0.5).clamp(0.0, nf - 1.0);
        let kf = (phi.rem_euclid(2.0 * std::f64::consts::PI) * nf
            / (2.0 * std::f64::consts::PI)
            - 0.5)
            .rem_euclid(nf);
        let j0 = jf.floor() as usize;
        let j1 = (j0 + 1).min(n - 1);
        let k0 = kf.floor() as usize;
        let k1 = (k0 + 1) % n;
        let (tj, tk) = (jf - j0 as f64, kf - k0 as f64);
        let g = |j: usize, k: usize| grid[j * n + k];
        (1.0 - tj) * ((1.0 - tk) * g(j0, k0) + tk * g(j0, k1))
            + tj * ((1.0 - tk) * g(j1, k0) + tk * g(j1, k1))
    }

    /// v = -grad u at `p` from the two partial grids.
    fn velocity_at(&self, dtheta: &[f64], dphi: &[f64], p: &Point) -> Vector {
        let (theta, phi) = (p.p(), p.a());
        let (st, ct) = theta.sin_cos();
        let (sp, cp) = phi.sin_cos();
        let theta_hat = Vector::new(ct * cp, ct * sp, -st);
        let phi_hat = Vector::new(-sp, cp, 0.0);
        let du_dtheta = self.sample(dtheta, theta, phi);
        let mut v = theta_hat * (-du_dtheta);
        if st.abs() > 1e-9 {
            let du_dphi = self.sample(dphi, theta, phi);
            v += phi_hat * (-du_dphi / st);
        }
        v
    }

    /// Advects `points` under the spectrally evolved field; returns the
    /// step count.
    pub fn transform(&mut self, points: &mut [Point]) -> usize {
        let schedule = self.schedule;
        let mut dt = schedule.time_initial;
        let mut cumulative = dt / 2.0;
        let mut steps = 0;

        loop {
            let h = self.decayed(cumulative);
            let dtheta = self.synthesis.synthesis_dtheta(&self.workspace, &h);
            let dphi = self.synthesis.synthesis_dphi(&self.workspace, &h);
            let mut largest = 0.0_f64;
            for p in points.iter_mut() {
                let v = self.velocity_at(&dtheta, &dphi, p);
                largest = largest.max(v.length() * dt);
                *p = p.displace(&(v * dt));
            }
            steps += 1;
            cumulative += dt;
            dt *= schedule.time_ratio;
            if cumulative >= schedule.time_max || largest < schedule.change_tolerance {
                break;
            }
        }
        info!("spectral advection finished after {steps} steps");
        steps
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}
