//! Iterative sparse solver: BiCGSTAB with an ILUT preconditioner.
//!
//! The preconditioner is a dual-threshold incomplete LU: entries below a
//! relative drop tolerance are discarded and each factor row keeps at
//! most a fixed number of fill entries. The solver reports its iteration
//! count and a relative-residual error estimate; failing to converge is
//! observable through them, not fatal.

use crate::fem::sparse::CsrMatrix;
use log::warn;
use std::collections::BTreeSet;

/// Knobs of the iterative solve.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Relative residual target.
    pub tolerance: f64,
    /// Iteration cap; defaults to twice the system size.
    pub max_iterations: Option<usize>,
    /// ILUT relative drop tolerance.
    pub drop_tolerance: f64,
    /// ILUT fill cap per factor row and side.
    pub fill: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: None,
            drop_tolerance: 1e-12,
            fill: 10,
        }
    }
}

/// Incomplete LU factors with dual-threshold dropping.
#[derive(Debug, Clone)]
pub struct IlutPreconditioner {
    lower_cols: Vec<Vec<usize>>,
    lower_vals: Vec<Vec<f64>>,
    upper_cols: Vec<Vec<usize>>,
    upper_vals: Vec<Vec<f64>>,
}

impl IlutPreconditioner {
    /// Row-wise IKJ factorization of `a`.
    pub fn new(a: &CsrMatrix, drop_tolerance: f64, fill: usize) -> Self {
        let n = a.nrows();
        let mut lower_cols = Vec::with_capacity(n);
        let mut lower_vals = Vec::with_capacity(n);
        let mut upper_cols: Vec<Vec<usize>> = Vec::with_capacity(n);
        let mut upper_vals: Vec<Vec<f64>> = Vec::with_capacity(n);

        let mut work = vec![0.0; n];
        let mut active: BTreeSet<usize> = BTreeSet::new();

        for i in 0..n {
            let (cols, vals) = a.row(i);
            let row_norm = vals.iter().map(|v| v * v).sum::<f64>().sqrt();
            let tau = drop_tolerance * row_norm;
            for (&c, &v) in cols.iter().zip(vals) {
                work[c] = v;
                active.insert(c);
            }

            // Eliminate against the previous pivot rows in column order.
            let mut lower: Vec<(usize, f64)> = Vec::new();
            loop {
                let k = match active.range(..i).next() {
                    Some(&k) => k,
                    None => break,
                };
                active.remove(&k);
                let value = work[k] / upper_vals[k][0];
                work[k] = 0.0;
                if value.abs() <= tau {
                    continue;
                }
                lower.push((k, value));
                for (&c, &uv) in upper_cols[k].iter().zip(&upper_vals[k]).skip(1) {
                    if active.insert(c) {
                        work[c] = 0.0;
                    }
                    work[c] -= value * uv;
                }
            }

            // Keep only the largest fill entries of the L part.
            if lower.len() > fill {
                lower.sort_unstable_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
                lower.truncate(fill);
                lower.sort_unstable_by_key(|&(c, _)| c);
            }
            lower_cols.push(lower.iter().map(|&(c, _)| c).collect());
            lower_vals.push(lower.iter().map(|&(_, v)| v).collect());

            // The U part keeps the diagonal plus the largest fill entries.
            let mut diagonal = work[i];
            active.remove(&i);
            work[i] = 0.0;
            if diagonal.abs() <= tau.max(f64::MIN_POSITIVE) {
                // Small-pivot floor keeps the sweeps finite on (nearly)
                // singular systems.
                diagonal = if diagonal < 0.0 { -1.0 } else { 1.0 } * tau.max(1e-12);
            }
            let mut upper: Vec<(usize, f64)> = Vec::new();
            for &c in active.iter() {
                if work[c].abs() > tau {
                    upper.push((c, work[c]));
                }
            }
            for &c in active.iter() {
                work[c] = 0.0;
            }
            active.clear();
            if upper.len() > fill {
                upper.sort_unstable_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
                upper.truncate(fill);
                upper.sort_unstable_by_key(|&(c, _)| c);
            }
            let mut cols_row = Vec::with_capacity(upper.len() + 1);
            let mut vals_row = Vec::with_capacity(upper.len() + 1);
            cols_row.push(i);
            vals_row.push(diagonal);
            cols_row.extend(upper.iter().map(|&(c, _)| c));
            vals_row.extend(upper.iter().map(|&(_, v)| v));
            upper_cols.push(cols_row);
            upper_vals.push(vals_row);
        }

        Self {
            lower_cols,
            lower_vals,
            upper_cols,
            upper_vals,
        }
    }

    /// z = (L U)^{-1} r by forward and backward substitution.
    pub fn apply(&self, r: &[f64], z: &mut [f64]) {
        let n = r.len();
        // L y = r with a unit diagonal.
        for i in 0..n {
            let mut sum = r[i];
            for (&c, &v) in self.lower_cols[i].iter().zip(&self.lower_vals[i]) {
                sum -= v * z[c];
            }
            z[i] = sum;
        }
        // U x = y.
        for i in (0..n).rev() {
            let mut sum = z[i];
            for (&c, &v) in self.upper_cols[i].iter().zip(&self.upper_vals[i]).skip(1) {
                sum -= v * z[c];
            }
            z[i] = sum / self.upper_vals[i][0];
        }
    }
}

/// Biconjugate-gradient-stabilized solver bound to one factorized matrix.
pub struct BiCgStab {
    config: SolverConfig,
    preconditioner: IlutPreconditioner,
    iterations: usize,
    error: f64,
}

impl BiCgStab {
    pub fn new(a: &CsrMatrix) -> Self {
        Self::with_config(a, SolverConfig::default())
    }

    pub fn with_config(a: &CsrMatrix, config: SolverConfig) -> Self {
        let preconditioner = IlutPreconditioner::new(a, config.drop_tolerance, config.fill);
        Self {
            config,
            preconditioner,
            iterations: 0,
            error: 0.0,
        }
    }

    /// Iterations spent by the last solve.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Relative residual reached by the last solve.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Approximates `A x = b` from a zero initial guess. Returns the
    /// best-effort solution; convergence is reported through
    /// [`iterations`](Self::iterations) and [`error`](Self::error).
    pub fn solve(&mut self, a: &CsrMatrix, b: &[f64]) -> Vec<f64> {
        let n = b.len();
        let max_iterations = self.config.max_iterations.unwrap_or(2 * n);
        let b_norm = norm(b);
        let mut x = vec![0.0; n];
        self.iterations = 0;
        self.error = 0.0;
        if b_norm < f64::MIN_POSITIVE {
            return x;
        }

        // r = b - A x = b for the zero guess; r0 is the shadow residual.
        let mut r = b.to_vec();
        let r0 = r.clone();
        let mut rho = 1.0;
        let mut alpha = 1.0;
        let mut omega = 1.0;
        let mut p = vec![0.0; n];
        let mut v = vec![0.0; n];
        let mut ph = vec![0.0; n];
        let mut sh = vec![0.0; n];
        let mut t = vec![0.0; n];
        let breakdown = 1e-30;

        for iteration in 0..max_iterations {
            let rho_next = dot(&r0, &r);
            if rho_next.abs() < breakdown {
                break;
            }
            if iteration == 0 {
                p.copy_from_slice(&r);
            } else {
                let beta = (rho_next / rho) * (alpha / omega);
                for i in 0..n {
                    p[i] = r[i] + beta * (p[i] - omega * v[i]);
                }
            }
            rho = rho_next;

            self.preconditioner.apply(&p, &mut ph);
            a.mul_vec(&ph, &mut v);
            let r0v = dot(&r0, &v);
            if r0v.abs() < breakdown {
                break;
            }
            alpha = rho / r0v;

            // s = r - alpha v, reusing r.
            for i in 0..n {
                r[i] -= alpha * v[i];
            }
            if norm(&r) <= self.config.tolerance * b_norm {
                for i in 0..n {
                    x[i] += alpha * ph[i];
                }
                self.iterations = iteration + 1;
                self.error = norm(&r) / b_norm;
                return x;
            }

            self.preconditioner.apply(&r, &mut sh);
            a.mul_vec(&sh, &mut t);
            let tt = dot(&t, &t);
            omega = if tt.abs() < breakdown {
                1.0
            } else {
                dot(&t, &r) / tt
            };
            if omega.abs() < breakdown {
                break;
            }

            for i in 0..n {
                x[i] += alpha * ph[i] + omega * sh[i];
                r[i] -= omega * t[i];
            }

            self.iterations = iteration + 1;
            self.error = norm(&r) / b_norm;
            if self.error <= self.config.tolerance {
                return x;
            }
        }

        if self.error > self.config.tolerance {
            warn!(
                "BiCGSTAB stopped after {} iterations at relative residual {:.3e}",
                self.iterations, self.error
            );
        }
        x
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}
