//! Precomputed workspace for the discrete spherical-harmonic transforms.
//!
//! All tables are keyed by the bandlimit B with grid size N = 2B per
//! axis. The workspace is immutable after construction and can be shared
//! across threads by reference.

use crate::sht::PARALLEL_BANDLIMIT;
use crate::sht::legendre::{assoc_index, legendre_column};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Precomputed tables for bandlimit B on the Driscoll-Healy grid.
///
/// The associated Legendre values are held twice: the "rank" table stores
/// one colatitude vector per (l, m) pair, which is what the forward
/// transform contracts against, and the "file" table stores one
/// (m-major) triangle per colatitude, which is what the inverse
/// transform walks. A third table holds the theta-derivatives in the
/// file layout for the spectral partial.
#[derive(Debug, Clone)]
pub struct Workspace {
    bandlimit: usize,
    samples: usize,
    weights: Vec<f64>,
    cos_theta: Vec<f64>,
    sin_theta: Vec<f64>,
    cos_azimuth: Vec<Vec<f64>>,
    sin_azimuth: Vec<Vec<f64>>,
    rank: Vec<Vec<f64>>,
    file: Vec<Vec<f64>>,
    dfile: Vec<Vec<f64>>,
}

impl Workspace {
    /// Builds the workspace for bandlimit `bandlimit`.
    ///
    /// Construction cost is dominated by the quadrature-weight solve and
    /// the Legendre recurrences; loops over independent indices run in
    /// parallel above the [`PARALLEL_BANDLIMIT`] threshold.
    pub fn new(bandlimit: usize) -> Self {
        assert!(bandlimit >= 1, "bandlimit must be at least 1");
        let b = bandlimit;
        let n = 2 * b;
        let parallel = b >= PARALLEL_BANDLIMIT;

        let cos_theta: Vec<f64> = (0..n)
            .map(|j| (PI / n as f64 * (j as f64 + 0.5)).cos())
            .collect();
        let sin_theta: Vec<f64> = (0..n)
            .map(|j| (PI / n as f64 * (j as f64 + 0.5)).sin())
            .collect();

        // Driscoll-Healy weights solve the ordinary-Legendre system
        // sum_j P_l(x_j) w_j = (2 pi / B) delta_{l,0} for 0 <= l < N.
        let columns: Vec<Vec<f64>> = if parallel {
            cos_theta.par_iter().map(|&x| legendre_column(n, x)).collect()
        } else {
            cos_theta.iter().map(|&x| legendre_column(n, x)).collect()
        };
        let mut system = vec![vec![0.0; n]; n];
        for (j, column) in columns.iter().enumerate() {
            for (l, &p) in column.iter().enumerate() {
                system[l][j] = p;
            }
        }
        let mut rhs = vec![0.0; n];
        rhs[0] = 2.0 * PI / b as f64;
        let weights = solve_dense(system, rhs);

        // Azimuth sinusoids cos(m phi_k), sin(m phi_k) for 1 <= m < B.
        let phi: Vec<f64> = (0..n)
            .map(|k| 2.0 * PI * (k as f64 + 0.5) / n as f64)
            .collect();
        let cos_azimuth: Vec<Vec<f64>> = (1..b)
            .map(|m| phi.iter().map(|&p| (m as f64 * p).cos()).collect())
            .collect();
        let sin_azimuth: Vec<Vec<f64>> = (1..b)
            .map(|m| phi.iter().map(|&p| (m as f64 * p).sin()).collect())
            .collect();

        // Diagonal ranks ~P_{m,m} chain sequentially in m.
        let mut diagonal: Vec<Vec<f64>> = Vec::with_capacity(b);
        diagonal.push(vec![1.0 / (4.0 * PI).sqrt(); n]);
        for l in 0..b.saturating_sub(1) {
            let delta = if l == 0 { 1.0 } else { 0.0 };
            let coefficient = ((1.0 + delta) * (l as f64 + 1.5) / (l as f64 + 1.0)).sqrt();
            let next: Vec<f64> = (0..n)
                .map(|j| coefficient * sin_theta[j] * diagonal[l][j])
                .collect();
            diagonal.push(next);
        }

        // The m = 0 column comes from the normalized ordinary Legendres.
        let zero_column: Vec<Vec<f64>> = (0..b)
            .map(|l| {
                let q = ((2 * l + 1) as f64 / (4.0 * PI)).sqrt();
                (0..n).map(|j| q * columns[j][l]).collect()
            })
            .collect();

        // Columns of order m >= 1 (degrees m..B-1) are independent given
        // the diagonal: off-diagonal seed, then the horizontal raise.
        let make_column = |m: usize| -> Vec<Vec<f64>> {
            let mut column = Vec::with_capacity(b - m);
            column.push(diagonal[m].clone());
            if m + 1 < b {
                let coefficient = (2.0 * m as f64 + 3.0).sqrt();
                let seed: Vec<f64> = (0..n)
                    .map(|j| coefficient * cos_theta[j] * column[0][j])
                    .collect();
                column.push(seed);
            }
            for l in m + 1..b.saturating_sub(1) {
                let (lf, mf) = (l as f64, m as f64);
                let c_l = ((2.0 * lf + 3.0) * (2.0 * lf + 1.0)
                    / ((lf + 1.0 - mf) * (lf + 1.0 + mf)))
                    .sqrt();
                let c_lm1 = ((lf + 1.5) / (lf - 0.5) * (lf + mf) / (lf + 1.0 + mf)
                    * (lf - mf)
                    / (lf + 1.0 - mf))
                    .sqrt();
                let prev = &column[l - m];
                let prev2 = &column[l - m - 1];
                let next: Vec<f64> = (0..n)
                    .map(|j| c_l * cos_theta[j] * prev[j] - c_lm1 * prev2[j])
                    .collect();
                column.push(next);
            }
            column
        };
        let tail_columns: Vec<Vec<Vec<f64>>> = if parallel {
            (1..b).into_par_iter().map(make_column).collect()
        } else {
            (1..b).map(make_column).collect()
        };
        let mut order_columns = Vec::with_capacity(b);
        order_columns.push(zero_column);
        order_columns.extend(tail_columns);

        // Rank table: one colatitude vector per (l, m), l-major.
        let mut rank = vec![Vec::new(); b * (b + 1) / 2];
        for (m, column) in order_columns.iter().enumerate() {
            for (i, values) in column.iter().enumerate() {
                let l = m + i;
                rank[l * (l + 1) / 2 + m] = values.clone();
            }
        }

        // File table: the transpose, one m-major triangle per colatitude.
        let file_size = b * (b + 1) / 2;
        let make_file = |j: usize| -> Vec<f64> {
            let mut file = vec![0.0; file_size];
            for m in 0..b {
                for l in m..b {
                    file[assoc_index(b, l, m)] = rank[l * (l + 1) / 2 + m][j];
                }
            }
            file
        };
        let file: Vec<Vec<f64>> = if parallel {
            (0..n).into_par_iter().map(make_file).collect()
        } else {
            (0..n).map(make_file).collect()
        };

        // Theta-derivative files from the closed forms.
        let make_dfile = |j: usize| -> Vec<f64> {
            let mut dfile = vec![0.0; file_size];
            let (x, y) = (cos_theta[j], sin_theta[j]);
            let values = &file[j];
            for m in 0..b {
                for l in m.max(1)..b {
                    let (lf, mf) = (l as f64, m as f64);
                    dfile[assoc_index(b, l, m)] = if l > m {
                        let d = ((lf + 0.5) / (lf - 0.5) * ((lf - mf) * (lf + mf))).sqrt();
                        (x * lf * values[assoc_index(b, l, m)]
                            - d * values[assoc_index(b, l - 1, m)])
                            / y
                    } else {
                        let delta = if l == 1 { 1.0 } else { 0.0 };
                        let e = ((1.0 + delta) * 2.0 * lf).sqrt();
                        e * values[assoc_index(b, l, l - 1)]
                            - lf * x / y * values[assoc_index(b, l, l)]
                    };
                }
            }
            dfile
        };
        let dfile: Vec<Vec<f64>> = if parallel {
            (0..n).into_par_iter().map(make_dfile).collect()
        } else {
            (0..n).map(make_dfile).collect()
        };

        Self {
            bandlimit,
            samples: n,
            weights,
            cos_theta,
            sin_theta,
            cos_azimuth,
            sin_azimuth,
            rank,
            file,
            dfile,
        }
    }

    pub fn bandlimit(&self) -> usize {
        self.bandlimit
    }

    /// Grid size per axis, N = 2B.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Driscoll-Healy quadrature weights, one per colatitude row.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn cos_theta(&self) -> &[f64] {
        &self.cos_theta
    }

    pub fn sin_theta(&self) -> &[f64] {
        &self.sin_theta
    }

    /// cos(m phi_k) over the azimuth grid, for 1 <= m < B.
    pub fn cos_azimuth(&self, m: usize) -> &[f64] {
        &self.cos_azimuth[m - 1]
    }

    /// sin(m phi_k) over the azimuth grid, for 1 <= m < B.
    pub fn sin_azimuth(&self, m: usize) -> &[f64] {
        &self.sin_azimuth[m - 1]
    }

    /// ~P_{l,m}(cos theta_j) over all j, for one (l, m).
    pub fn rank(&self, l: usize, m: usize) -> &[f64] {
        &self.rank[l * (l + 1) / 2 + m]
    }

    /// The (m-major) triangle of ~P_{l,m}(cos theta_j) at colatitude j;
    /// index with [`assoc_index`].
    pub fn file(&self, j: usize) -> &[f64] {
        &self.file[j]
    }

    /// The triangle of d~P_{l,m}/dtheta at colatitude j.
    pub fn dfile(&self, j: usize) -> &[f64] {
        &self.dfile[j]
    }

    /// Colatitude of grid row j.
    pub fn theta(&self, j: usize) -> f64 {
        PI / self.samples as f64 * (j as f64 + 0.5)
    }

    /// Azimuth of grid column k.
    pub fn phi(&self, k: usize) -> f64 {
        2.0 * PI * (k as f64 + 0.5) / self.samples as f64
    }
}

/// Solves the dense system `A x = b` by Gaussian elimination with
/// partial pivoting. `A` is row-major and consumed.
fn solve_dense(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_val = a[col][col].abs();
        for r in (col + 1)..n {
            let v = a[r][col].abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = r;
            }
        }
        if pivot_row != col {
            a.swap(pivot_row, col);
            b.swap(pivot_row, col);
        }
        let pivot = a[col][col];
        for r in (col + 1)..n {
            let factor = a[r][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            a[r][col] = 0.0;
            for c in (col + 1)..n {
                a[r][c] -= factor * a[col][c];
            }
            b[r] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut rhs = b[i];
        for j in (i + 1)..n {
            rhs -= a[i][j] * x[j];
        }
        x[i] = rhs / a[i][i];
    }
    x
}
