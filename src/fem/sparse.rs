//! Compressed sparse row matrices for the Galerkin systems.

/// A real matrix in compressed sparse row form.
///
/// Column indices are strictly increasing within each row. Built from
/// triplet lists with duplicate entries summed.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Builds a matrix from `(row, col, value)` triplets; duplicates are
    /// summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Self {
        let mut sorted: Vec<(usize, usize, f64)> = triplets.to_vec();
        sorted.sort_unstable_by_key(|&(r, c, _)| (r, c));

        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::with_capacity(sorted.len());
        let mut values = Vec::with_capacity(sorted.len());
        row_ptr.push(0);
        let mut current_row = 0;
        for &(r, c, v) in &sorted {
            debug_assert!(r < nrows && c < ncols, "triplet out of bounds");
            while current_row < r {
                row_ptr.push(col_idx.len());
                current_row += 1;
            }
            if col_idx.len() > row_ptr[current_row] && *col_idx.last().unwrap() == c {
                *values.last_mut().unwrap() += v;
            } else {
                col_idx.push(c);
                values.push(v);
            }
        }
        while current_row < nrows {
            row_ptr.push(col_idx.len());
            current_row += 1;
        }
        Self {
            nrows,
            ncols,
            row_ptr,
            col_idx,
            values,
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let span = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[span.clone()], &self.values[span])
    }

    /// Entry lookup by binary search within the row.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (cols, vals) = self.row(i);
        match cols.binary_search(&j) {
            Ok(pos) => vals[pos],
            Err(_) => 0.0,
        }
    }

    /// y = A x, overwriting `y`.
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.ncols);
        debug_assert_eq!(y.len(), self.nrows);
        for i in 0..self.nrows {
            let (cols, vals) = self.row(i);
            let mut sum = 0.0;
            for (&c, &v) in cols.iter().zip(vals) {
                sum += v * x[c];
            }
            y[i] = sum;
        }
    }

    /// A x as a fresh vector.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        let mut y = vec![0.0; self.nrows];
        self.mul_vec(x, &mut y);
        y
    }

    /// self + factor * other, merging the two sparsity patterns.
    pub fn add_scaled(&self, other: &CsrMatrix, factor: f64) -> CsrMatrix {
        assert_eq!(self.nrows, other.nrows);
        assert_eq!(self.ncols, other.ncols);
        let mut row_ptr = Vec::with_capacity(self.nrows + 1);
        let mut col_idx = Vec::with_capacity(self.nnz().max(other.nnz()));
        let mut values = Vec::with_capacity(self.nnz().max(other.nnz()));
        row_ptr.push(0);
        for i in 0..self.nrows {
            let (ac, av) = self.row(i);
            let (bc, bv) = other.row(i);
            let (mut p, mut q) = (0, 0);
            while p < ac.len() || q < bc.len() {
                let next_a = ac.get(p).copied().unwrap_or(usize::MAX);
                let next_b = bc.get(q).copied().unwrap_or(usize::MAX);
                if next_a < next_b {
                    col_idx.push(next_a);
                    values.push(av[p]);
                    p += 1;
                } else if next_b < next_a {
                    col_idx.push(next_b);
                    values.push(factor * bv[q]);
                    q += 1;
                } else {
                    col_idx.push(next_a);
                    values.push(av[p] + factor * bv[q]);
                    p += 1;
                    q += 1;
                }
            }
            row_ptr.push(col_idx.len());
        }
        CsrMatrix {
            nrows: self.nrows,
            ncols: self.ncols,
            row_ptr,
            col_idx,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsrMatrix {
        // [2 1 0]
        // [0 3 0]
        // [4 0 5]
        CsrMatrix::from_triplets(
            3,
            3,
            &[(0, 0, 2.0), (0, 1, 1.0), (1, 1, 3.0), (2, 0, 4.0), (2, 2, 5.0)],
        )
    }

    #[test]
    fn test_from_triplets_sums_duplicates() {
        let m = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (0, 0, 2.0), (1, 1, 4.0)]);
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.get(0, 0), 3.0);
        assert_eq!(m.get(1, 1), 4.0);
        assert_eq!(m.get(0, 1), 0.0);
    }

    #[test]
    fn test_mul_vec() {
        let m = sample();
        let y = m.apply(&[1.0, 2.0, 3.0]);
        assert_eq!(y, vec![4.0, 6.0, 19.0]);
    }

    #[test]
    fn test_add_scaled() {
        let a = sample();
        let b = CsrMatrix::from_triplets(3, 3, &[(0, 2, 1.0), (1, 1, 1.0)]);
        let c = a.add_scaled(&b, 2.0);
        assert_eq!(c.get(0, 0), 2.0);
        assert_eq!(c.get(0, 2), 2.0);
        assert_eq!(c.get(1, 1), 5.0);
        assert_eq!(c.get(2, 2), 5.0);
    }

    #[test]
    fn test_empty_rows() {
        let m = CsrMatrix::from_triplets(3, 3, &[(2, 2, 1.0)]);
        assert_eq!(m.row(0).0.len(), 0);
        assert_eq!(m.row(1).0.len(), 0);
        assert_eq!(m.get(2, 2), 1.0);
    }
}
