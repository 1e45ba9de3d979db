//! Legendre polynomials and unit-orthonormal associated Legendre values.
//!
//! The normalization is q_{l,m} = sqrt((2l+1)/(4 pi) * (l-m)!/(l+m)!), so
//! that the real spherical harmonics built from these values are
//! orthonormal over the sphere. No Condon-Shortley phase is applied.

use std::f64::consts::PI;

/// Ordinary Legendre polynomial P_l(x) by the three-term recurrence.
pub fn legendre(l: usize, x: f64) -> f64 {
    if l == 0 {
        return 1.0;
    }
    let (mut p0, mut p1) = (1.0, x);
    for k in 1..l {
        let k = k as f64;
        let next = ((2.0 * k + 1.0) * x * p1 - k * p0) / (k + 1.0);
        p0 = p1;
        p1 = next;
    }
    p1
}

/// P_0(x) .. P_{count-1}(x) in one recurrence chain.
pub(crate) fn legendre_column(count: usize, x: f64) -> Vec<f64> {
    let mut column = Vec::with_capacity(count);
    if count == 0 {
        return column;
    }
    column.push(1.0);
    if count == 1 {
        return column;
    }
    column.push(x);
    for k in 1..count - 1 {
        let kf = k as f64;
        let next = ((2.0 * kf + 1.0) * x * column[k] - kf * column[k - 1]) / (kf + 1.0);
        column.push(next);
    }
    column
}

/// Position of degree `l`, order `m` in the m-major triangular layout
/// used by the per-colatitude "file" tables: all orders m in increasing
/// order, degrees l = m..B-1 within each.
pub fn assoc_index(bandlimit: usize, l: usize, m: usize) -> usize {
    (2 * bandlimit + 1 - m) * m / 2 + (l - m)
}

/// The full triangle of normalized associated Legendre values
/// ~P_{l,m}(cos theta) for 0 <= m <= l < B, in the layout of
/// [`assoc_index`].
///
/// Uses the same three recurrences as the precomputed workspace: the
/// diagonal, the first off-diagonal, and the horizontal degree raise.
pub fn normalized_triangle(bandlimit: usize, theta: f64) -> Vec<f64> {
    let b = bandlimit;
    let (x, y) = (theta.cos(), theta.sin());
    let mut values = vec![0.0; b * (b + 1) / 2];

    // Order zero from the ordinary Legendre polynomials.
    let ordinary = legendre_column(b, x);
    for (l, p) in ordinary.iter().enumerate() {
        let q = ((2 * l + 1) as f64 / (4.0 * PI)).sqrt();
        values[assoc_index(b, l, 0)] = q * p;
    }

    // Diagonal: ~P_{l+1,l+1} from ~P_{l,l}.
    for l in 0..b.saturating_sub(1) {
        let delta = if l == 0 { 1.0 } else { 0.0 };
        let coefficient = ((1.0 + delta) * (l as f64 + 1.5) / (l as f64 + 1.0)).sqrt();
        values[assoc_index(b, l + 1, l + 1)] =
            coefficient * y * values[assoc_index(b, l, l)];
    }

    // First off-diagonal: ~P_{l+1,l} from ~P_{l,l} (m = 0 already done).
    for l in 1..b.saturating_sub(1) {
        let coefficient = (2.0 * l as f64 + 3.0).sqrt();
        values[assoc_index(b, l + 1, l)] = coefficient * x * values[assoc_index(b, l, l)];
    }

    // Horizontal: raise the degree at fixed order.
    for m in 1..b.saturating_sub(1) {
        for l in m + 1..b - 1 {
            let (lf, mf) = (l as f64, m as f64);
            let c_l = ((2.0 * lf + 3.0) * (2.0 * lf + 1.0)
                / ((lf + 1.0 - mf) * (lf + 1.0 + mf)))
                .sqrt();
            let c_lm1 = ((lf + 1.5) / (lf - 0.5) * (lf + mf) / (lf + 1.0 + mf) * (lf - mf)
                / (lf + 1.0 - mf))
                .sqrt();
            values[assoc_index(b, l + 1, m)] = c_l * x * values[assoc_index(b, l, m)]
                - c_lm1 * values[assoc_index(b, l - 1, m)];
        }
    }

    values
}

/// Real spherical harmonic Y_{l,m}(theta, phi): the normalized associated
/// Legendre value times cos(m phi) for m >= 0, sin(|m| phi) for m < 0.
pub fn spherical_harmonic(l: usize, m: isize, theta: f64, phi: f64) -> f64 {
    let triangle = normalized_triangle(l + 1, theta);
    let value = triangle[assoc_index(l + 1, l, m.unsigned_abs())];
    if m >= 0 {
        value * (m as f64 * phi).cos()
    } else {
        value * (m.unsigned_abs() as f64 * phi).sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legendre_low_orders() {
        for &x in &[-0.9, -0.3, 0.0, 0.5, 1.0] {
            assert!((legendre(0, x) - 1.0).abs() < 1e-15);
            assert!((legendre(1, x) - x).abs() < 1e-15);
            assert!((legendre(2, x) - 0.5 * (3.0 * x * x - 1.0)).abs() < 1e-14);
            assert!(
                (legendre(3, x) - 0.5 * (5.0 * x * x * x - 3.0 * x)).abs() < 1e-14
            );
        }
    }

    #[test]
    fn test_legendre_column_matches_scalar() {
        let column = legendre_column(8, 0.37);
        for (l, &p) in column.iter().enumerate() {
            assert!((p - legendre(l, 0.37)).abs() < 1e-14);
        }
    }

    #[test]
    fn test_assoc_index_walks_the_triangle() {
        let b = 5;
        let mut expected = 0;
        for m in 0..b {
            for l in m..b {
                assert_eq!(assoc_index(b, l, m), expected);
                expected += 1;
            }
        }
        assert_eq!(expected, b * (b + 1) / 2);
    }

    #[test]
    fn test_normalized_closed_forms() {
        // ~P_{0,0} = 1/sqrt(4 pi), ~P_{1,0} = sqrt(3/4pi) x,
        // ~P_{1,1} = sqrt(3/4pi) y, ~P_{2,1} = sqrt(15/8pi) * sqrt(2) x y.
        let theta = 1.1_f64;
        let (x, y) = (theta.cos(), theta.sin());
        let t = normalized_triangle(4, theta);
        let q = 1.0 / (4.0 * PI).sqrt();
        assert!((t[assoc_index(4, 0, 0)] - q).abs() < 1e-14);
        assert!((t[assoc_index(4, 1, 0)] - (3.0 / (4.0 * PI)).sqrt() * x).abs() < 1e-14);
        assert!((t[assoc_index(4, 1, 1)] - (3.0 / (4.0 * PI)).sqrt() * y).abs() < 1e-14);
        let p21 = (15.0 / (8.0 * PI)).sqrt() * 2.0_f64.sqrt() * x * y;
        assert!((t[assoc_index(4, 2, 1)] - p21).abs() < 1e-13);
    }

    #[test]
    fn test_spherical_harmonic_axisymmetric() {
        // Y_{1,0} = sqrt(3/4pi) cos(theta), independent of phi.
        let v = spherical_harmonic(1, 0, 0.7, 2.0);
        assert!((v - (3.0 / (4.0 * PI)).sqrt() * 0.7_f64.cos()).abs() < 1e-14);
    }
}
