//! End-to-end checks of the spherical-harmonic transforms.

use cartosphere::sht::{
    Synthesis, Workspace, analysis, evaluate, harmonic_index, spherical_harmonic,
};
use rand::prelude::*;
use std::f64::consts::PI;

fn reference_harmonics(b: usize) -> Vec<f64> {
    let mut h = vec![0.0; b * b];
    for l in 0..b {
        for m in -(l as isize)..=(l as isize) {
            h[harmonic_index(b, l, m)] = 1.0 / (1 + l + m.unsigned_abs()) as f64;
        }
    }
    h
}

fn round_trip_error(b: usize, harmonics: &[f64]) -> f64 {
    let ws = Workspace::new(b);
    let mut synth = Synthesis::new(b);
    let data = synth.synthesis(&ws, harmonics);
    let recovered = analysis(&ws, &data);
    harmonics
        .iter()
        .zip(&recovered)
        .map(|(a, r)| (a - r).abs())
        .fold(0.0, f64::max)
}

#[test]
fn round_trip_reference_pattern() {
    for b in [2usize, 4, 8, 16, 32] {
        let error = round_trip_error(b, &reference_harmonics(b));
        assert!(error < 1e-12, "B = {b}: round-trip error {error:.3e}");
    }
}

#[test]
fn round_trip_random_harmonics() {
    let mut rng = StdRng::seed_from_u64(7);
    let b = 8;
    let mut harmonics = vec![0.0; b * b];
    for l in 0..b {
        for m in -(l as isize)..=(l as isize) {
            harmonics[harmonic_index(b, l, m)] = rng.random_range(-1.0..1.0);
        }
    }
    let error = round_trip_error(b, &harmonics);
    assert!(error < 1e-11, "round-trip error {error:.3e}");
}

#[test]
fn synthesis_agrees_with_pointwise_series() {
    let b = 16;
    let ws = Workspace::new(b);
    let h = reference_harmonics(b);
    let mut synth = Synthesis::new(b);
    let data = synth.synthesis(&ws, &h);
    let n = ws.samples();
    for j in (0..n).step_by(5) {
        for k in (0..n).step_by(7) {
            let direct = evaluate(b, &h, ws.theta(j), ws.phi(k));
            assert!(
                (data[j * n + k] - direct).abs() < 1e-11,
                "mismatch at ({j}, {k})"
            );
        }
    }
}

#[test]
fn spectral_partials_match_finite_differences() {
    let b = 16;
    let ws = Workspace::new(b);
    let h = reference_harmonics(b);
    let mut synth = Synthesis::new(b);
    let dtheta = synth.synthesis_dtheta(&ws, &h);
    let dphi = synth.synthesis_dphi(&ws, &h);
    let n = ws.samples();
    let eps = 1e-6;
    for &(j, k) in &[(1usize, 2usize), (9, 20), (17, 5), (30, 31)] {
        let (theta, phi) = (ws.theta(j), ws.phi(k));
        let fd_theta =
            (evaluate(b, &h, theta + eps, phi) - evaluate(b, &h, theta - eps, phi)) / (2.0 * eps);
        let fd_phi =
            (evaluate(b, &h, theta, phi + eps) - evaluate(b, &h, theta, phi - eps)) / (2.0 * eps);
        assert!((dtheta[j * n + k] - fd_theta).abs() < 1e-6);
        assert!((dphi[j * n + k] - fd_phi).abs() < 1e-6);
    }
}

#[test]
fn single_eigenmode_evaluates_to_its_harmonic() {
    let b = 4;
    let mut h = vec![0.0; b * b];
    h[harmonic_index(b, 2, 1)] = 1.0;
    // At the equator ~P_{2,1} has a root, so the field vanishes there.
    assert!(evaluate(b, &h, PI / 2.0, 0.0).abs() < 1e-14);
    // Away from the equator the field is exactly the real harmonic.
    for &(theta, phi) in &[(0.4, 0.0), (1.0, 2.0), (2.4, -1.3)] {
        let expected = spherical_harmonic(2, 1, theta, phi);
        assert!((evaluate(b, &h, theta, phi) - expected).abs() < 1e-14);
    }
}

#[test]
fn weights_integrate_the_constant_harmonic() {
    // Analyzing the constant 1 leaves only the (0,0) coefficient, whose
    // value is the integral of ~P_{0,0} = 1/sqrt(4 pi) over the sphere.
    let b = 8;
    let ws = Workspace::new(b);
    let n = ws.samples();
    let data = vec![1.0; n * n];
    let h = analysis(&ws, &data);
    assert!((h[harmonic_index(b, 0, 0)] - (4.0 * PI).sqrt()).abs() < 1e-10);
    for l in 1..b {
        for m in -(l as isize)..=(l as isize) {
            assert!(h[harmonic_index(b, l, m)].abs() < 1e-10);
        }
    }
}
