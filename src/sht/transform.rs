//! Forward and inverse discrete spherical-harmonic transforms.
//!
//! Harmonic coefficient vectors have length B^2 and are packed by
//! [`harmonic_index`]: a B x B matrix whose upper triangle (row = order m)
//! holds m >= 0 and whose strict lower triangle holds the folded m < 0
//! coefficients.
//!
//! The inverse transform assembles, per colatitude row, the azimuthal
//! cosine/sine coefficients by contracting the harmonics against the
//! per-colatitude Legendre file, then evaluates the Fourier series on the
//! half-sample azimuth grid with one complex inverse FFT per row.

use crate::sht::PARALLEL_BANDLIMIT;
use crate::sht::legendre::{assoc_index, normalized_triangle};
use crate::sht::workspace::Workspace;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

/// Flat position of harmonic (l, m) in the packed coefficient vector.
pub fn harmonic_index(bandlimit: usize, l: usize, m: isize) -> usize {
    if m >= 0 {
        bandlimit * m as usize + l
    } else {
        let m = m.unsigned_abs();
        bandlimit * (bandlimit - m) + (l - m)
    }
}

/// Forward transform (analysis): grid samples to harmonics.
///
/// `data` holds N x N values row-major over (theta_j, phi_k). Each of
/// the B^2 (l, m) tasks is independent; they run in parallel above the
/// bandlimit threshold.
pub fn analysis(ws: &Workspace, data: &[f64]) -> Vec<f64> {
    let b = ws.bandlimit();
    let n = ws.samples();
    assert_eq!(data.len(), n * n, "data must be N x N");

    let task = |t: usize| -> (usize, f64) {
        // Split the flat task into degree and order.
        let mut l = (t as f64).sqrt() as usize;
        while (l + 1) * (l + 1) <= t {
            l += 1;
        }
        while l * l > t {
            l -= 1;
        }
        let m = t as isize - (l * l + l) as isize;

        // (w .* P) * D, one pass over the grid.
        let p = ws.rank(l, m.unsigned_abs());
        let w = ws.weights();
        let mut row = vec![0.0; n];
        for j in 0..n {
            let wp = w[j] * p[j];
            let data_row = &data[j * n..(j + 1) * n];
            for (r, d) in row.iter_mut().zip(data_row) {
                *r += wp * d;
            }
        }

        // Contract with the azimuth sinusoid of the order.
        let value = if m > 0 {
            let trig = ws.cos_azimuth(m as usize);
            row.iter().zip(trig).map(|(r, t)| r * t).sum()
        } else if m < 0 {
            let trig = ws.sin_azimuth(m.unsigned_abs());
            row.iter().zip(trig).map(|(r, t)| r * t).sum()
        } else {
            row.iter().sum()
        };
        (harmonic_index(b, l, m), value)
    };

    let results: Vec<(usize, f64)> = if b >= PARALLEL_BANDLIMIT {
        (0..b * b).into_par_iter().map(task).collect()
    } else {
        (0..b * b).map(task).collect()
    };
    let mut harmonics = vec![0.0; b * b];
    for (index, value) in results {
        harmonics[index] = value;
    }
    harmonics
}

/// Which spectral field a synthesis pass produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Values,
    DTheta,
    DPhi,
}

/// Inverse-transform engine: an FFT plan plus its scratch buffer.
///
/// The plan can be shared across threads; the scratch cannot, so each
/// thread performing inverse transforms owns one `Synthesis`. The
/// parallel path above the bandlimit threshold uses per-thread row
/// buffers internally.
pub struct Synthesis {
    samples: usize,
    fft: Arc<dyn Fft<f64>>,
    twist: Vec<Complex<f64>>,
    buffer: Vec<Complex<f64>>,
}

impl Synthesis {
    pub fn new(bandlimit: usize) -> Self {
        let n = 2 * bandlimit;
        let fft = FftPlanner::<f64>::new().plan_fft_inverse(n);
        // Half-sample shift: the azimuth grid starts at phi = pi / N.
        let twist = (0..n)
            .map(|m| Complex::from_polar(1.0, PI * m as f64 / n as f64))
            .collect();
        Self {
            samples: n,
            fft,
            twist,
            buffer: vec![Complex::new(0.0, 0.0); n],
        }
    }

    /// Inverse transform (synthesis): harmonics to N x N grid samples.
    pub fn synthesis(&mut self, ws: &Workspace, harmonics: &[f64]) -> Vec<f64> {
        self.run(ws, harmonics, Mode::Values)
    }

    /// Spectral partial d/dtheta on the grid, via the derivative table.
    pub fn synthesis_dtheta(&mut self, ws: &Workspace, harmonics: &[f64]) -> Vec<f64> {
        self.run(ws, harmonics, Mode::DTheta)
    }

    /// Spectral partial d/dphi on the grid. Differentiating the azimuth
    /// sinusoids exchanges the cosine and sine blocks and scales by the
    /// order, so the coefficients cross over from the opposite sign of m.
    pub fn synthesis_dphi(&mut self, ws: &Workspace, harmonics: &[f64]) -> Vec<f64> {
        self.run(ws, harmonics, Mode::DPhi)
    }

    fn run(&mut self, ws: &Workspace, harmonics: &[f64], mode: Mode) -> Vec<f64> {
        let b = ws.bandlimit();
        let n = self.samples;
        assert_eq!(n, ws.samples(), "workspace bandlimit mismatch");
        assert_eq!(harmonics.len(), b * b, "harmonics must have length B^2");

        let mut data = vec![0.0; n * n];
        if b >= PARALLEL_BANDLIMIT {
            let fft = Arc::clone(&self.fft);
            let twist = &self.twist;
            data.par_chunks_mut(n).enumerate().for_each_init(
                || vec![Complex::new(0.0, 0.0); n],
                |buffer, (j, row)| {
                    fill_row(ws, harmonics, mode, j, twist, buffer);
                    fft.process(buffer);
                    for (value, z) in row.iter_mut().zip(buffer.iter()) {
                        *value = z.re;
                    }
                },
            );
        } else {
            for j in 0..n {
                fill_row(ws, harmonics, mode, j, &self.twist, &mut self.buffer);
                self.fft.process(&mut self.buffer);
                for (value, z) in data[j * n..(j + 1) * n].iter_mut().zip(self.buffer.iter())
                {
                    *value = z.re;
                }
            }
        }
        data
    }
}

/// Assembles the complex azimuthal spectrum of colatitude row `j`.
///
/// The cosine coefficient a_m and sine coefficient b_m are packed as
/// (a_m - i b_m) e^{i pi m / N}, so the real part of the unnormalized
/// inverse FFT is sum_m a_m cos(m phi_k) + b_m sin(m phi_k) at the
/// half-sample azimuths.
fn fill_row(
    ws: &Workspace,
    harmonics: &[f64],
    mode: Mode,
    j: usize,
    twist: &[Complex<f64>],
    buffer: &mut [Complex<f64>],
) {
    let b = ws.bandlimit();
    let file = match mode {
        Mode::DTheta => ws.dfile(j),
        _ => ws.file(j),
    };
    buffer.fill(Complex::new(0.0, 0.0));
    for m in 0..b {
        let (mut a, mut bb) = (0.0, 0.0);
        match mode {
            Mode::Values | Mode::DTheta => {
                for l in m..b {
                    let p = file[assoc_index(b, l, m)];
                    a += harmonics[harmonic_index(b, l, m as isize)] * p;
                    if m > 0 {
                        bb += harmonics[harmonic_index(b, l, -(m as isize))] * p;
                    }
                }
            }
            Mode::DPhi => {
                if m > 0 {
                    for l in m..b {
                        let p = file[assoc_index(b, l, m)];
                        a += m as f64 * harmonics[harmonic_index(b, l, -(m as isize))] * p;
                        bb -= m as f64 * harmonics[harmonic_index(b, l, m as isize)] * p;
                    }
                }
            }
        }
        buffer[m] = Complex::new(a, -bb) * twist[m];
    }
}

/// Evaluates a harmonic expansion at an arbitrary point on the sphere.
pub fn evaluate(bandlimit: usize, harmonics: &[f64], theta: f64, phi: f64) -> f64 {
    let b = bandlimit;
    let triangle = normalized_triangle(b, theta);
    let mut value = 0.0;
    for m in 0..b {
        let (mut a, mut bb) = (0.0, 0.0);
        for l in m..b {
            let p = triangle[assoc_index(b, l, m)];
            a += harmonics[harmonic_index(b, l, m as isize)] * p;
            if m > 0 {
                bb += harmonics[harmonic_index(b, l, -(m as isize))] * p;
            }
        }
        value += a * (m as f64 * phi).cos() + bb * (m as f64 * phi).sin();
    }
    value
}
