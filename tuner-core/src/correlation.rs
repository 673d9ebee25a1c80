//! # Autocorrelation Module
//!
//! Computes `c[i] = Σ_{j=0}^{N-1-i} x[j] * x[j+i]` for every lag `i` in `0..N`.
//!
//! The direct sum is O(N²) and dominates the cost of pitch estimation. The FFT
//! path (RustFFT) zero-pads to at least 2N so the circular correlation it
//! computes equals the linear one, then inverts the power spectrum.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::config::CorrelationMethod;

/// Autocorrelates `buffer` using the requested method.
pub fn autocorrelate(buffer: &[f32], method: CorrelationMethod) -> Vec<f32> {
    match method {
        CorrelationMethod::Direct => autocorrelate_direct(buffer),
        CorrelationMethod::Fft => autocorrelate_fft(buffer),
    }
}

/// Direct lag-by-lag autocorrelation.
pub fn autocorrelate_direct(buffer: &[f32]) -> Vec<f32> {
    let n = buffer.len();
    (0..n)
        .map(|lag| {
            buffer[..n - lag]
                .iter()
                .zip(&buffer[lag..])
                .map(|(a, b)| a * b)
                .sum::<f32>()
        })
        .collect()
}

/// FFT-based autocorrelation (Wiener–Khinchin), same output as the direct sum.
pub fn autocorrelate_fft(buffer: &[f32]) -> Vec<f32> {
    let n = buffer.len();
    if n == 0 {
        return Vec::new();
    }
    let size = (2 * n).next_power_of_two();

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut spectrum: Vec<Complex<f32>> = buffer
        .iter()
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }))
        .take(size)
        .collect();

    forward.process(&mut spectrum);
    for bin in spectrum.iter_mut() {
        *bin = Complex {
            re: bin.norm_sqr(),
            im: 0.0,
        };
    }
    inverse.process(&mut spectrum);

    // RustFFT leaves the inverse unnormalized.
    let scale = 1.0 / size as f32;
    spectrum.iter().take(n).map(|c| c.re * scale).collect()
}
