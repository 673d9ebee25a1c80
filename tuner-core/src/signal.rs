//! # Signal Preprocessing Module
//!
//! Small in-place helpers run on a frame before it is correlated: level
//! measurement, DC-offset removal, peak normalization, windowing and
//! quiet-edge trimming.

use crate::config::WindowFunction;

/// Root-mean-square amplitude of `signal` (0.0 when empty).
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = signal.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum_squares / signal.len() as f64).sqrt() as f32
}

/// Removes the DC offset from a signal by making its average value zero.
///
/// A constant offset adds a ramp to every lag of the autocorrelation and can
/// swamp the periodic part of a quiet tone.
pub fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f32>() / len as f32;
    if avg.abs() > 1e-6 {
        for sample in signal.iter_mut() {
            *sample -= avg;
        }
    }
}

/// Largest absolute sample value.
pub fn peak(signal: &[f32]) -> f32 {
    signal.iter().fold(0.0f32, |max, s| max.max(s.abs()))
}

/// Rescales `signal` so its peak magnitude is 1.0. Silent input is left untouched.
pub fn normalize_peak(signal: &mut [f32]) {
    let peak = peak(signal);
    if peak > f32::EPSILON {
        let scale = 1.0 / peak;
        for sample in signal.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Applies a window function to the buffer in place.
///
/// Tapering the signal toward zero at the edges keeps the frame boundaries
/// from biasing the correlation toward short lags.
pub fn apply_window(buffer: &mut [f32], window: WindowFunction) {
    match window {
        WindowFunction::Rectangular => {}
        WindowFunction::Hann => apply_hann_window(buffer),
        WindowFunction::Tukey { taper } if taper <= 0.0 => {}
        WindowFunction::Tukey { taper } if taper >= 1.0 => apply_hann_window(buffer),
        WindowFunction::Tukey { taper } => apply_tukey_window(buffer, taper),
    }
}

fn apply_hann_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos());
        *sample *= multiplier;
    }
}

fn apply_tukey_window(buffer: &mut [f32], taper: f32) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    let edge = taper / 2.0;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let x = i as f32 / n_minus_1;
        let distance = x.min(1.0 - x);
        if distance < edge {
            *sample *= 0.5 * (1.0 - (2.0 * std::f32::consts::PI * distance / taper).cos());
        }
    }
}

/// Returns the sub-slice left after cutting loud leading and trailing samples.
///
/// The start moves to the first sample in the first half whose magnitude is
/// below `threshold`. The end moves back to the first sample below `threshold`
/// counting from the back of the second half. Neither bound moves if no sample
/// qualifies.
pub fn trim_quiet_edges(signal: &[f32], threshold: f32) -> &[f32] {
    let size = signal.len();
    if size < 2 {
        return signal;
    }
    let half = size / 2;

    let start = signal[..half]
        .iter()
        .position(|s| s.abs() < threshold)
        .unwrap_or(0);
    let end = (1..half)
        .map(|i| size - i)
        .find(|&i| signal[i].abs() < threshold)
        .unwrap_or(size - 1);

    &signal[start..end.max(start)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
        assert!((rms(&[3.0, 4.0]) - (12.5f32).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_remove_dc_offset() {
        let mut signal = vec![1.5, 0.5, 1.5, 0.5];
        remove_dc_offset(&mut signal);
        assert_eq!(signal, vec![0.5, -0.5, 0.5, -0.5]);
    }

    #[test]
    fn test_normalize_peak() {
        let mut signal = vec![0.1, -0.25, 0.2];
        normalize_peak(&mut signal);
        assert!((peak(&signal) - 1.0).abs() < 1e-6);
        assert!((signal[0] - 0.4).abs() < 1e-6);

        let mut silent = vec![0.0; 8];
        normalize_peak(&mut silent);
        assert!(silent.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_hann_window_tapers_edges() {
        let mut buffer = vec![1.0; 9];
        apply_window(&mut buffer, WindowFunction::Hann);
        assert!(buffer[0].abs() < 1e-6);
        assert!(buffer[8].abs() < 1e-6);
        assert!((buffer[4] - 1.0).abs() < 1e-6);

        let mut flat = vec![1.0; 9];
        apply_window(&mut flat, WindowFunction::Rectangular);
        assert!(flat.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_tukey_window_keeps_flat_top() {
        let mut buffer = vec![1.0; 101];
        apply_window(&mut buffer, WindowFunction::Tukey { taper: 0.2 });
        assert!(buffer[0].abs() < 1e-6);
        assert!(buffer[100].abs() < 1e-6);
        // Tapered region covers the outer 10% on each side.
        assert!(buffer[5] > 0.0 && buffer[5] < 1.0);
        assert!(buffer[11..=89].iter().all(|&s| s == 1.0));

        let mut hann = vec![1.0; 9];
        let mut full_taper = vec![1.0; 9];
        apply_window(&mut hann, WindowFunction::Hann);
        apply_window(&mut full_taper, WindowFunction::Tukey { taper: 1.0 });
        assert_eq!(hann, full_taper);
    }

    #[test]
    fn test_trim_quiet_edges() {
        let signal = [0.9, 0.8, 0.1, 0.5, 0.5, 0.05, 0.7, 0.9];
        // start: index 2; end: scanning 7, 6, 5 -> index 5.
        assert_eq!(trim_quiet_edges(&signal, 0.2), &signal[2..5]);

        let loud = [0.9; 6];
        assert_eq!(trim_quiet_edges(&loud, 0.2), &loud[..5]);
    }
}
