//! # Pitch Detection Module
//!
//! Fundamental-frequency estimation by normalized autocorrelation.
//!
//! ## Pipeline
//! 1. RMS gate against the noise floor
//! 2. Optional quiet-edge trimming, DC removal and peak normalization
//! 3. Windowing
//! 4. Autocorrelation (direct or FFT)
//! 5. Skip the zero-lag lobe, then take the highest remaining peak
//! 6. Parabolic interpolation for sub-sample accuracy
//!
//! By default peaks are compared by their interpolated height. Comparing raw
//! lag values under-rates a peak that falls between two lags, and for short
//! periods that is enough for the peak at twice the period to win.
//! 7. Range check
//!
//! Failing to find a pitch is the common case (silence between notes) and is
//! reported as [`PitchEstimate::NoPitch`], never as an error.

use crate::audio::AudioFrame;
use crate::config::{DetectorConfig, PeakSearch};
use crate::correlation;
use crate::signal;

/// Outcome of analysing a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    NoPitch,
    /// A finite frequency in Hz within the detector's configured range.
    Detected(f32),
}

impl PitchEstimate {
    pub fn frequency(&self) -> Option<f32> {
        match *self {
            PitchEstimate::Detected(freq) => Some(freq),
            PitchEstimate::NoPitch => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, PitchEstimate::Detected(_))
    }
}

/// Stateless pitch estimator; all behaviour comes from its [`DetectorConfig`].
///
/// `estimate` takes `&self` and touches nothing else, so one detector can be
/// shared across threads and called on independent frames concurrently.
#[derive(Debug, Clone, Default)]
pub struct PitchDetector {
    config: DetectorConfig,
}

impl PitchDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Estimates the fundamental frequency of `frame`.
    pub fn estimate(&self, frame: &AudioFrame) -> PitchEstimate {
        estimate_pitch(&frame.samples, frame.sample_rate_hz, &self.config)
    }
}

/// Estimates the fundamental frequency of `samples` recorded at `sample_rate`.
pub fn estimate_pitch(samples: &[f32], sample_rate: u32, config: &DetectorConfig) -> PitchEstimate {
    if samples.is_empty() || sample_rate == 0 {
        return PitchEstimate::NoPitch;
    }

    // --- Noise gate: reject silence and background noise ---
    if signal::rms(samples) < config.noise_floor {
        return PitchEstimate::NoPitch;
    }

    let trimmed = match config.edge_trim_threshold {
        Some(threshold) => signal::trim_quiet_edges(samples, threshold),
        None => samples,
    };
    let mut buffer = trimmed.to_vec();

    if config.remove_dc {
        signal::remove_dc_offset(&mut buffer);
    }
    // Nothing periodic left to correlate.
    if signal::peak(&buffer) <= f32::EPSILON {
        return PitchEstimate::NoPitch;
    }
    if config.normalize {
        signal::normalize_peak(&mut buffer);
    }
    signal::apply_window(&mut buffer, config.window);

    let c = correlation::autocorrelate(&buffer, config.correlation);

    let Some(period) = find_period(&c, config.peak_search) else {
        return PitchEstimate::NoPitch;
    };

    let frequency = sample_rate as f32 / period;
    if frequency.is_finite()
        && frequency >= config.min_frequency
        && frequency <= config.max_frequency
    {
        PitchEstimate::Detected(frequency)
    } else {
        PitchEstimate::NoPitch
    }
}

/// Finds the dominant period, in fractional samples, of an autocorrelation.
///
/// Walks down the zero-lag lobe to the first dip, picks the highest peak at or
/// after it according to `search`, and refines that lag with a parabola
/// through its neighbours (missing neighbours count as 0).
fn find_period(c: &[f32], search: PeakSearch) -> Option<f32> {
    let n = c.len();
    if n < 2 {
        return None;
    }

    // --- Skip the unconditional peak at lag 0 ---
    let mut dip = 0;
    while dip < n - 1 && c[dip] > c[dip + 1] {
        dip += 1;
    }

    let period = match search {
        PeakSearch::Sampled => {
            // Highest value after the dip, first one wins on ties.
            let (max_pos, _) = c[dip..]
                .iter()
                .enumerate()
                .fold((None, f32::NEG_INFINITY), |(best, best_val), (i, &v)| {
                    if v > best_val { (Some(dip + i), v) } else { (best, best_val) }
                });
            let max_pos = max_pos?;
            if max_pos == 0 {
                return None;
            }
            refine_peak(c, max_pos).0
        }
        PeakSearch::Interpolated => {
            let mut best: Option<(f32, f32)> = None;
            for lag in dip.max(1)..n {
                let right = c.get(lag + 1).copied().unwrap_or(0.0);
                if c[lag] < c[lag - 1] || c[lag] <= right {
                    continue;
                }
                let (period, height) = refine_peak(c, lag);
                if best.is_none_or(|(_, best_height)| height > best_height) {
                    best = Some((period, height));
                }
            }
            best?.0
        }
    };

    (period.is_finite() && period > 0.0).then_some(period)
}

/// Fits a parabola through `c[lag - 1]`, `c[lag]`, `c[lag + 1]` and returns its
/// vertex as `(position, height)`. `lag` must be at least 1.
fn refine_peak(c: &[f32], lag: usize) -> (f32, f32) {
    // --- Parabolic interpolation for better precision ---
    let x1 = c[lag - 1];
    let x2 = c[lag];
    let x3 = c.get(lag + 1).copied().unwrap_or(0.0);

    let a = (x1 + x3 - 2.0 * x2) / 2.0;
    let b = (x3 - x1) / 2.0;

    if a != 0.0 {
        (lag as f32 - b / (2.0 * a), x2 - b * b / (4.0 * a))
    } else {
        (lag as f32, x2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CaptureConfig, CorrelationMethod, WindowFunction};

    const SAMPLE_RATE: u32 = 44100;
    const FRAME: usize = 4096;

    /// Frame start offsets, so tones don't always begin at a zero crossing.
    const START_SAMPLES: [u64; 4] = [0, 137, 5003, 29411];

    fn sine(freq: f32, amplitude: f32) -> AudioFrame {
        AudioFrame::sine(freq, amplitude, FRAME, SAMPLE_RATE, 0)
    }

    fn assert_within(estimate: PitchEstimate, expected: f32, tolerance: f32) {
        let freq = estimate
            .frequency()
            .unwrap_or_else(|| panic!("expected a pitch near {expected} Hz, got NoPitch"));
        let error = (freq - expected).abs() / expected;
        assert!(
            error < tolerance,
            "expected {expected} Hz, got {freq} Hz ({:.2}% off)",
            error * 100.0
        );
    }

    #[test]
    fn test_detects_sines_across_range() {
        let detector = PitchDetector::default();
        for freq in [82.41, 110.0, 196.0, 329.63, 440.0, 880.0, 1500.0, 1975.0] {
            assert_within(detector.estimate(&sine(freq, 0.5)), freq, 0.02);
        }
    }

    #[test]
    fn test_accuracy_at_any_phase_and_supported_frame_size() {
        let detector = PitchDetector::default();
        let mut freqs = Vec::new();
        let mut freq = 50.5f32;
        while freq < 1990.0 {
            freqs.push(freq);
            freq *= 1.04;
        }
        freqs.push(1990.0);

        let frame_sizes = [
            *CaptureConfig::SUPPORTED_FRAME_SIZES.start(),
            *CaptureConfig::SUPPORTED_FRAME_SIZES.end(),
        ];
        for sample_rate in [44100, 48000] {
            for frame_size in frame_sizes {
                for &freq in &freqs {
                    for start in START_SAMPLES {
                        let frame = AudioFrame::sine(freq, 0.5, frame_size, sample_rate, start);
                        let estimate = detector.estimate(&frame);
                        let detected = estimate.frequency().unwrap_or_else(|| {
                            panic!("{freq} Hz at {sample_rate} Hz, N={frame_size}, start={start}: NoPitch")
                        });
                        let error = (detected - freq).abs() / freq;
                        assert!(
                            error < 0.02,
                            "{freq} Hz at {sample_rate} Hz, N={frame_size}, start={start}: got {detected} Hz"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_high_notes_keep_their_period_on_long_frames() {
        // Periods of 22.5 and 25.5 samples put the true peak halfway between two
        // lags, while twice the period lands on a whole lag.
        let interpolated = PitchDetector::default();
        let sampled = PitchDetector::new(DetectorConfig {
            peak_search: PeakSearch::Sampled,
            ..DetectorConfig::default()
        });
        for (freq, sample_rate) in [(1960.0, 44100), (1727.34, 44100), (1744.6, 48000)] {
            for start in START_SAMPLES {
                let frame = AudioFrame::sine(freq, 0.5, FRAME, sample_rate, start);
                assert_within(interpolated.estimate(&frame), freq, 0.02);
            }
        }

        let frame = sine(1960.0, 0.5);
        assert_within(sampled.estimate(&frame), 980.0, 0.02);
    }

    #[test]
    fn test_direct_and_fft_agree() {
        let fft = PitchDetector::default();
        let direct = PitchDetector::new(DetectorConfig {
            correlation: CorrelationMethod::Direct,
            ..DetectorConfig::default()
        });
        for freq in [110.0, 440.0] {
            let frame = sine(freq, 0.5);
            let a = fft.estimate(&frame).frequency().unwrap();
            let b = direct.estimate(&frame).frequency().unwrap();
            assert!((a - b).abs() / b < 1e-3, "fft {a} vs direct {b}");
            assert_within(PitchEstimate::Detected(b), freq, 0.02);
        }
    }

    #[test]
    fn test_rectangular_window() {
        let detector = PitchDetector::new(DetectorConfig {
            window: WindowFunction::Rectangular,
            ..DetectorConfig::default()
        });
        assert_within(detector.estimate(&sine(246.94, 0.5)), 246.94, 0.02);
    }

    #[test]
    fn test_hann_window() {
        let detector = PitchDetector::new(DetectorConfig {
            window: WindowFunction::Hann,
            ..DetectorConfig::default()
        });
        for freq in [196.0, 440.0] {
            assert_within(detector.estimate(&sine(freq, 0.5)), freq, 0.02);
        }
    }

    #[test]
    fn test_edge_trimming() {
        let detector = PitchDetector::new(DetectorConfig {
            edge_trim_threshold: Some(0.2),
            ..DetectorConfig::default()
        });
        assert_within(detector.estimate(&sine(440.0, 0.8)), 440.0, 0.02);
    }

    #[test]
    fn test_other_sample_rate() {
        let detector = PitchDetector::default();
        let frame = AudioFrame::sine(293.66, 0.3, FRAME, 48000, 0);
        assert_within(detector.estimate(&frame), 293.66, 0.02);
    }

    #[test]
    fn test_quiet_frames_are_gated() {
        let detector = PitchDetector::default();
        assert_eq!(detector.estimate(&sine(440.0, 0.005)), PitchEstimate::NoPitch);
        assert_eq!(
            detector.estimate(&AudioFrame::new(vec![0.0; FRAME], SAMPLE_RATE)),
            PitchEstimate::NoPitch
        );
    }

    #[test]
    fn test_noise_floor_is_configurable() {
        let frame = sine(440.0, 0.05);
        assert!(PitchDetector::default().estimate(&frame).is_detected());
        let strict = PitchDetector::new(DetectorConfig {
            noise_floor: 0.1,
            ..DetectorConfig::default()
        });
        assert_eq!(strict.estimate(&frame), PitchEstimate::NoPitch);
    }

    #[test]
    fn test_out_of_range_pitch_rejected() {
        let detector = PitchDetector::default();
        assert_eq!(detector.estimate(&sine(2500.0, 0.5)), PitchEstimate::NoPitch);
        assert_eq!(detector.estimate(&sine(3000.0, 0.5)), PitchEstimate::NoPitch);

        let narrow = PitchDetector::new(DetectorConfig {
            max_frequency: 400.0,
            ..DetectorConfig::default()
        });
        assert_eq!(narrow.estimate(&sine(440.0, 0.5)), PitchEstimate::NoPitch);
    }

    #[test]
    fn test_degenerate_frames() {
        let detector = PitchDetector::default();
        assert_eq!(
            detector.estimate(&AudioFrame::new(vec![], SAMPLE_RATE)),
            PitchEstimate::NoPitch
        );
        assert_eq!(
            detector.estimate(&AudioFrame::new(vec![0.5], SAMPLE_RATE)),
            PitchEstimate::NoPitch
        );
        // A constant frame has no period inside the range.
        assert_eq!(
            detector.estimate(&AudioFrame::new(vec![0.5; FRAME], SAMPLE_RATE)),
            PitchEstimate::NoPitch
        );
        assert_eq!(
            detector.estimate(&AudioFrame::new(sine(440.0, 0.5).samples, 0)),
            PitchEstimate::NoPitch
        );
    }

    #[test]
    fn test_estimate_is_repeatable() {
        let detector = PitchDetector::default();
        let frame = sine(196.0, 0.4);
        let first = detector.estimate(&frame);
        let second = detector.estimate(&frame);
        assert_eq!(first, second);
        assert!(first.is_detected());
    }

    #[test]
    fn test_find_period_parabolic_refinement() {
        // Peak between lags 4 and 5, closer to 4.
        let c = [10.0, 2.0, 0.0, 3.0, 8.0, 7.0, 1.0];
        // a = (3 + 7 - 16) / 2 = -3, b = (7 - 3) / 2 = 2 -> 4 + 1/3
        for search in [PeakSearch::Sampled, PeakSearch::Interpolated] {
            let period = find_period(&c, search).unwrap();
            assert!((period - (4.0 + 1.0 / 3.0)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_find_period_compares_interpolated_heights() {
        // Lag 5 holds the largest value, but the peak around lag 2.5 has the
        // higher vertex (6.75 against 6.5).
        let c = [10.0, 0.0, 6.0, 6.0, 0.0, 6.5, 0.0];
        let sampled = find_period(&c, PeakSearch::Sampled).unwrap();
        assert!((sampled - 5.0).abs() < 1e-5);
        let interpolated = find_period(&c, PeakSearch::Interpolated).unwrap();
        assert!((interpolated - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_find_period_monotonic_has_no_peak_at_zero() {
        for search in [PeakSearch::Sampled, PeakSearch::Interpolated] {
            assert!(find_period(&[1.0], search).is_none());
            assert!(find_period(&[0.0, 0.0, 0.0], search).is_none());
        }
    }
}
