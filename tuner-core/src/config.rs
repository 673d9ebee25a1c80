//! # Configuration Module
//!
//! Tunable constants for the estimator, the capture path and the display.
//! Everything is serde-friendly with per-field defaults, so a partial config
//! only overrides what it mentions. Reading and writing config files is left
//! to the application.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tapering applied to a frame before autocorrelation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WindowFunction {
    /// No tapering.
    Rectangular,
    /// Raised-cosine window, zero at both edges.
    Hann,
    /// Flat top with raised-cosine edges; `taper` is the tapered fraction of the
    /// frame (0.0 is rectangular, 1.0 is Hann).
    Tukey { taper: f32 },
}

/// How the autocorrelation sums are computed. Both produce the same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationMethod {
    /// Direct O(N²) lag sums.
    Direct,
    /// Zero-padded FFT, O(N log N).
    Fft,
}

/// How the highest autocorrelation peak after the first dip is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeakSearch {
    /// Largest correlation value at a whole-sample lag.
    Sampled,
    /// Local maximum whose parabolic vertex is highest. A peak falling between
    /// two lags is not under-rated, so high notes keep their true period.
    Interpolated,
}

/// What the display shows while no pitch is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayPolicy {
    /// Clear the note and zero the cents on every silent frame.
    ClearOnSilence,
    /// Keep the last reading until a new pitch is detected.
    HoldLastNote,
}

/// Constants used by [`crate::pitch::PitchDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Frames with an RMS level below this are treated as silence.
    pub noise_floor: f32,
    /// Lowest frequency reported, in Hz.
    pub min_frequency: f32,
    /// Highest frequency reported, in Hz.
    pub max_frequency: f32,
    pub window: WindowFunction,
    /// Rescale each frame so its peak magnitude is 1.0.
    pub normalize: bool,
    pub remove_dc: bool,
    /// Trim quiet-edge samples below this magnitude before analysis (off when `None`).
    pub edge_trim_threshold: Option<f32>,
    pub correlation: CorrelationMethod,
    pub peak_search: PeakSearch,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            noise_floor: 0.01,
            min_frequency: 50.0,
            max_frequency: 2000.0,
            window: WindowFunction::Tukey { taper: 0.25 },
            normalize: true,
            remove_dc: false,
            edge_trim_threshold: None,
            correlation: CorrelationMethod::Fft,
            peak_search: PeakSearch::Interpolated,
        }
    }
}

/// Settings for the microphone capture path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Samples per analysis frame.
    pub frame_size: usize,
    /// Preferred sample rate in Hz; the closest supported rate is used.
    pub sample_rate: u32,
    /// Linear gain applied to incoming samples.
    pub input_gain: f32,
    /// Frames buffered between capture and analysis before new ones are dropped.
    pub queue_depth: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_size: 4096,
            sample_rate: 44100,
            input_gain: 1.5,
            queue_depth: 4,
        }
    }
}

impl CaptureConfig {
    /// Frame lengths the detector is accurate for. Shorter frames hold too few
    /// periods of a 50 Hz tone at 48 kHz.
    pub const SUPPORTED_FRAME_SIZES: RangeInclusive<usize> = 3584..=4096;

    /// Returns the config with `frame_size` clamped into [`Self::SUPPORTED_FRAME_SIZES`].
    pub fn validated(mut self) -> Self {
        let range = Self::SUPPORTED_FRAME_SIZES;
        if !range.contains(&self.frame_size) {
            let clamped = self.frame_size.clamp(*range.start(), *range.end());
            warn!(
                "Frame size {} is outside {}..={}, using {}",
                self.frame_size,
                range.start(),
                range.end(),
                clamped
            );
            self.frame_size = clamped;
        }
        self
    }
}

/// Top-level configuration object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub detector: DetectorConfig,
    pub capture: CaptureConfig,
    pub display_policy: DisplayPolicy,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            capture: CaptureConfig::default(),
            display_policy: DisplayPolicy::ClearOnSilence,
        }
    }
}

impl TunerConfig {
    /// Returns the config with out-of-range capture settings corrected.
    pub fn validated(mut self) -> Self {
        self.capture = self.capture.validated();
        self
    }
}
