//! Error types surfaced at the audio acquisition boundary.
//!
//! Detecting no pitch is not an error and never shows up here; see
//! [`crate::pitch::PitchEstimate::NoPitch`].

use thiserror::Error;

/// Failure to begin capturing audio.
///
/// Returned by [`crate::audio::SampleSource::start`]. A failed start leaves the
/// tuning session idle and is reported to the user once; nothing retries it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    /// The host exposes no default input device (or access to it was refused).
    #[error("No input device available")]
    NoInputDevice,

    /// The device offers no 32-bit float input configuration.
    #[error("No suitable f32 input format found")]
    UnsupportedFormat,

    /// The audio backend rejected a request.
    #[error("Audio backend error: {0}")]
    Backend(String),

    /// The capture worker went away before reporting whether the stream started.
    #[error("Capture worker exited before the stream started")]
    WorkerExited,
}
