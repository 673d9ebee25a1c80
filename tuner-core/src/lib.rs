// tuner-core/src/lib.rs

//! The core logic for the instrument tuner.
//! This crate is responsible for audio capture, pitch estimation,
//! note mapping and the tuning session state. It is completely headless
//! and contains no GUI code.

pub mod audio;
pub mod config;
pub mod correlation;
pub mod error;
pub mod instruments;
pub mod pitch;
pub mod session;
pub mod signal;
pub mod tuning;

pub use audio::{AudioFrame, CaptureHandle, MicrophoneSource, SampleSource, ToneSource};
pub use config::{DisplayPolicy, TunerConfig};
pub use error::AcquisitionError;
pub use instruments::Instrument;
pub use pitch::{PitchDetector, PitchEstimate};
pub use session::{ListeningState, Reading, TuningSession, TuningTarget};
pub use tuning::{cents_difference, nearest_note, Note};
