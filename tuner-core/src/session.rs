//! # Tuning Session Module
//!
//! The only stateful part of the tuner. A [`TuningSession`] owns the sample
//! source, the detector and everything the display depends on (selected
//! instrument and string, listening flag, current reading), and turns each
//! frame into a [`Reading`].
//!
//! ## States
//! - **Idle**: nothing is captured; the reading is empty.
//! - **Listening**: frames are pulled from the capture queue, newest first.
//!
//! `Idle → Listening` needs the source to start; a failure is returned and the
//! session stays idle. `Listening → Idle` always succeeds.

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, info, trace, warn};

use crate::audio::{AudioFrame, CaptureHandle, SampleSource};
use crate::config::{DisplayPolicy, TunerConfig};
use crate::error::AcquisitionError;
use crate::instruments::{self, Instrument};
use crate::pitch::{PitchDetector, PitchEstimate};
use crate::tuning;

/// Whether the session is capturing audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningState {
    Idle,
    Listening,
}

/// The reference a detected pitch is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum TuningTarget {
    /// Whatever equal-tempered note is closest to the detected pitch.
    NearestChromaticNote,
    /// A specific string chosen by the user.
    FixedString { name: String, frequency_hz: f32 },
}

/// What the display should show after a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Note or string name, `None` when nothing is detected.
    pub note: Option<String>,
    /// Signed deviation in cents, rounded to one decimal place.
    pub cents: f32,
}

impl Default for Reading {
    fn default() -> Self {
        Self {
            note: None,
            cents: 0.0,
        }
    }
}

/// Driver state for one tuner: selection, capture and the current reading.
pub struct TuningSession<S> {
    source: S,
    detector: PitchDetector,
    display_policy: DisplayPolicy,
    instrument: Instrument,
    selected_string: Option<String>,
    capture: Option<CaptureHandle>,
    reading: Reading,
}

impl<S: SampleSource> TuningSession<S> {
    pub fn new(source: S, config: &TunerConfig) -> Self {
        Self {
            source,
            detector: PitchDetector::new(config.detector.clone()),
            display_policy: config.display_policy,
            instrument: Instrument::default(),
            selected_string: None,
            capture: None,
            reading: Reading::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> ListeningState {
        if self.capture.is_some() {
            ListeningState::Listening
        } else {
            ListeningState::Idle
        }
    }

    pub fn is_listening(&self) -> bool {
        self.state() == ListeningState::Listening
    }

    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn selected_string(&self) -> Option<&str> {
        self.selected_string.as_deref()
    }

    pub fn display_policy(&self) -> DisplayPolicy {
        self.display_policy
    }

    pub fn set_display_policy(&mut self, policy: DisplayPolicy) {
        self.display_policy = policy;
    }

    /// Starts listening. Does nothing if already listening.
    ///
    /// On failure the session stays idle and the error is handed back for the
    /// caller to show; nothing retries.
    pub fn start(&mut self) -> Result<(), AcquisitionError> {
        if self.capture.is_some() {
            debug!("Start requested while already listening");
            return Ok(());
        }
        match self.source.start() {
            Ok(handle) => {
                info!("Listening at {} Hz", handle.sample_rate_hz());
                self.capture = Some(handle);
                self.reading = Reading::default();
                Ok(())
            }
            Err(e) => {
                warn!("Could not start listening: {}", e);
                Err(e)
            }
        }
    }

    /// Stops listening and clears the reading. Always succeeds.
    pub fn stop(&mut self) {
        if let Some(handle) = self.capture.take() {
            self.source.stop(handle);
            info!("Stopped listening");
        }
        self.reading = Reading::default();
    }

    /// Switches instrument. Any selected string is cleared; listening is unaffected.
    pub fn select_instrument(&mut self, instrument: Instrument) {
        if instrument != self.instrument {
            debug!("Instrument changed: {} -> {}", self.instrument, instrument);
        }
        self.instrument = instrument;
        self.selected_string = None;
    }

    /// Selects the string to tune toward.
    pub fn select_string(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug!("String selected: {}", name);
        self.selected_string = Some(name);
    }

    pub fn clear_string(&mut self) {
        self.selected_string = None;
    }

    /// The reference detected pitches are currently compared against.
    ///
    /// A fixed string only applies to stringed instruments.
    pub fn target(&self) -> TuningTarget {
        match &self.selected_string {
            Some(name) if self.instrument.is_stringed() => TuningTarget::FixedString {
                name: name.clone(),
                frequency_hz: instruments::reference_frequency(name),
            },
            _ => TuningTarget::NearestChromaticNote,
        }
    }

    /// Runs the estimator on one frame and updates the reading.
    pub fn process_frame(&mut self, frame: &AudioFrame) -> &Reading {
        let estimate = self.detector.estimate(frame);
        trace!("Frame of {} samples -> {:?}", frame.len(), estimate);
        self.apply_estimate(estimate)
    }

    /// Updates the reading from a pitch estimate.
    pub fn apply_estimate(&mut self, estimate: PitchEstimate) -> &Reading {
        match estimate {
            PitchEstimate::NoPitch => {
                if self.display_policy == DisplayPolicy::ClearOnSilence {
                    self.reading = Reading::default();
                }
            }
            PitchEstimate::Detected(frequency) => {
                let (name, reference) = match self.target() {
                    TuningTarget::FixedString { name, frequency_hz } => (name, frequency_hz),
                    TuningTarget::NearestChromaticNote => {
                        let note = tuning::nearest_note(frequency);
                        (note.name.to_string(), note.frequency)
                    }
                };
                let cents = tuning::cents_difference(frequency, reference);
                self.reading = Reading {
                    note: Some(name),
                    cents: tuning::round_cents(cents),
                };
            }
        }
        &self.reading
    }

    /// Processes the newest queued frame, if any, without blocking.
    ///
    /// Older frames still in the queue are skipped. If the source has gone
    /// away the session returns to idle.
    pub fn poll(&mut self) -> Option<&Reading> {
        let capture = self.capture.as_ref()?;

        let mut latest = None;
        let mut skipped = 0usize;
        let disconnected = loop {
            match capture.frames().try_recv() {
                Ok(frame) => {
                    if latest.replace(frame).is_some() {
                        skipped += 1;
                    }
                }
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };
        if skipped > 0 {
            trace!("Skipped {} stale frame(s)", skipped);
        }

        let processed = match latest {
            Some(frame) => {
                self.process_frame(&frame);
                true
            }
            None => false,
        };

        if disconnected {
            warn!("Sample source disconnected");
            self.stop();
            return None;
        }
        processed.then_some(&self.reading)
    }

    /// Consumes frames until `stop` fires or the source runs dry, reporting
    /// every reading to `on_reading`. Leaves the session idle.
    ///
    /// The stop signal is checked between frames; a frame already being
    /// analysed is finished first. Dropping the stop sender also stops the loop.
    pub fn run(&mut self, stop: &Receiver<()>, mut on_reading: impl FnMut(&Reading)) {
        let Some(frames) = self.capture.as_ref().map(|c| c.frames().clone()) else {
            debug!("Run requested while idle");
            return;
        };

        loop {
            // A pending stop wins over queued frames.
            match stop.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => {
                    debug!("Stop requested");
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            crossbeam_channel::select! {
                recv(stop) -> _ => {
                    debug!("Stop requested");
                    break;
                },
                recv(frames) -> msg => match msg {
                    Ok(frame) => {
                        let reading = self.process_frame(&frame);
                        on_reading(reading);
                    }
                    Err(_) => {
                        warn!("Sample source disconnected");
                        break;
                    }
                },
            }
        }

        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A source that never starts.
    struct DeniedSource;

    impl SampleSource for DeniedSource {
        fn start(&mut self) -> Result<CaptureHandle, AcquisitionError> {
            Err(AcquisitionError::NoInputDevice)
        }
    }

    fn session() -> TuningSession<DeniedSource> {
        TuningSession::new(DeniedSource, &TunerConfig::default())
    }

    #[test]
    fn test_nearest_note_reading() {
        let mut session = session();
        let reading = session.apply_estimate(PitchEstimate::Detected(440.0)).clone();
        assert_eq!(reading.note.as_deref(), Some("A"));
        assert_eq!(reading.cents, 0.0);

        let reading = session.apply_estimate(PitchEstimate::Detected(445.0)).clone();
        assert_eq!(reading.note.as_deref(), Some("A"));
        // 1200 * log2(445 / 440) = 19.56...
        assert_eq!(reading.cents, 19.6);
    }

    #[test]
    fn test_fixed_string_reading() {
        let mut session = session();
        session.select_string("E2");
        assert_eq!(
            session.target(),
            TuningTarget::FixedString {
                name: "E2".into(),
                frequency_hz: 82.41
            }
        );
        let reading = session.apply_estimate(PitchEstimate::Detected(85.0)).clone();
        assert_eq!(reading.note.as_deref(), Some("E2"));
        assert!(reading.cents > 0.0);
        assert!((reading.cents - 53.6).abs() < 0.11);
    }

    #[test]
    fn test_fixed_string_far_from_detected_pitch() {
        let mut session = session();
        session.select_string("A2");
        let reading = session.apply_estimate(PitchEstimate::Detected(220.0)).clone();
        assert_eq!(reading.note.as_deref(), Some("A2"));
        assert!((reading.cents - 1200.0).abs() < 0.11);
    }

    #[test]
    fn test_unknown_string_uses_a440() {
        let mut session = session();
        session.select_string("Z7");
        let reading = session.apply_estimate(PitchEstimate::Detected(440.0)).clone();
        assert_eq!(reading.note.as_deref(), Some("Z7"));
        assert_eq!(reading.cents, 0.0);
    }

    #[test]
    fn test_string_ignored_for_unstringed_instrument() {
        let mut session = session();
        session.select_instrument(Instrument::Harmonium);
        session.select_string("E2");
        assert_eq!(session.target(), TuningTarget::NearestChromaticNote);
        let reading = session.apply_estimate(PitchEstimate::Detected(85.0)).clone();
        assert_eq!(reading.note.as_deref(), Some("E"));
    }

    #[test]
    fn test_instrument_change_clears_string() {
        let mut session = session();
        session.select_string("E2");
        session.select_instrument(Instrument::Violin);
        assert_eq!(session.selected_string(), None);
        assert_eq!(session.target(), TuningTarget::NearestChromaticNote);
    }

    #[test]
    fn test_silence_clears_by_default() {
        let mut session = session();
        session.apply_estimate(PitchEstimate::Detected(440.0));
        let reading = session.apply_estimate(PitchEstimate::NoPitch);
        assert_eq!(*reading, Reading::default());
    }

    #[test]
    fn test_silence_holds_when_configured() {
        let mut session = session();
        session.set_display_policy(DisplayPolicy::HoldLastNote);
        session.apply_estimate(PitchEstimate::Detected(445.0));
        let reading = session.apply_estimate(PitchEstimate::NoPitch).clone();
        assert_eq!(reading.note.as_deref(), Some("A"));
        assert_eq!(reading.cents, 19.6);
    }

    #[test]
    fn test_failed_start_stays_idle() {
        let mut session = session();
        assert_eq!(session.start(), Err(AcquisitionError::NoInputDevice));
        assert_eq!(session.state(), ListeningState::Idle);
        assert!(session.poll().is_none());
    }

    #[test]
    fn test_stop_while_idle_is_harmless() {
        let mut session = session();
        session.apply_estimate(PitchEstimate::Detected(440.0));
        session.stop();
        assert_eq!(session.state(), ListeningState::Idle);
        assert_eq!(*session.reading(), Reading::default());
    }
}
