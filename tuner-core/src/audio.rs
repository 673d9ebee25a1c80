//! # Audio Capture Module
//!
//! This module handles sample acquisition for the tuner. It defines the frame type
//! handed to the pitch estimator, the [`SampleSource`] seam the tuning session pulls
//! from, and two sources:
//!
//! - [`MicrophoneSource`]: real-time capture using CPAL (Cross-Platform Audio Library)
//! - [`ToneSource`]: a synthetic sine generator, handy without audio hardware
//!
//! ## Buffering
//! Every source runs on its own worker thread and pushes fixed-size frames into a
//! bounded channel. When the consumer falls behind, the microphone drops frames
//! rather than stalling the audio callback.

use std::f32::consts::PI;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::error::AcquisitionError;
use crate::signal;

/// One block of mono time-domain samples, roughly in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            sample_rate_hz,
        }
    }

    /// Builds a frame holding a pure sine wave.
    ///
    /// `start_sample` offsets the phase so consecutive frames join up seamlessly.
    pub fn sine(
        frequency_hz: f32,
        amplitude: f32,
        len: usize,
        sample_rate_hz: u32,
        start_sample: u64,
    ) -> Self {
        let rate = sample_rate_hz as f64;
        let samples = (0..len as u64)
            .map(|i| {
                // Phase is computed in f64 so long-running tones don't drift.
                let t = (start_sample + i) as f64 / rate;
                let phase = (t * frequency_hz as f64).fract() as f32;
                amplitude * (2.0 * PI * phase).sin()
            })
            .collect();
        Self::new(samples, sample_rate_hz)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Root-mean-square level of the frame (0.0 for an empty frame).
    pub fn rms(&self) -> f32 {
        signal::rms(&self.samples)
    }
}

/// Anything that can deliver a continuous stream of [`AudioFrame`]s.
pub trait SampleSource {
    /// Begins capture. Failure (no device, permission refused, ...) is reported
    /// here and only here.
    fn start(&mut self) -> Result<CaptureHandle, AcquisitionError>;

    /// Ends a capture started by this source.
    fn stop(&mut self, handle: CaptureHandle) {
        handle.stop();
    }
}

/// Worker thread feeding a capture, plus the signal that shuts it down.
struct CaptureWorker {
    shutdown_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// A running capture: the frame queue and whatever keeps it filled.
///
/// Dropping the handle stops the capture.
pub struct CaptureHandle {
    frames: Receiver<AudioFrame>,
    sample_rate_hz: u32,
    worker: Option<CaptureWorker>,
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("sample_rate_hz", &self.sample_rate_hz)
            .field("queued_frames", &self.frames.len())
            .field("has_worker", &self.worker.is_some())
            .finish()
    }
}

impl CaptureHandle {
    /// Wraps a queue that is filled by someone else (no worker to stop).
    pub fn from_receiver(frames: Receiver<AudioFrame>, sample_rate_hz: u32) -> Self {
        Self {
            frames,
            sample_rate_hz,
            worker: None,
        }
    }

    fn with_worker(
        frames: Receiver<AudioFrame>,
        sample_rate_hz: u32,
        shutdown_tx: Sender<()>,
        thread: JoinHandle<()>,
    ) -> Self {
        Self {
            frames,
            sample_rate_hz,
            worker: Some(CaptureWorker {
                shutdown_tx,
                thread,
            }),
        }
    }

    /// The queue frames arrive on, oldest first.
    pub fn frames(&self) -> &Receiver<AudioFrame> {
        &self.frames
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Stops the worker and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            // The worker may already be gone (finite source); that's fine.
            let _ = worker.shutdown_tx.send(());
            if worker.thread.join().is_err() {
                warn!("Capture worker panicked during shutdown");
            }
            debug!("Capture worker stopped");
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Captures from the host's default input device.
#[derive(Debug, Clone)]
pub struct MicrophoneSource {
    config: CaptureConfig,
}

impl MicrophoneSource {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

impl SampleSource for MicrophoneSource {
    /// Starts audio capture from the default input device.
    ///
    /// The CPAL stream is created and owned by a dedicated thread. That thread
    /// reports back whether the stream started, so errors surface here
    /// synchronously instead of disappearing inside the worker.
    fn start(&mut self) -> Result<CaptureHandle, AcquisitionError> {
        let config = self.config.clone();
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(config.queue_depth.max(1));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<u32, AcquisitionError>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let (stream, sample_rate) = match open_input_stream(&config, frame_tx) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(sample_rate));

                // Either an explicit shutdown or a dropped handle wakes us up.
                let _ = shutdown_rx.recv();

                if let Err(e) = stream.pause() {
                    warn!("Error pausing input stream: {}", e);
                }
                drop(stream);
                debug!("Input stream closed");
            })
            .map_err(|e| AcquisitionError::Backend(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(sample_rate)) => Ok(CaptureHandle::with_worker(
                frame_rx,
                sample_rate,
                shutdown_tx,
                thread,
            )),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AcquisitionError::WorkerExited)
            }
        }
    }
}

/// Opens and starts the input stream on the current thread.
///
/// The callback accumulates samples until a full frame is available, then
/// hands it to the queue without blocking.
fn open_input_stream(
    config: &CaptureConfig,
    sender: Sender<AudioFrame>,
) -> Result<(cpal::Stream, u32), AcquisitionError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AcquisitionError::NoInputDevice)?;

    match device.name() {
        Ok(name) => info!("Using audio input device: {}", name),
        Err(e) => warn!("Could not read input device name: {}", e),
    }

    let configs = device
        .supported_input_configs()
        .map_err(|e| AcquisitionError::Backend(e.to_string()))?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, config.sample_rate)
        .ok_or(AcquisitionError::UnsupportedFormat)?;

    let target = config.sample_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let stream_config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(target))
        .into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = usize::from(stream_config.channels.max(1));

    info!(
        "Selected sample rate: {} Hz ({} channel(s), {} samples per frame)",
        sample_rate, channels, config.frame_size
    );

    let frame_size = config.frame_size.max(1);
    let gain = config.input_gain;
    let mut pending = Vec::with_capacity(frame_size * 2);
    let mut dropped: u64 = 0;

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Only the first channel of interleaved input is used.
                pending.extend(data.chunks(channels).map(|chunk| chunk[0] * gain));

                while pending.len() >= frame_size {
                    let frame = AudioFrame::new(pending[..frame_size].to_vec(), sample_rate);
                    if sender.try_send(frame).is_err() {
                        dropped += 1;
                        if dropped.is_power_of_two() {
                            debug!("Frame queue full, {} frame(s) dropped so far", dropped);
                        }
                    }
                    pending.drain(..frame_size);
                }
            },
            |err| warn!("An error occurred on the audio stream: {}", err),
            None,
        )
        .map_err(|e| AcquisitionError::Backend(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AcquisitionError::Backend(e.to_string()))?;

    Ok((stream, sample_rate))
}

/// Picks the f32 input configuration closest to `target_rate`, preferring mono.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate_distance = if (c.min_sample_rate().0..=c.max_sample_rate().0)
                .contains(&target_rate)
            {
                0
            } else {
                let min_diff = c.min_sample_rate().0.abs_diff(target_rate);
                let max_diff = c.max_sample_rate().0.abs_diff(target_rate);
                min_diff.min(max_diff)
            };
            (c.channels() != 1, rate_distance)
        })
}

/// Generates a steady sine tone, frame by frame, on a worker thread.
#[derive(Debug, Clone)]
pub struct ToneSource {
    pub frequency_hz: f32,
    pub amplitude: f32,
    pub frame_size: usize,
    pub sample_rate_hz: u32,
    pub queue_depth: usize,
    /// Stop producing after this many frames (`None` runs until stopped).
    pub frame_limit: Option<usize>,
}

impl ToneSource {
    pub fn new(frequency_hz: f32, amplitude: f32, config: &CaptureConfig) -> Self {
        Self {
            frequency_hz,
            amplitude,
            frame_size: config.frame_size,
            sample_rate_hz: config.sample_rate,
            queue_depth: config.queue_depth,
            frame_limit: None,
        }
    }

    pub fn with_frame_limit(mut self, frames: usize) -> Self {
        self.frame_limit = Some(frames);
        self
    }
}

impl SampleSource for ToneSource {
    fn start(&mut self) -> Result<CaptureHandle, AcquisitionError> {
        let tone = self.clone();
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(tone.queue_depth.max(1));
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("tone-source".into())
            .spawn(move || {
                let mut produced = 0usize;
                loop {
                    if tone.frame_limit.is_some_and(|limit| produced >= limit) {
                        break;
                    }
                    let frame = AudioFrame::sine(
                        tone.frequency_hz,
                        tone.amplitude,
                        tone.frame_size,
                        tone.sample_rate_hz,
                        (produced * tone.frame_size) as u64,
                    );
                    crossbeam_channel::select! {
                        send(frame_tx, frame) -> res => {
                            if res.is_err() {
                                break;
                            }
                            produced += 1;
                        },
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                debug!("Tone source finished after {} frame(s)", produced);
            })
            .map_err(|e| AcquisitionError::Backend(e.to_string()))?;

        info!(
            "Tone source started: {:.2} Hz at {} Hz",
            self.frequency_hz, self.sample_rate_hz
        );
        Ok(CaptureHandle::with_worker(
            frame_rx,
            self.sample_rate_hz,
            shutdown_tx,
            thread,
        ))
    }
}
