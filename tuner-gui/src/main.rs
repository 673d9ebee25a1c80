//! # Multi-Instrument Tuner GUI
//!
//! Desktop front end for `tuner-core`. The window owns a [`TuningSession`]
//! over the default microphone and drains its capture queue on every tick.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application, light or dark theme
//! - **Capture Thread**: owned by the microphone source, feeds a bounded queue
//! - **Updates**: 60 FPS ticks via the subscription system; each tick shows the newest frame

mod ui;

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use iced::{Element, Subscription, Theme};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tuner_core::{Instrument, MicrophoneSource, Reading, TunerConfig, TuningSession};
use ui::main_display::create_main_view;

/// Config file looked up in the working directory.
const CONFIG_FILE_NAME: &str = "tuner_config.json";

/// Interval between queue drains.
const TICK_INTERVAL_MS: u64 = 16;

pub fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting tuner");
    let result = iced::application("Multi-Instrument Tuner", TunerApp::update, TunerApp::view)
        .subscription(TunerApp::subscription)
        .theme(TunerApp::theme)
        .run();
    info!("Tuner finished: {:?}", result);
    result
}

#[derive(Debug, Clone)]
pub enum Message {
    InstrumentSelected(Instrument),
    StringSelected(&'static str),
    ToggleListening,
    ToggleDarkMode,
    Tick,
}

/// Snapshot of everything the view renders.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub instrument: Instrument,
    pub selected_string: Option<&'static str>,
    pub listening: bool,
    pub reading: Reading,
    pub error: Option<String>,
    pub dark_mode: bool,
}

struct TunerApp {
    session: TuningSession<MicrophoneSource>,
    dark_mode: bool,
    /// Last acquisition failure, cleared on the next successful start.
    error: Option<String>,
}

impl Default for TunerApp {
    fn default() -> Self {
        let config = load_config_or_default(CONFIG_FILE_NAME);
        let source = MicrophoneSource::new(config.capture.clone());
        Self {
            session: TuningSession::new(source, &config),
            dark_mode: false,
            error: None,
        }
    }
}

impl TunerApp {
    fn update(&mut self, message: Message) {
        match message {
            Message::InstrumentSelected(instrument) => {
                self.session.select_instrument(instrument);
            }
            Message::StringSelected(name) => {
                self.session.select_string(name);
            }
            Message::ToggleListening => {
                if self.session.is_listening() {
                    self.session.stop();
                } else {
                    match self.session.start() {
                        Ok(()) => self.error = None,
                        Err(e) => {
                            error!("Microphone access failed: {}", e);
                            self.error = Some(format!("Microphone access failed: {e}"));
                        }
                    }
                }
            }
            Message::ToggleDarkMode => {
                self.dark_mode = !self.dark_mode;
            }
            Message::Tick => {
                if !self.session.is_listening() {
                    return;
                }
                self.session.poll();
                if !self.session.is_listening() {
                    warn!("Microphone stream ended");
                    self.error = Some("Microphone stream ended".to_string());
                }
            }
        }
    }

    fn display_data(&self) -> AppDisplayData {
        let instrument = self.session.instrument();
        // Map the session's selection back onto the static string table.
        let selected_string = self.session.selected_string().and_then(|selected| {
            instrument
                .strings()
                .iter()
                .copied()
                .find(|name| *name == selected)
        });

        AppDisplayData {
            instrument,
            selected_string,
            listening: self.session.is_listening(),
            reading: self.session.reading().clone(),
            error: self.error.clone(),
            dark_mode: self.dark_mode,
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data())
    }

    /// Ticks only while listening; an idle tuner has nothing to drain.
    fn subscription(&self) -> Subscription<Message> {
        if self.session.is_listening() {
            iced::time::every(std::time::Duration::from_millis(TICK_INTERVAL_MS)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn theme(&self) -> Theme {
        if self.dark_mode {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

/// Saves the tuner configuration as pretty-printed JSON.
fn save_config(config: &TunerConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json_string = serde_json::to_string_pretty(config)?;
    let mut file =
        File::create(path).with_context(|| format!("creating config {}", path.display()))?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

/// Loads a tuner configuration from a JSON file.
fn load_config(path: impl AsRef<Path>) -> Result<TunerConfig> {
    let path = path.as_ref();
    let mut file =
        File::open(path).with_context(|| format!("opening config {}", path.display()))?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    let config: TunerConfig = serde_json::from_str(&data)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config.validated())
}

/// Loads the configuration, falling back to defaults if the file is missing or
/// invalid. A missing file is created with the defaults so it can be edited.
fn load_config_or_default(path: impl AsRef<Path>) -> TunerConfig {
    let path = path.as_ref();
    if !path.exists() {
        let config = TunerConfig::default();
        match save_config(&config, path) {
            Ok(()) => info!("Wrote default config to {}", path.display()),
            Err(e) => warn!("Could not write default config: {:#}", e),
        }
        return config;
    }
    match load_config(path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Ignoring config {}: {:#}", path.display(), e);
            TunerConfig::default()
        }
    }
}
