//! Instrument and string tables.
//!
//! Stringed instruments expose their open strings so the user can tune toward a
//! specific one; the rest are tuned against the nearest chromatic note.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::tuning::A4_FREQUENCY;

/// Instruments offered by the tuner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Instrument {
    #[default]
    Guitar,
    Violin,
    Ukulele,
    Tabla,
    Pakhawaj,
    Harmonium,
    Dholki,
}

impl Instrument {
    pub const ALL: [Instrument; 7] = [
        Instrument::Guitar,
        Instrument::Violin,
        Instrument::Ukulele,
        Instrument::Tabla,
        Instrument::Pakhawaj,
        Instrument::Harmonium,
        Instrument::Dholki,
    ];

    /// Open strings in playing order, empty for instruments without strings.
    pub fn strings(self) -> &'static [&'static str] {
        match self {
            Instrument::Guitar => &["E2", "A2", "D3", "G3", "B3", "E4"],
            Instrument::Violin => &["G3", "D4", "A4", "E5"],
            Instrument::Ukulele => &["G4", "C4", "E4", "A4"],
            Instrument::Tabla | Instrument::Pakhawaj | Instrument::Harmonium | Instrument::Dholki => &[],
        }
    }

    pub fn is_stringed(self) -> bool {
        !self.strings().is_empty()
    }

    pub fn name(self) -> &'static str {
        match self {
            Instrument::Guitar => "Guitar",
            Instrument::Violin => "Violin",
            Instrument::Ukulele => "Ukulele",
            Instrument::Tabla => "Tabla",
            Instrument::Pakhawaj => "Pakhawaj",
            Instrument::Harmonium => "Harmonium",
            Instrument::Dholki => "Dholki",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference frequencies for every open string in [`Instrument::strings`].
static STRING_FREQUENCIES: Lazy<BTreeMap<&'static str, f32>> = Lazy::new(|| {
    BTreeMap::from([
        // Guitar EADGBE
        ("E2", 82.41),
        ("A2", 110.00),
        ("D3", 146.83),
        ("G3", 196.00),
        ("B3", 246.94),
        ("E4", 329.63),
        // Violin GDAE
        ("D4", 293.66),
        ("A4", 440.00),
        ("E5", 659.25),
        // Ukulele GCEA
        ("G4", 392.00),
        ("C4", 261.63),
    ])
});

/// Looks up a string's reference frequency in Hz.
pub fn string_frequency(name: &str) -> Option<f32> {
    STRING_FREQUENCIES.get(name).copied()
}

/// Reference frequency for `name`, or 440 Hz if the table doesn't know it.
pub fn reference_frequency(name: &str) -> f32 {
    string_frequency(name).unwrap_or_else(|| {
        warn!("No reference frequency for '{}', using {} Hz", name, A4_FREQUENCY);
        A4_FREQUENCY
    })
}
