//! # Musical Tuning Module
//!
//! Equal-temperament note mapping referenced to A4 = 440 Hz.
//!
//! ## Features
//! - Nearest chromatic note for any frequency (pitch class only, octave-independent)
//! - Cent deviation between a frequency and a reference
//! - One-decimal rounding used by the display

/// Reference pitch for A4, in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// MIDI note number of A4.
const A4_MIDI: i32 = 69;

/// The twelve pitch classes, starting from C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Represents a single musical note with its name and frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Pitch-class name (e.g., "A", "C#")
    pub name: &'static str,
    /// Frequency of the rounded semitone in Hz
    pub frequency: f32,
}

/// Finds the closest equal-tempered note to a given frequency.
///
/// The frequency is rounded to the nearest semitone; only the pitch class is
/// named, but `frequency` is that exact semitone's pitch (so 220 Hz maps to
/// "A" at 220 Hz, not 440 Hz).
///
/// # Arguments
/// * `frequency` - Input frequency in Hz, must be positive
pub fn nearest_note(frequency: f32) -> Note {
    let note_number = 12.0 * (frequency / A4_FREQUENCY).log2() + A4_MIDI as f32;
    let rounded = note_number.round() as i32;
    let note_index = rounded.rem_euclid(12) as usize;
    let note_frequency = A4_FREQUENCY * 2.0_f32.powf((rounded - A4_MIDI) as f32 / 12.0);

    Note {
        name: NOTE_NAMES[note_index],
        frequency: note_frequency,
    }
}

/// Calculates the deviation from a reference frequency in cents.
///
/// 100 cents = 1 semitone, 1200 cents = 1 octave. Positive values are sharp,
/// negative values are flat. Both arguments must be positive.
pub fn cents_difference(frequency: f32, reference: f32) -> f32 {
    1200.0 * (frequency / reference).log2()
}

/// Rounds a cent value to one decimal place for display.
pub fn round_cents(cents: f32) -> f32 {
    (cents * 10.0).round() / 10.0
}
