//! # Tuning Module
//!
//! Note naming and in-tune evaluation based on equal temperament.
//! Converts detected frequencies to note names and measures how far a
//! frequency sits from a target note in cents.
//!
//! ## Features
//! - Sharp-only chromatic note naming (A4 = 440 Hz, MIDI convention)
//! - Equal temperament reference table for C0 through B8
//! - Cent deviation calculations against a target note
//! - In-tune classification with a fixed tolerance window

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Tolerance window for the in-tune classification, in cents.
///
/// A detected pitch within this many cents of the target (in either
/// direction) counts as in tune. 100 cents = one semitone.
pub const IN_TUNE_CENTS: f32 = 10.0;

/// Sharp-only chromatic pitch classes, indexed by semitone within the octave.
const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Statically computed reference frequencies for C0 through B8.
///
/// Every practice-relevant note name maps to its equal tempered frequency.
/// The formula is f = 440 * 2^((n - 69) / 12) with n the MIDI note number,
/// so A4 comes out as exactly 440 Hz. Computed once on first use.
static REFERENCE_FREQUENCIES: Lazy<BTreeMap<String, f32>> = Lazy::new(|| {
    let mut table = BTreeMap::new();
    // C0 is MIDI note 12, B8 is MIDI note 119.
    for midi in 12u32..=119 {
        let name = format!("{}{}", PITCH_CLASSES[(midi % 12) as usize], midi / 12 - 1);
        let frequency = 440.0 * 2.0_f32.powf((midi as f32 - 69.0) / 12.0);
        table.insert(name, frequency);
    }
    table
});

/// The outcome of comparing a detected frequency against a target note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningReading {
    /// Deviation from the target in cents (positive = sharp).
    pub cents: f32,
    /// Whether the deviation is inside the tolerance window.
    pub in_tune: bool,
}

/// Names the equal tempered note nearest to a frequency.
///
/// Rounds 69 + 12*log2(f / 440) to the nearest semitone and formats the
/// pitch class with its octave, e.g. "A4" or "C#5". Sharps only, flats are
/// never produced.
///
/// # Arguments
/// * `frequency` - Detected frequency in Hz
///
/// # Returns
/// * `Some(name)` - Name of the nearest note
/// * `None` - Frequency was zero, negative or not finite (no pitch)
pub fn name_frequency(frequency: f32) -> Option<String> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return None;
    }
    let semitone = 69.0 + 12.0 * (frequency / 440.0).log2();
    let nearest = semitone.round() as i32;
    let class = ((nearest % 12) + 12) % 12;
    let octave = nearest.div_euclid(12) - 1;
    Some(format!("{}{}", PITCH_CLASSES[class as usize], octave))
}

/// Looks up the equal tempered reference frequency for a note name.
///
/// Returns `None` for names outside the C0..B8 table (including anything
/// spelled with a flat).
pub fn reference_frequency(note: &str) -> Option<f32> {
    REFERENCE_FREQUENCIES.get(note).copied()
}

/// Evaluates how far a detected frequency sits from a target note.
///
/// # Arguments
/// * `frequency` - Detected frequency in Hz
/// * `target` - Target note name, e.g. "A4"
///
/// # Returns
/// * `Some(reading)` - Cent deviation and in-tune flag
/// * `None` - The target has no reference entry; callers keep their
///   previous reading
pub fn evaluate_tuning(frequency: f32, target: &str) -> Option<TuningReading> {
    let reference = reference_frequency(target)?;
    let cents = cents_deviation(frequency, reference);
    Some(TuningReading {
        cents,
        in_tune: cents.abs() < IN_TUNE_CENTS,
    })
}

/// Calculates the deviation between two frequencies in cents.
///
/// Positive values mean `frequency` is sharp of `reference`, negative
/// values mean flat. 1200 cents = one octave.
pub fn cents_deviation(frequency: f32, reference: f32) -> f32 {
    1200.0 * (frequency / reference).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_reference_pitches() {
        assert_eq!(name_frequency(440.0).as_deref(), Some("A4"));
        assert_eq!(name_frequency(220.0).as_deref(), Some("A3"));
        assert_eq!(name_frequency(261.63).as_deref(), Some("C4"));
        assert_eq!(name_frequency(277.18).as_deref(), Some("C#4"));
    }

    #[test]
    fn rejects_unusable_frequencies() {
        assert_eq!(name_frequency(0.0), None);
        assert_eq!(name_frequency(-5.0), None);
        assert_eq!(name_frequency(f32::NAN), None);
        assert_eq!(name_frequency(f32::INFINITY), None);
    }

    #[test]
    fn reference_table_round_trips() {
        assert_eq!(reference_frequency("A4"), Some(440.0));
        for (name, expected) in [("C4", 261.63), ("G5", 783.99), ("A0", 27.5)] {
            let reference = reference_frequency(name).unwrap();
            assert!((reference - expected).abs() < 0.01);
            assert_eq!(name_frequency(reference).as_deref(), Some(name));
        }
    }

    #[test]
    fn exact_target_is_in_tune() {
        for target in ["C3", "F#4", "A4", "B7"] {
            let reference = reference_frequency(target).unwrap();
            let reading = evaluate_tuning(reference, target).unwrap();
            assert!(reading.in_tune);
            assert!(reading.cents.abs() < 0.01);
        }
    }

    #[test]
    fn tolerance_window_boundaries() {
        let reference = reference_frequency("A4").unwrap();
        let sharp_11 = reference * (11.0f32 / 1200.0).exp2();
        let sharp_9 = reference * (9.0f32 / 1200.0).exp2();
        let flat_11 = reference * (-11.0f32 / 1200.0).exp2();
        assert!(!evaluate_tuning(sharp_11, "A4").unwrap().in_tune);
        assert!(evaluate_tuning(sharp_9, "A4").unwrap().in_tune);
        assert!(!evaluate_tuning(flat_11, "A4").unwrap().in_tune);
    }

    #[test]
    fn unknown_target_yields_no_reading() {
        assert_eq!(evaluate_tuning(440.0, "H9"), None);
        assert_eq!(evaluate_tuning(440.0, "Bb4"), None);
        assert_eq!(evaluate_tuning(440.0, ""), None);
    }
}
