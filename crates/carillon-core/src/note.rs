//! Note events and pitch conversion helpers.
//!
//! A [`NoteEvent`] is the symbolic unit flowing through the pipeline:
//! produced once by the extractor (or an external note source), never
//! mutated afterwards. Pitches stay in raw Hz until quantization maps
//! them onto the physical comb.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A discrete musical note detected in (or supplied instead of) audio.
///
/// Events are ordered by onset time, ties broken by pitch ascending.
/// Two events may share an onset when the audio encodes a chord.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Fundamental frequency in Hz (raw, not yet quantized to a tine).
    pub pitch_hz: f64,
    /// Start time in seconds from the beginning of the recording.
    pub onset: f64,
    /// Time in seconds the note sounds.
    pub duration: f64,
    /// Relative loudness of the attack, 0.0 - 1.0.
    pub strength: f32,
}

impl NoteEvent {
    pub fn new(pitch_hz: f64, onset: f64, duration: f64, strength: f32) -> Self {
        Self {
            pitch_hz,
            onset,
            duration,
            strength,
        }
    }

    /// Pipeline processing order: onset time, ties by pitch ascending.
    pub fn cmp_pipeline_order(&self, other: &Self) -> Ordering {
        self.onset
            .total_cmp(&other.onset)
            .then(self.pitch_hz.total_cmp(&other.pitch_hz))
    }
}

/// Sort a note sequence into pipeline processing order (stable).
pub fn sort_pipeline_order(notes: &mut [NoteEvent]) {
    notes.sort_by(|a, b| a.cmp_pipeline_order(b));
}

/// Convert a MIDI note number to frequency (A4 = MIDI 69 = 440 Hz).
pub fn midi_to_freq(note: u8) -> f64 {
    440.0 * 2.0f64.powf((note as f64 - 69.0) / 12.0)
}

/// Convert a frequency to the nearest MIDI note number.
///
/// Returns `None` for non-positive frequencies.
pub fn freq_to_midi(freq: f64) -> Option<u8> {
    if freq <= 0.0 {
        return None;
    }
    let note = (69.0 + 12.0 * (freq / 440.0).log2()).round();
    Some(note.clamp(0.0, 127.0) as u8)
}

/// Parse a note name in scientific pitch notation (e.g. `"A4"`, `"C#5"`,
/// `"Eb3"`) to its frequency in Hz.
///
/// Middle C is `C4` (MIDI 60). Returns `None` for unparseable names or
/// names outside the MIDI range.
pub fn note_name_to_freq(name: &str) -> Option<f64> {
    let bytes = name.as_bytes();
    if bytes.len() < 2 {
        return None;
    }

    let semitone: i32 = match bytes[0].to_ascii_uppercase() {
        b'C' => 0,
        b'D' => 2,
        b'E' => 4,
        b'F' => 5,
        b'G' => 7,
        b'A' => 9,
        b'B' => 11,
        _ => return None,
    };

    let (accidental, octave_str) = match bytes[1] {
        b'#' | b's' => (1, &name[2..]),
        b'b' => (-1, &name[2..]),
        _ => (0, &name[1..]),
    };

    let octave: i32 = octave_str.parse().ok()?;
    let midi = (octave + 1) * 12 + semitone + accidental;
    if !(0..=127).contains(&midi) {
        return None;
    }
    Some(midi_to_freq(midi as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn note_names_parse_to_expected_frequencies() {
        assert_relative_eq!(note_name_to_freq("A4").unwrap(), 440.0, epsilon = 1e-9);
        assert_relative_eq!(
            note_name_to_freq("C4").unwrap(),
            261.6255653005986,
            epsilon = 1e-6
        );
        // Enharmonic spellings agree
        assert_relative_eq!(
            note_name_to_freq("C#4").unwrap(),
            note_name_to_freq("Db4").unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn note_name_rejects_garbage() {
        assert!(note_name_to_freq("").is_none());
        assert!(note_name_to_freq("H4").is_none());
        assert!(note_name_to_freq("C").is_none());
        assert!(note_name_to_freq("C#").is_none());
        assert!(note_name_to_freq("C99").is_none());
    }

    #[test]
    fn midi_round_trip() {
        for midi in [36u8, 48, 60, 69, 72, 84, 96] {
            let freq = midi_to_freq(midi);
            assert_eq!(freq_to_midi(freq), Some(midi));
        }
        assert_eq!(freq_to_midi(0.0), None);
        assert_eq!(freq_to_midi(-440.0), None);
    }

    #[test]
    fn pipeline_order_breaks_onset_ties_by_pitch() {
        let mut notes = vec![
            NoteEvent::new(880.0, 0.0, 0.1, 0.5),
            NoteEvent::new(440.0, 0.0, 0.1, 0.5),
            NoteEvent::new(220.0, 0.5, 0.1, 0.5),
        ];
        sort_pipeline_order(&mut notes);
        assert_eq!(notes[0].pitch_hz, 440.0);
        assert_eq!(notes[1].pitch_hz, 880.0);
        assert_eq!(notes[2].onset, 0.5);
    }
}
