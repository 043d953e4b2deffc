//! Test helpers and fixtures for Carillon integration tests.
//!
//! Deterministic synthetic signals only: plucked-tone waveforms with
//! known attack times stand in for real recordings, so every assertion
//! has a ground truth.

// Not every test binary uses every helper.
#![allow(dead_code)]

use carillon::prelude::*;

/// Default test sample rate (matches common hardware).
pub const TEST_SAMPLE_RATE: f64 = 44100.0;

/// Build a default pipeline for the standard 18-tine movement.
pub fn test_pipeline() -> CarillonPipeline {
    init_tracing();
    CarillonPipeline::builder()
        .build()
        .expect("failed to build test pipeline")
}

/// Route pipeline logs through the test harness; `try_init` ignores the
/// already-set error when several tests race.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Synthesize plucked tones: sharp attack, exponential decay, one entry
/// per `(onset_seconds, frequency_hz)`.
pub fn pluck_waveform(duration: f64, events: &[(f64, f64)]) -> Waveform {
    let n = (TEST_SAMPLE_RATE * duration) as usize;
    let mut samples = vec![0.0f32; n];
    for &(onset, freq) in events {
        let pos = (onset * TEST_SAMPLE_RATE) as usize;
        let len = ((TEST_SAMPLE_RATE * 0.4) as usize).min(n.saturating_sub(pos));
        for i in 0..len {
            let t = i as f64 / TEST_SAMPLE_RATE;
            let envelope = (-8.0 * t).exp();
            let tone = (std::f64::consts::TAU * freq * t).sin();
            samples[pos + i] += (0.8 * envelope * tone) as f32;
        }
    }
    Waveform::new(samples, TEST_SAMPLE_RATE)
}

/// A note timeline in the shape an external producer would hand over.
pub fn timeline(entries: &[(f64, f64, f32)]) -> Vec<NoteEvent> {
    entries
        .iter()
        .map(|&(onset, pitch_hz, strength)| NoteEvent::new(pitch_hz, onset, 0.2, strength))
        .collect()
}
