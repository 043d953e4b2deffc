//! Raw audio input for the extractor.

use serde::{Deserialize, Serialize};

/// A mono audio buffer with a known sample rate.
///
/// This is the pipeline's audio entry point. Decoding a container format
/// (MP3, WAV, ...) into samples is the caller's concern; the pipeline
/// only sees amplitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: f64,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.samples.len() as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    /// True when every sample is a finite number and the sample rate is
    /// positive and finite. Anything else is corrupt input.
    pub fn is_well_formed(&self) -> bool {
        self.sample_rate.is_finite()
            && self.sample_rate > 0.0
            && self.samples.iter().all(|s| s.is_finite())
    }

    /// True when no sample exceeds `noise_floor` in magnitude.
    pub fn is_silent(&self, noise_floor: f32) -> bool {
        self.samples.iter().all(|s| s.abs() <= noise_floor)
    }
}
