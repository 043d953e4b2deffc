//! Onset detection.
//!
//! Finds note attacks in a mono buffer using spectral flux with adaptive
//! thresholding, the standard choice for mixed tonal material.

use rustfft::{num_complex::Complex, FftPlanner};

/// Default FFT size for the flux spectrum.
const DEFAULT_FFT_SIZE: usize = 1024;

/// Default hop between analysis frames.
const DEFAULT_HOP_SIZE: usize = 512;

/// A detected note attack.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Onset {
    /// Sample position of the attack.
    pub sample_position: usize,
    /// Time position in seconds.
    pub time: f64,
    /// Relative strength of the attack, 0.0 - 1.0.
    pub strength: f32,
}

/// Sliding-window onset detector.
pub struct OnsetDetector {
    sample_rate: f64,
    fft_size: usize,
    hop_size: usize,
    /// Peak-picking threshold in standard deviations above the mean.
    threshold: f32,
    /// Detection-function gain; higher finds more (and weaker) onsets.
    sensitivity: f32,
    /// Minimum samples between two reported onsets.
    min_gap: usize,
    planner: FftPlanner<f32>,
    window: Vec<f32>,
    prev_magnitudes: Vec<f32>,
}

impl OnsetDetector {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_params(sample_rate, DEFAULT_FFT_SIZE, DEFAULT_HOP_SIZE)
    }

    pub fn with_params(sample_rate: f64, fft_size: usize, hop_size: usize) -> Self {
        let fft_size = fft_size.next_power_of_two();
        Self {
            sample_rate,
            fft_size,
            hop_size,
            threshold: 0.3,
            sensitivity: 1.0,
            min_gap: (sample_rate * 0.05) as usize, // 50 ms
            planner: FftPlanner::new(),
            window: hann_window(fft_size),
            prev_magnitudes: vec![0.0; fft_size / 2],
        }
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity.clamp(0.1, 10.0);
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.0, 1.0);
    }

    pub fn set_min_gap_seconds(&mut self, gap: f64) {
        self.min_gap = (gap * self.sample_rate) as usize;
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Clear inter-frame state. Call between unrelated buffers.
    pub fn reset(&mut self) {
        self.prev_magnitudes.fill(0.0);
    }

    /// Detect onsets in a mono buffer, sorted by time.
    pub fn detect(&mut self, samples: &[f32]) -> Vec<Onset> {
        let detection = self.detection_function(samples);
        self.onsets_from_detection(&detection)
    }

    /// Raw detection function: one `(frame start, flux)` pair per frame.
    /// Inter-frame state carries across calls until [`reset`](Self::reset),
    /// so adjoining buffer segments can be processed in separate calls.
    pub fn detection_function(&mut self, samples: &[f32]) -> Vec<(usize, f32)> {
        if samples.len() < self.fft_size {
            return Vec::new();
        }

        let num_frames = (samples.len() - self.fft_size) / self.hop_size + 1;
        let mut detection = Vec::with_capacity(num_frames);
        for frame_idx in 0..num_frames {
            let start = frame_idx * self.hop_size;
            let frame = &samples[start..start + self.fft_size];
            detection.push((start, self.spectral_flux(frame)));
        }
        detection
    }

    /// Peak-pick a detection function (possibly assembled from several
    /// passes over adjoining segments) into min-gap-separated onsets.
    /// Thresholding and strength normalization are computed over the
    /// whole function, never per segment.
    pub fn onsets_from_detection(&self, detection: &[(usize, f32)]) -> Vec<Onset> {
        let mut onsets = Vec::new();
        let mut last_position = None;
        for (position, strength) in self.pick_peaks(detection) {
            let far_enough = match last_position {
                Some(last) => position >= last + self.min_gap,
                None => true,
            };
            if far_enough {
                onsets.push(Onset {
                    sample_position: position,
                    time: position as f64 / self.sample_rate,
                    strength,
                });
                last_position = Some(position);
            }
        }
        onsets
    }

    /// Sum of positive magnitude differences against the previous frame.
    fn spectral_flux(&mut self, frame: &[f32]) -> f32 {
        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .zip(&self.window)
            .map(|(s, w)| Complex::new(s * w, 0.0))
            .collect();
        self.planner.plan_fft_forward(self.fft_size).process(&mut buffer);

        let mut flux = 0.0;
        for (i, c) in buffer[..self.fft_size / 2].iter().enumerate() {
            let magnitude = c.norm();
            let diff = magnitude - self.prev_magnitudes[i];
            if diff > 0.0 {
                flux += diff;
            }
            self.prev_magnitudes[i] = magnitude;
        }
        flux * self.sensitivity
    }

    /// Local maxima above an adaptive threshold (mean + k·stddev of the
    /// detection function). Strength is normalized against the strongest
    /// frame in the buffer.
    fn pick_peaks(&self, detection: &[(usize, f32)]) -> Vec<(usize, f32)> {
        if detection.len() < 3 {
            return Vec::new();
        }

        let len = detection.len() as f32;
        let (sum, sum_sq, max_val) =
            detection
                .iter()
                .fold((0.0f32, 0.0f32, 0.0f32), |(s, sq, mx), &(_, v)| {
                    (s + v, sq + v * v, mx.max(v))
                });
        let mean = sum / len;
        let std_dev = (sum_sq / len - mean * mean).max(0.0).sqrt();
        let cutoff = mean + std_dev * self.threshold * 3.0;

        let mut peaks = Vec::new();
        for i in 1..detection.len() - 1 {
            let (pos, val) = detection[i];
            if val > detection[i - 1].1 && val > detection[i + 1].1 && val > cutoff {
                let strength = if max_val > 0.0 {
                    (val / max_val).min(1.0)
                } else {
                    0.0
                };
                peaks.push((pos, strength));
            }
        }
        peaks
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = std::f32::consts::TAU * i as f32 / (size - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decaying bursts at the given times over a quiet background.
    fn plucked_signal(sample_rate: f64, duration: f64, attack_times: &[f64]) -> Vec<f32> {
        let n = (sample_rate * duration) as usize;
        let mut samples = vec![0.0f32; n];
        for &t in attack_times {
            let pos = (t * sample_rate) as usize;
            for i in 0..((sample_rate * 0.1) as usize).min(n.saturating_sub(pos)) {
                let envelope = (-40.0 * i as f32 / sample_rate as f32).exp();
                let tone =
                    (std::f64::consts::TAU * 440.0 * i as f64 / sample_rate).sin() as f32;
                samples[pos + i] += 0.8 * envelope * tone;
            }
        }
        samples
    }

    #[test]
    fn detects_separated_attacks() {
        let sample_rate = 44100.0;
        let signal = plucked_signal(sample_rate, 2.0, &[0.3, 0.8, 1.3]);

        let mut detector = OnsetDetector::new(sample_rate);
        detector.set_threshold(0.2);
        detector.set_sensitivity(2.0);
        let onsets = detector.detect(&signal);

        assert!(!onsets.is_empty(), "should find at least one attack");
        for onset in &onsets {
            assert!(onset.time >= 0.0 && onset.time <= 2.0);
            assert!((0.0..=1.0).contains(&onset.strength));
        }
        // Sorted by time
        for pair in onsets.windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
    }

    #[test]
    fn silence_yields_no_onsets() {
        let mut detector = OnsetDetector::new(44100.0);
        let onsets = detector.detect(&vec![0.0; 44100]);
        assert!(onsets.is_empty());
    }

    #[test]
    fn min_gap_suppresses_doubles() {
        let sample_rate = 44100.0;
        let signal = plucked_signal(sample_rate, 1.0, &[0.3, 0.32, 0.7]);

        let mut detector = OnsetDetector::new(sample_rate);
        detector.set_threshold(0.2);
        detector.set_sensitivity(2.0);
        detector.set_min_gap_seconds(0.1);
        let onsets = detector.detect(&signal);

        for pair in onsets.windows(2) {
            assert!(pair[1].time - pair[0].time >= 0.1 - 1e-6);
        }
    }

    #[test]
    fn segmented_detection_function_matches_full_pass() {
        // Computing the function over two adjoining frame ranges, with
        // one warm-up frame seeding the second pass, must reproduce the
        // single-pass values exactly.
        let sample_rate = 44100.0;
        let signal = plucked_signal(sample_rate, 2.0, &[0.3, 0.8, 1.3]);

        let mut detector = OnsetDetector::new(sample_rate);
        let full = detector.detection_function(&signal);
        assert!(full.len() > 4);

        let (fft_size, hop) = (detector.fft_size(), detector.hop_size());
        let split = full.len() / 2;

        detector.reset();
        let mut pieced = detector.detection_function(&signal[..(split - 1) * hop + fft_size]);

        detector.reset();
        let warm_start = (split - 1) * hop;
        let tail = detector.detection_function(&signal[warm_start..]);
        pieced.extend(
            tail.into_iter()
                .skip(1) // warm-up frame
                .map(|(pos, v)| (pos + warm_start, v)),
        );

        assert_eq!(full, pieced);
    }
}
