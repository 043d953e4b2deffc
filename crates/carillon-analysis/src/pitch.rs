//! Monophonic pitch estimation.
//!
//! Implements the YIN algorithm (de Cheveigné & Kawahara, 2002), an
//! autocorrelation-based estimator that is robust on plucked and struck
//! material — exactly what music box transcription sees. The estimator
//! returns raw frequencies; snapping to the comb happens later in the
//! quantizer.

/// Pitch estimate for a single analysis window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PitchEstimate {
    /// Detected fundamental in Hz (0.0 when unvoiced).
    pub frequency_hz: f64,
    /// Clarity of the detection, 0.0 - 1.0 (1 - aperiodicity).
    pub clarity: f32,
}

impl PitchEstimate {
    /// True when a periodic pitch was confidently found.
    pub fn is_voiced(&self) -> bool {
        self.frequency_hz > 0.0 && self.clarity > 0.0
    }
}

/// YIN pitch estimator over a fixed frequency range.
///
/// The range is normally derived from the comb: there is no point
/// resolving pitches the mechanism cannot play, and a narrow range keeps
/// the lag search short.
pub struct PitchEstimator {
    sample_rate: f64,
    min_freq: f64,
    max_freq: f64,
    /// YIN aperiodicity threshold; 0.1 per the original paper.
    threshold: f32,

    // Scratch buffers, sized for the longest lag.
    difference: Vec<f32>,
    normalized: Vec<f32>,
}

impl PitchEstimator {
    /// Create an estimator for frequencies in `[min_freq, max_freq]`.
    pub fn new(sample_rate: f64, min_freq: f64, max_freq: f64) -> Self {
        let max_lag = (sample_rate / min_freq).ceil() as usize;
        Self {
            sample_rate,
            min_freq,
            max_freq,
            threshold: 0.1,
            difference: vec![0.0; max_lag + 1],
            normalized: vec![0.0; max_lag + 1],
        }
    }

    /// Analysis window length: two periods of the lowest frequency.
    pub fn window_size(&self) -> usize {
        2 * (self.sample_rate / self.min_freq).ceil() as usize
    }

    /// Estimate the pitch of one window of samples.
    ///
    /// Returns an unvoiced (default) estimate when the window is too
    /// short or no periodicity is found.
    pub fn estimate(&mut self, window: &[f32]) -> PitchEstimate {
        let min_lag = (self.sample_rate / self.max_freq).floor() as usize;
        let max_lag = ((self.sample_rate / self.min_freq).ceil() as usize)
            .min(window.len() / 2)
            .min(self.difference.len() - 1);

        if max_lag <= min_lag || window.len() < max_lag * 2 {
            return PitchEstimate::default();
        }

        self.difference_function(window, max_lag);
        self.normalize_cumulative_mean(max_lag);

        let (lag, aperiodicity) = match self.first_minimum(min_lag, max_lag) {
            Some(found) => found,
            None => return PitchEstimate::default(),
        };

        let refined = self.refine_lag(lag, max_lag);
        PitchEstimate {
            frequency_hz: self.sample_rate / refined,
            clarity: (1.0 - aperiodicity).max(0.0),
        }
    }

    /// d(τ) = Σ_j (x[j] - x[j+τ])² over a window of `max_lag` samples,
    /// expanded as energy(0) + energy(τ) - 2·autocorr(τ) with prefix sums
    /// for the energy terms.
    fn difference_function(&mut self, window: &[f32], max_lag: usize) {
        let span = max_lag;

        let mut prefix_sq = vec![0.0f64; window.len() + 1];
        for (i, &s) in window.iter().enumerate() {
            prefix_sq[i + 1] = prefix_sq[i] + (s as f64) * (s as f64);
        }
        let energy = |start: usize| -> f64 {
            let end = (start + span).min(window.len());
            prefix_sq[end] - prefix_sq[start]
        };

        self.difference[0] = 0.0;
        for lag in 1..=max_lag {
            let mut autocorr = 0.0f64;
            for j in 0..span.min(window.len().saturating_sub(lag)) {
                autocorr += (window[j] as f64) * (window[j + lag] as f64);
            }
            self.difference[lag] = (energy(0) + energy(lag) - 2.0 * autocorr) as f32;
        }
    }

    /// d'(τ) = d(τ) · τ / Σ_{j≤τ} d(j), with d'(0) = 1.
    fn normalize_cumulative_mean(&mut self, max_lag: usize) {
        self.normalized[0] = 1.0;
        let mut running = 0.0f32;
        for lag in 1..=max_lag {
            running += self.difference[lag];
            self.normalized[lag] = if running > 1e-10 {
                self.difference[lag] * lag as f32 / running
            } else {
                1.0
            };
        }
    }

    /// The first local minimum below threshold, not the global one —
    /// taking the global minimum causes subharmonic (octave-down) errors.
    fn first_minimum(&self, min_lag: usize, max_lag: usize) -> Option<(usize, f32)> {
        let mut lag = min_lag;
        while lag < max_lag {
            if self.normalized[lag] < self.threshold {
                while lag + 1 < max_lag && self.normalized[lag + 1] < self.normalized[lag] {
                    lag += 1;
                }
                return Some((lag, self.normalized[lag]));
            }
            lag += 1;
        }

        // Noisy-but-periodic fallback: accept the global minimum when it
        // is still reasonably periodic.
        let (best_lag, best_val) = (min_lag..=max_lag)
            .map(|l| (l, self.normalized[l]))
            .min_by(|a, b| a.1.total_cmp(&b.1))?;
        (best_val < 0.5).then_some((best_lag, best_val))
    }

    /// Parabolic interpolation around the chosen lag for sub-sample
    /// accuracy.
    fn refine_lag(&self, lag: usize, max_lag: usize) -> f64 {
        if lag < 1 || lag >= max_lag {
            return lag as f64;
        }
        let (s0, s1, s2) = (
            self.normalized[lag - 1] as f64,
            self.normalized[lag] as f64,
            self.normalized[lag + 1] as f64,
        );
        let denom = 2.0 * (2.0 * s1 - s2 - s0);
        if denom.abs() > 1e-10 {
            lag as f64 + (s2 - s0) / denom
        } else {
            lag as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(sample_rate: f64, freq: f64, duration: f64) -> Vec<f32> {
        let n = (sample_rate * duration) as usize;
        (0..n)
            .map(|i| (std::f64::consts::TAU * freq * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    #[test]
    fn detects_a440() {
        let mut est = PitchEstimator::new(44100.0, 200.0, 2000.0);
        let window = sine(44100.0, 440.0, 0.1);
        let result = est.estimate(&window);
        assert!(result.is_voiced());
        assert!(
            (result.frequency_hz - 440.0).abs() < 5.0,
            "expected ~440 Hz, got {}",
            result.frequency_hz
        );
    }

    #[test]
    fn detects_across_the_comb_range() {
        // C4 through F6, the standard comb's extremes plus a middle pitch
        let mut est = PitchEstimator::new(44100.0, 200.0, 2000.0);
        for freq in [261.63, 659.26, 1396.91] {
            let window = sine(44100.0, freq, 0.1);
            let result = est.estimate(&window);
            assert!(result.is_voiced(), "should detect {freq} Hz");
            let err_pct = ((result.frequency_hz - freq) / freq).abs() * 100.0;
            assert!(
                err_pct < 2.0,
                "expected {freq} Hz, got {} ({err_pct:.2}% off)",
                result.frequency_hz
            );
        }
    }

    #[test]
    fn silence_is_unvoiced_or_uncertain() {
        let mut est = PitchEstimator::new(44100.0, 200.0, 2000.0);
        let result = est.estimate(&vec![0.0; 4096]);
        assert!(result.frequency_hz == 0.0 || result.clarity < 0.5);
    }

    #[test]
    fn short_window_is_unvoiced() {
        let mut est = PitchEstimator::new(44100.0, 200.0, 2000.0);
        let result = est.estimate(&[0.1, -0.1, 0.1]);
        assert!(!result.is_voiced());
    }

}
