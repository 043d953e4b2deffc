//! Band-pass pre-filter.
//!
//! Transcription only cares about fundamentals the comb can play, so the
//! extractor strips rumble and hiss first: a second-order high-pass and
//! low-pass in cascade (RBJ biquads, Butterworth Q), run forward and
//! backward for zero phase so onset positions do not shift.

const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Direct form I biquad section.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn lowpass(sample_rate: f64, cutoff_hz: f64) -> Self {
        let w0 = std::f64::consts::TAU * cutoff_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * BUTTERWORTH_Q);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos_w0) / 2.0 / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: (1.0 - cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    fn highpass(sample_rate: f64, cutoff_hz: f64) -> Self {
        let w0 = std::f64::consts::TAU * cutoff_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * BUTTERWORTH_Q);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 + cos_w0) / 2.0 / a0,
            b1: -(1.0 + cos_w0) / a0,
            b2: (1.0 + cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    fn run(&self, samples: &mut [f32]) {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for s in samples.iter_mut() {
            let x0 = *s as f64;
            let y0 = self.b0 * x0 + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
            x2 = x1;
            x1 = x0;
            y2 = y1;
            y1 = y0;
            *s = y0 as f32;
        }
    }
}

/// Zero-phase band-pass filter.
pub struct BandPass {
    highpass: Biquad,
    lowpass: Biquad,
}

impl BandPass {
    /// Pass band `[low_hz, high_hz]`. Cutoffs are clamped below Nyquist.
    pub fn new(sample_rate: f64, low_hz: f64, high_hz: f64) -> Self {
        let nyquist = sample_rate / 2.0;
        let low = low_hz.min(nyquist * 0.95);
        let high = high_hz.min(nyquist * 0.95).max(low);
        Self {
            highpass: Biquad::highpass(sample_rate, low),
            lowpass: Biquad::lowpass(sample_rate, high),
        }
    }

    /// Filter forward then backward (zero phase), returning a new buffer.
    pub fn apply(&self, samples: &[f32]) -> Vec<f32> {
        let mut out = samples.to_vec();
        self.highpass.run(&mut out);
        self.lowpass.run(&mut out);
        out.reverse();
        self.highpass.run(&mut out);
        self.lowpass.run(&mut out);
        out.reverse();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(sample_rate: f64, freq: f64, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (std::f64::consts::TAU * freq * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn passes_band_attenuates_outside() {
        let sample_rate = 44100.0;
        let filter = BandPass::new(sample_rate, 60.0, 2000.0);

        let in_band = filter.apply(&sine(sample_rate, 440.0, 44100));
        let below = filter.apply(&sine(sample_rate, 10.0, 44100));
        let above = filter.apply(&sine(sample_rate, 15000.0, 44100));

        let reference = rms(&in_band);
        assert!(reference > 0.5, "in-band signal should survive");
        assert!(rms(&below) < reference * 0.2, "rumble should be attenuated");
        assert!(rms(&above) < reference * 0.2, "hiss should be attenuated");
    }

    #[test]
    fn output_length_matches_input() {
        let filter = BandPass::new(48000.0, 60.0, 2000.0);
        assert_eq!(filter.apply(&vec![0.1; 1000]).len(), 1000);
        assert!(filter.apply(&[]).is_empty());
    }
}
