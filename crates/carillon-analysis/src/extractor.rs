//! Note extraction: waveform in, ordered [`NoteEvent`]s out.
//!
//! Combines the band-pass pre-filter, onset detection, and YIN pitch
//! estimation into the pipeline's first stage. Per detected attack the
//! pitch is estimated from the windows that follow it, and the duration
//! runs until the next attack or until the signal decays below the noise
//! floor. Output events are time-ordered and carry raw frequencies; the
//! quantizer snaps them to the comb later.

use tracing::{debug, trace};

use carillon_core::{sort_pipeline_order, MechanismSpec, NoteEvent, Waveform};

use crate::error::{Error, Result};
use crate::filter::BandPass;
use crate::onset::{Onset, OnsetDetector};
use crate::pitch::PitchEstimator;

/// One semitone as a frequency ratio.
const SEMITONE: f64 = 1.059463094359295;

/// Periods of the lowest tine pitch one analysis window must span.
const PERIODS_PER_WINDOW: f64 = 4.0;

/// Tunable extraction parameters. Defaults match the reference hardware
/// recordings this pipeline was calibrated on.
#[derive(Debug, Clone, Copy)]
pub struct ExtractorOptions {
    /// Amplitude below which the signal counts as silent.
    pub noise_floor: f32,
    /// Onset detection-function gain; higher finds weaker attacks.
    pub onset_sensitivity: f32,
    /// Minimum seconds between two reported onsets.
    pub min_onset_gap: f64,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            noise_floor: 1e-4,
            onset_sensitivity: 1.0,
            min_onset_gap: 0.05,
        }
    }
}

/// Pitch/onset extractor configured for a specific mechanism.
///
/// The pitch search range comes from the comb, widened a semitone on
/// each side so off-pitch playing still resolves; frequencies the
/// mechanism cannot play are not worth searching for.
pub struct NoteExtractor {
    lowest_tine_hz: f64,
    min_freq: f64,
    max_freq: f64,
    options: ExtractorOptions,
}

impl NoteExtractor {
    pub fn new(spec: &MechanismSpec) -> Self {
        Self::with_options(spec, ExtractorOptions::default())
    }

    pub fn with_options(spec: &MechanismSpec, options: ExtractorOptions) -> Self {
        let lowest = spec.lowest_pitch();
        let highest = spec.highest_pitch();
        Self {
            lowest_tine_hz: lowest,
            min_freq: lowest / SEMITONE,
            max_freq: highest * SEMITONE,
            options,
        }
    }

    /// Samples one analysis window must span at the given rate.
    fn required_window(&self, sample_rate: f64) -> usize {
        (PERIODS_PER_WINDOW * sample_rate / self.lowest_tine_hz).ceil() as usize
    }

    /// Extract note events from a waveform.
    ///
    /// Silent or empty input yields an empty sequence. Corrupt input
    /// fails with [`Error::Decode`]; input that cannot resolve the
    /// lowest tine fails with [`Error::InsufficientResolution`].
    pub fn extract(&self, wave: &Waveform) -> Result<Vec<NoteEvent>> {
        let Some(filtered) = self.prepare(wave)? else {
            return Ok(Vec::new());
        };
        let sample_rate = wave.sample_rate();

        let onsets = self.detect_onsets(&filtered, sample_rate);
        debug!(onsets = onsets.len(), "onset detection complete");

        let pitched = self.pitch_onsets(&filtered, sample_rate, &onsets);
        Ok(self.assemble(&filtered, sample_rate, pitched))
    }

    /// Like [`extract`](Self::extract), but spreads the detection
    /// function and per-onset pitch estimation over worker threads.
    /// Peak thresholding and strength normalization run over the merged
    /// detection function, so the output is identical to the serial
    /// path, bit for bit.
    pub fn extract_parallel(&self, wave: &Waveform, threads: usize) -> Result<Vec<NoteEvent>> {
        let Some(filtered) = self.prepare(wave)? else {
            return Ok(Vec::new());
        };
        let sample_rate = wave.sample_rate();

        let (onsets, pitched) = if threads > 1 {
            let onsets = self.detect_onsets_parallel(&filtered, sample_rate, threads);
            let pitched = self.pitch_onsets_parallel(&filtered, sample_rate, &onsets, threads);
            (onsets, pitched)
        } else {
            let onsets = self.detect_onsets(&filtered, sample_rate);
            let pitched = self.pitch_onsets(&filtered, sample_rate, &onsets);
            (onsets, pitched)
        };
        debug!(onsets = onsets.len(), "onset detection complete");
        Ok(self.assemble(&filtered, sample_rate, pitched))
    }

    /// Validate input and run the pre-filter. `Ok(None)` means silent or
    /// empty input: a legitimate empty extraction, not an error.
    fn prepare(&self, wave: &Waveform) -> Result<Option<Vec<f32>>> {
        if wave.is_empty() {
            return Ok(None);
        }
        if !wave.is_well_formed() {
            return Err(Error::Decode(format!(
                "waveform is not well-formed (sample rate {}, {} samples)",
                wave.sample_rate(),
                wave.len()
            )));
        }

        let sample_rate = wave.sample_rate();
        let required = self.required_window(sample_rate);
        if sample_rate < PERIODS_PER_WINDOW * self.lowest_tine_hz || wave.len() < required {
            return Err(Error::InsufficientResolution {
                pitch_hz: self.lowest_tine_hz,
                sample_rate,
                available: wave.len(),
                required,
            });
        }

        if wave.is_silent(self.options.noise_floor) {
            return Ok(None);
        }

        let band = BandPass::new(sample_rate, self.min_freq.min(60.0), self.max_freq.max(2000.0));
        Ok(Some(band.apply(wave.samples())))
    }

    fn configured_detector(&self, sample_rate: f64) -> OnsetDetector {
        let mut detector = OnsetDetector::new(sample_rate);
        detector.set_sensitivity(self.options.onset_sensitivity * 2.0);
        detector.set_threshold(0.2);
        detector.set_min_gap_seconds(self.options.min_onset_gap);
        detector
    }

    fn detect_onsets(&self, samples: &[f32], sample_rate: f64) -> Vec<Onset> {
        self.configured_detector(sample_rate).detect(samples)
    }

    /// Detection function in frame chunks on worker threads; one warm-up
    /// frame per chunk seeds the inter-frame flux state. Peak picking
    /// and min-gap filtering then run over the merged function, so the
    /// onsets and their strengths match the serial pass exactly.
    fn detect_onsets_parallel(
        &self,
        samples: &[f32],
        sample_rate: f64,
        threads: usize,
    ) -> Vec<Onset> {
        let detector = self.configured_detector(sample_rate);
        let (fft_size, hop) = (detector.fft_size(), detector.hop_size());
        if samples.len() < fft_size {
            return Vec::new();
        }

        let num_frames = (samples.len() - fft_size) / hop + 1;
        let chunk = num_frames.div_ceil(threads);
        let mut detection: Vec<(usize, f32)> = Vec::with_capacity(num_frames);
        std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for lo in (0..num_frames).step_by(chunk) {
                let hi = (lo + chunk).min(num_frames);
                handles.push(scope.spawn(move || {
                    let mut worker = self.configured_detector(sample_rate);
                    let warm = usize::from(lo > 0);
                    let start = (lo - warm) * hop;
                    let end = ((hi - 1) * hop + fft_size).min(samples.len());
                    worker
                        .detection_function(&samples[start..end])
                        .into_iter()
                        .skip(warm)
                        .map(|(pos, value)| (pos + start, value))
                        .collect::<Vec<_>>()
                }));
            }
            // Join in spawn order: the merged function is in frame order.
            for handle in handles {
                detection.extend(handle.join().expect("onset worker panicked"));
            }
        });

        detector.onsets_from_detection(&detection)
    }

    /// Estimate a pitch for each onset from the windows that follow it.
    /// Onsets with no stable pitch are discarded here; a pin needs a tine.
    fn pitch_onsets(
        &self,
        samples: &[f32],
        sample_rate: f64,
        onsets: &[Onset],
    ) -> Vec<(Onset, f64)> {
        let mut estimator = PitchEstimator::new(sample_rate, self.min_freq, self.max_freq);
        let window = estimator.window_size();
        let hop = window / 2;

        let mut pitched = Vec::with_capacity(onsets.len());
        for &onset in onsets {
            let mut voiced: Vec<f64> = (0..3)
                .filter_map(|i| {
                    let start = onset.sample_position + i * hop;
                    let frame = samples.get(start..start + window)?;
                    let estimate = estimator.estimate(frame);
                    estimate.is_voiced().then_some(estimate.frequency_hz)
                })
                .collect();

            if voiced.is_empty() {
                trace!(time = onset.time, "onset without stable pitch, skipped");
                continue;
            }
            voiced.sort_by(f64::total_cmp);
            let median = voiced[voiced.len() / 2];

            // Stability gate: estimates scattered across more than a
            // semitone mean the attack was noise, not a note.
            let spread_ok = voiced[voiced.len() - 1] / voiced[0] <= SEMITONE;
            if !spread_ok {
                trace!(time = onset.time, "pitch unstable across windows, skipped");
                continue;
            }

            pitched.push((onset, median));
        }
        pitched
    }

    /// Per-onset pitch estimation over worker threads. Each estimate
    /// depends only on its own windows, so chunking the onset list and
    /// joining in order reproduces the serial output.
    fn pitch_onsets_parallel(
        &self,
        samples: &[f32],
        sample_rate: f64,
        onsets: &[Onset],
        threads: usize,
    ) -> Vec<(Onset, f64)> {
        let chunk = onsets.len().div_ceil(threads).max(1);
        let mut pitched = Vec::with_capacity(onsets.len());
        std::thread::scope(|scope| {
            let handles: Vec<_> = onsets
                .chunks(chunk)
                .map(|part| scope.spawn(move || self.pitch_onsets(samples, sample_rate, part)))
                .collect();
            for handle in handles {
                pitched.extend(handle.join().expect("pitch worker panicked"));
            }
        });
        pitched
    }

    /// Build final events: duration runs to the next onset or to the
    /// first point where the signal decays below the noise floor.
    fn assemble(
        &self,
        samples: &[f32],
        sample_rate: f64,
        pitched: Vec<(Onset, f64)>,
    ) -> Vec<NoteEvent> {
        let buffer_end = samples.len() as f64 / sample_rate;
        let mut notes = Vec::with_capacity(pitched.len());

        for (i, &(onset, pitch)) in pitched.iter().enumerate() {
            let next_onset = pitched
                .get(i + 1)
                .map(|(o, _)| o.time)
                .unwrap_or(buffer_end);
            let decay = self.decay_time(samples, sample_rate, onset.sample_position);
            let end = next_onset.min(decay).min(buffer_end);
            let duration = (end - onset.time).max(1.0 / sample_rate);

            notes.push(NoteEvent::new(pitch, onset.time, duration, onset.strength));
        }

        sort_pipeline_order(&mut notes);
        notes
    }

    /// First time after `start` where a ~10 ms RMS drops below the noise
    /// floor, or the buffer end.
    fn decay_time(&self, samples: &[f32], sample_rate: f64, start: usize) -> f64 {
        let chunk = ((sample_rate * 0.01) as usize).max(1);
        let mut pos = start + chunk;
        while pos + chunk <= samples.len() {
            let energy: f32 = samples[pos..pos + chunk].iter().map(|s| s * s).sum();
            let rms = (energy / chunk as f32).sqrt();
            if rms < self.options.noise_floor {
                return pos as f64 / sample_rate;
            }
            pos += chunk;
        }
        samples.len() as f64 / sample_rate
    }
}

/// Uniformly rescale onsets and durations so the last onset lands at
/// `target` seconds. Used to squeeze a longer excerpt into one drum
/// revolution. No-op for empty input or a zero time span.
pub fn squeeze_to(notes: &mut [NoteEvent], target: f64) {
    let Some(last) = notes.iter().map(|n| n.onset).reduce(f64::max) else {
        return;
    };
    if last <= 0.0 || target <= 0.0 {
        return;
    }
    let scale = target / last;
    for note in notes.iter_mut() {
        note.onset *= scale;
        note.duration *= scale;
    }
}
