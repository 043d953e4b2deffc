//! Builder for configuring and constructing a `CarillonPipeline`.

use carillon_analysis::{ExtractorOptions, NoteExtractor};
use carillon_core::MechanismSpec;
use carillon_layout::NoteMapper;

use crate::{CarillonPipeline, Result};

/// Every recognized option is an explicit field here and validated at
/// build time — a malformed mechanism fails before any audio is touched.
///
/// # Example
///
/// ```
/// use carillon::CarillonPipeline;
///
/// let pipeline = CarillonPipeline::builder()
///     .loop_revolutions(2)
///     .onset_sensitivity(1.5)
///     .build()?;
/// # Ok::<(), carillon::Error>(())
/// ```
pub struct CarillonPipelineBuilder {
    mechanism: Option<MechanismSpec>,
    loop_revolutions: u32,
    noise_floor: f32,
    onset_sensitivity: f32,
    min_onset_gap: f64,
    squeeze_to_revolution: bool,
    extraction_threads: usize,
}

impl Default for CarillonPipelineBuilder {
    fn default() -> Self {
        let defaults = ExtractorOptions::default();
        Self {
            mechanism: None,
            loop_revolutions: 1,
            noise_floor: defaults.noise_floor,
            onset_sensitivity: defaults.onset_sensitivity,
            min_onset_gap: defaults.min_onset_gap,
            squeeze_to_revolution: false,
            extraction_threads: 1,
        }
    }
}

impl CarillonPipelineBuilder {
    /// Target mechanism. Default: [`MechanismSpec::standard_18`].
    pub fn mechanism(mut self, spec: MechanismSpec) -> Self {
        self.mechanism = Some(spec);
        self
    }

    /// How many drum revolutions the tune may span. Default: 1.
    pub fn loop_revolutions(mut self, revolutions: u32) -> Self {
        self.loop_revolutions = revolutions;
        self
    }

    /// Amplitude below which input counts as silence. Default: 1e-4.
    pub fn noise_floor(mut self, floor: f32) -> Self {
        self.noise_floor = floor;
        self
    }

    /// Onset detection gain; higher finds weaker attacks. Default: 1.0.
    pub fn onset_sensitivity(mut self, sensitivity: f32) -> Self {
        self.onset_sensitivity = sensitivity;
        self
    }

    /// Minimum seconds between two extracted onsets. Default: 0.05.
    pub fn min_onset_gap(mut self, gap: f64) -> Self {
        self.min_onset_gap = gap;
        self
    }

    /// Rescale extracted notes so the tune fills exactly one drum
    /// revolution, the way a longer excerpt is squeezed onto one
    /// cassette. Default: off.
    pub fn squeeze_to_revolution(mut self, enabled: bool) -> Self {
        self.squeeze_to_revolution = enabled;
        self
    }

    /// Worker threads for the extraction stage. Purely a performance
    /// knob; output ordering is identical. Default: 1.
    pub fn extraction_threads(mut self, threads: usize) -> Self {
        self.extraction_threads = threads.max(1);
        self
    }

    pub fn build(self) -> Result<CarillonPipeline> {
        let spec = self.mechanism.unwrap_or_else(MechanismSpec::standard_18);

        let extractor = NoteExtractor::with_options(
            &spec,
            ExtractorOptions {
                noise_floor: self.noise_floor,
                onset_sensitivity: self.onset_sensitivity,
                min_onset_gap: self.min_onset_gap,
            },
        );

        // Validates the mechanism (and loop count) eagerly.
        let mapper = NoteMapper::new(spec, self.loop_revolutions)?;

        Ok(CarillonPipeline::from_parts(
            extractor,
            mapper,
            self.squeeze_to_revolution,
            self.extraction_threads,
        ))
    }
}
