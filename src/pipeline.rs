//! The assembled audio-to-mechanism pipeline.

use tracing::info;

use carillon_analysis::{squeeze_to, NoteExtractor};
use carillon_core::{MechanismSpec, NoteEvent, Waveform};
use carillon_layout::{BuildPlan, DroppedNote, NoteMapper, PinLayout};

use crate::builder::CarillonPipelineBuilder;
use crate::Result;

/// Everything one pipeline run produces: the validated layout, the
/// geometry-builder contract derived from it, and the drop ledger for
/// user-facing reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub layout: PinLayout,
    pub build_plan: BuildPlan,
    pub dropped: Vec<DroppedNote>,
}

/// Audio in, manufacturable pin placements out.
///
/// A pipeline is stateless apart from its read-only configuration:
/// concurrent runs for different songs are independent, and running the
/// same input twice yields identical output.
///
/// ```
/// use carillon::prelude::*;
///
/// let pipeline = CarillonPipeline::builder().build()?;
///
/// // From a decoded waveform...
/// let wave = Waveform::new(vec![0.0; 44100], 44100.0);
/// let output = pipeline.run(&wave)?;
/// assert!(output.layout.is_empty()); // silence places no pins
///
/// // ...or from a ready-made note timeline (e.g. a song-retrieval
/// // assistant producing the same NoteEvent contract).
/// let notes = vec![NoteEvent::new(440.0, 1.0, 0.2, 0.8)];
/// let output = pipeline.run_notes(notes);
/// assert_eq!(output.layout.len(), 1);
/// # Ok::<(), carillon::Error>(())
/// ```
pub struct CarillonPipeline {
    extractor: NoteExtractor,
    mapper: NoteMapper,
    squeeze_to_revolution: bool,
    extraction_threads: usize,
}

impl CarillonPipeline {
    pub fn builder() -> CarillonPipelineBuilder {
        CarillonPipelineBuilder::default()
    }

    pub(crate) fn from_parts(
        extractor: NoteExtractor,
        mapper: NoteMapper,
        squeeze_to_revolution: bool,
        extraction_threads: usize,
    ) -> Self {
        Self {
            extractor,
            mapper,
            squeeze_to_revolution,
            extraction_threads,
        }
    }

    /// The mechanism this pipeline targets.
    pub fn mechanism(&self) -> &MechanismSpec {
        self.mapper.spec()
    }

    /// Run the full pipeline on a raw waveform.
    ///
    /// Fatal errors (corrupt audio, insufficient resolution) abort the
    /// run; musical infeasibility never does — infeasible notes end up
    /// in [`PipelineOutput::dropped`] with reason codes.
    pub fn run(&self, wave: &Waveform) -> Result<PipelineOutput> {
        let notes = if self.extraction_threads > 1 {
            self.extractor
                .extract_parallel(wave, self.extraction_threads)?
        } else {
            self.extractor.extract(wave)?
        };
        info!(notes = notes.len(), "extraction complete");
        Ok(self.run_notes(notes))
    }

    /// Run the quantize/map stages on a pre-existing note timeline.
    ///
    /// Alternate note producers feed the pipeline here; the contract and
    /// the collision policy are exactly the same as for audio input.
    pub fn run_notes(&self, mut notes: Vec<NoteEvent>) -> PipelineOutput {
        if self.squeeze_to_revolution {
            // Land the final onset just inside the revolution; an onset
            // exactly on the window boundary belongs to the next pass and
            // would be dropped.
            let target = self.mechanism().revolution_period * (1.0 - 1e-9);
            squeeze_to(&mut notes, target);
        }

        let result = self.mapper.map(&notes);
        info!(
            pins = result.layout.len(),
            dropped = result.dropped.len(),
            "mapping complete"
        );

        let build_plan = BuildPlan::from_layout(&result.layout, self.mechanism());
        PipelineOutput {
            layout: result.layout,
            build_plan,
            dropped: result.dropped,
        }
    }
}
