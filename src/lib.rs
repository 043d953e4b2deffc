//! # Carillon - Audio-to-Mechanism Pipeline
//!
//! Turns a piece of music into the pin placements of a 3D-printable
//! music box cassette: raised pins on a rotating drum striking a fixed
//! comb of tuned tines.
//!
//! ## Architecture
//!
//! Carillon is an umbrella crate coordinating three stages:
//! - **carillon-core** - shared types: note events, waveforms, the
//!   read-only mechanism model (comb, drum, spacing constraints)
//! - **carillon-analysis** - pitch/onset extraction (YIN pitch tracking,
//!   spectral-flux onset detection, band-pass pre-filtering)
//! - **carillon-layout** - quantization onto the comb, deterministic
//!   collision resolution, and the geometry-builder handoff
//!
//! Data flows strictly forward: audio → note events → mapped notes →
//! validated pin layout → build plan. Each stage produces an immutable
//! result consumed by the next.
//!
//! ## Quick Start
//!
//! ```
//! use carillon::prelude::*;
//!
//! let pipeline = CarillonPipeline::builder()
//!     .loop_revolutions(1)
//!     .build()?;
//!
//! # let samples = vec![0.0f32; 44100];
//! let wave = Waveform::new(samples, 44100.0);
//! let output = pipeline.run(&wave)?;
//!
//! // output.build_plan goes to the solid-model builder;
//! // output.dropped reports anything the mechanism could not play.
//! # Ok::<(), carillon::Error>(())
//! ```
//!
//! What the pipeline deliberately does **not** do: mesh/STL generation
//! (consumed via the [`BuildPlan`] contract), audio file decoding, and
//! CLI handling.

/// Re-export of carillon-core for direct access
pub use carillon_core as core;

pub use carillon_core::{
    freq_to_midi, midi_to_freq, note_name_to_freq, sort_pipeline_order, MechanismSpec, NoteEvent,
    Tine, Waveform,
};

/// Analysis stage
pub use carillon_analysis as analysis;

pub use carillon_analysis::{
    ExtractorOptions, NoteExtractor, Onset, OnsetDetector, PitchEstimate, PitchEstimator,
};

/// Layout stage
pub use carillon_layout as layout;

pub use carillon_layout::{
    BuildPlan, DropReason, DroppedNote, DrumDimensions, MappedNote, MappingResult, NoteMapper,
    PinLayout, PinPlacement,
};

mod builder;
mod error;
mod pipeline;

pub use builder::CarillonPipelineBuilder;
pub use error::{Error, Result};
pub use pipeline::{CarillonPipeline, PipelineOutput};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{CarillonPipeline, CarillonPipelineBuilder, PipelineOutput};

    pub use crate::core::{MechanismSpec, NoteEvent, Tine, Waveform};

    pub use crate::layout::{BuildPlan, DropReason, DroppedNote, PinLayout};
}
