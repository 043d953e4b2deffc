//! Pitch and onset extraction for the Carillon pipeline.
//!
//! Turns a raw [`Waveform`](carillon_core::Waveform) into an ordered
//! sequence of [`NoteEvent`](carillon_core::NoteEvent)s:
//!
//! - [`BandPass`] — zero-phase pre-filter over the musical range
//! - [`OnsetDetector`] — spectral-flux attack detection
//! - [`PitchEstimator`] — YIN monophonic pitch estimation
//! - [`NoteExtractor`] — the combined extraction stage
//!
//! # Feature Flags
//!
//! - `serialization` — serde derives on analysis result types

mod error;
mod extractor;
mod filter;
mod onset;
mod pitch;

pub use error::{Error, Result};
pub use extractor::{squeeze_to, ExtractorOptions, NoteExtractor};
pub use filter::BandPass;
pub use onset::{Onset, OnsetDetector};
pub use pitch::{PitchEstimate, PitchEstimator};
