//! Core types for the Carillon pipeline.
//!
//! Everything downstream of raw audio is expressed with the types in this
//! crate: [`Waveform`] comes in, [`NoteEvent`]s flow through, and the
//! read-only [`MechanismSpec`] describes the physical music box every
//! stage must respect.

mod error;
mod mechanism;
mod note;
mod waveform;

pub use error::{Error, Result};
pub use mechanism::{MechanismSpec, Tine};
pub use note::{
    freq_to_midi, midi_to_freq, note_name_to_freq, sort_pipeline_order, NoteEvent,
};
pub use waveform::Waveform;
