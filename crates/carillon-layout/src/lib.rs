//! Note quantization, pin placement, and geometry handoff.
//!
//! The pipeline's decision stage: [`NoteMapper`] snaps note events onto
//! the physical comb and drum, resolves lane conflicts deterministically,
//! and emits a validated [`PinLayout`] plus a drop ledger. [`BuildPlan`]
//! serializes the result into the external geometry builder's contract.

mod error;
mod handoff;
mod layout;
mod mapper;

pub use error::{Error, Result};
pub use handoff::{BuildPlan, DrumDimensions, PinPlacement};
pub use layout::{angular_distance, DropReason, DroppedNote, MappedNote, PinLayout};
pub use mapper::{MappingResult, NoteMapper};
