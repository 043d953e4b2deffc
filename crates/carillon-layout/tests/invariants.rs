//! Property tests for the mapper's correctness contract: whatever the
//! input, the produced layout satisfies every pin layout invariant and
//! the drop ledger accounts for every note.

use proptest::prelude::*;

use carillon_core::{MechanismSpec, NoteEvent};
use carillon_layout::{DropReason, NoteMapper};

fn arb_note() -> impl Strategy<Value = NoteEvent> {
    (
        100.0f64..3000.0, // pitches beyond the comb quantize to its edges
        0.0f64..60.0,     // onsets up to three revolutions
        0.01f64..30.0,
        0.0f32..=1.0,
    )
        .prop_map(|(pitch_hz, onset, duration, strength)| {
            NoteEvent::new(pitch_hz, onset, duration, strength)
        })
}

proptest! {
    #[test]
    fn layout_always_satisfies_invariants(
        notes in prop::collection::vec(arb_note(), 0..80),
        loop_revolutions in 1u32..4,
    ) {
        let spec = MechanismSpec::standard_18();
        let mapper = NoteMapper::new(spec.clone(), loop_revolutions).unwrap();
        let result = mapper.map(&notes);

        prop_assert!(result.layout.validate(&spec).is_ok());
    }

    #[test]
    fn every_note_is_placed_or_accounted_for(
        notes in prop::collection::vec(arb_note(), 0..80),
    ) {
        let mapper = NoteMapper::new(MechanismSpec::standard_18(), 1).unwrap();
        let result = mapper.map(&notes);

        prop_assert_eq!(
            notes.len(),
            result.layout.len() + result.dropped.len()
        );
        for drop in &result.dropped {
            prop_assert!(matches!(
                drop.reason,
                DropReason::TineSaturated | DropReason::DurationExceedsLoop
            ));
        }
    }

    #[test]
    fn mapping_twice_yields_identical_results(
        notes in prop::collection::vec(arb_note(), 0..40),
    ) {
        let mapper = NoteMapper::new(MechanismSpec::standard_18(), 2).unwrap();
        prop_assert_eq!(mapper.map(&notes), mapper.map(&notes));
    }

    #[test]
    fn placed_durations_never_escape_the_loop_window(
        notes in prop::collection::vec(arb_note(), 0..40),
        loop_revolutions in 1u32..3,
    ) {
        let spec = MechanismSpec::standard_18();
        let window = loop_revolutions as f64 * spec.revolution_period;
        let mapper = NoteMapper::new(spec, loop_revolutions).unwrap();
        let result = mapper.map(&notes);

        for pin in result.layout.pins() {
            prop_assert!(pin.note.onset < window);
            prop_assert!(pin.note.onset + pin.note.duration <= window + 1e-9);
        }
    }
}
