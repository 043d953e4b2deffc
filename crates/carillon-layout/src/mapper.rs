//! Note quantization and pin placement.
//!
//! The mapper is the decision-making heart of the pipeline: every note
//! event is snapped to the nearest tine and drum angle, and lane
//! conflicts are resolved by a deterministic greedy pass. Processing in
//! onset order with strength-based displacement guarantees the resulting
//! layout satisfies the minimum-gap invariant by construction.

use tracing::debug;

use carillon_core::{sort_pipeline_order, Error, MechanismSpec, NoteEvent, Result};

use crate::layout::{angular_distance, DropReason, DroppedNote, MappedNote, PinLayout};

/// Result of one mapping pass: the layout plus the ledger of everything
/// that did not make it onto the drum. `|input| = |pins| + |dropped|`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingResult {
    pub layout: PinLayout,
    pub dropped: Vec<DroppedNote>,
}

/// Greedy quantizer/mapper over a validated mechanism.
pub struct NoteMapper {
    spec: MechanismSpec,
    loop_revolutions: u32,
}

impl NoteMapper {
    /// Validates the mechanism eagerly; mapping itself cannot fail.
    pub fn new(spec: MechanismSpec, loop_revolutions: u32) -> Result<Self> {
        spec.validate()?;
        if loop_revolutions < 1 {
            return Err(Error::InvalidMechanismSpec(
                "loop revolutions must be at least 1".into(),
            ));
        }
        Ok(Self {
            spec,
            loop_revolutions,
        })
    }

    pub fn spec(&self) -> &MechanismSpec {
        &self.spec
    }

    /// Map note events onto the drum.
    ///
    /// Events are processed in onset order (ties pitch-ascending). A new
    /// note colliding with existing pins in its lane displaces them only
    /// when every one of them is strictly weaker; otherwise the new note
    /// is dropped. All drops carry a reason code.
    pub fn map(&self, notes: &[NoteEvent]) -> MappingResult {
        let mut ordered = notes.to_vec();
        sort_pipeline_order(&mut ordered);

        let loop_window = self.loop_revolutions as f64 * self.spec.revolution_period;

        // Pins by insertion slot; displacement clears a slot instead of
        // shifting, so lane index lists stay valid.
        let mut pins: Vec<Option<MappedNote>> = Vec::with_capacity(ordered.len());
        let mut lanes: Vec<Vec<usize>> = vec![Vec::new(); self.spec.tines.len()];
        let mut dropped = Vec::new();

        for note in ordered {
            let tine = self.spec.nearest_tine(note.pitch_hz);

            if note.onset >= loop_window {
                debug!(
                    onset = note.onset,
                    pitch = note.pitch_hz,
                    "note beyond loop window, dropped"
                );
                dropped.push(DroppedNote {
                    note,
                    reason: DropReason::DurationExceedsLoop,
                });
                continue;
            }

            let (angle, revolution) = self.spec.angle_for(note.onset);
            let candidate = MappedNote {
                note: NoteEvent {
                    // A pin can only sound while the drum still turns.
                    duration: note.duration.min(loop_window - note.onset),
                    ..note
                },
                tine_index: tine.index,
                angle,
                revolution,
            };

            let gap = self.spec.minimum_gap(tine.index);
            let conflicts: Vec<usize> = lanes[tine.index]
                .iter()
                .copied()
                .filter(|&slot| {
                    pins[slot]
                        .map(|placed| angular_distance(placed.angle, angle) < gap)
                        .unwrap_or(false)
                })
                .collect();

            let displaces_all = conflicts.iter().all(|&slot| {
                pins[slot]
                    .map(|placed| placed.note.strength < candidate.note.strength)
                    .unwrap_or(true)
            });

            if !conflicts.is_empty() && !displaces_all {
                debug!(
                    onset = note.onset,
                    tine = tine.index,
                    "lane saturated, note dropped"
                );
                dropped.push(DroppedNote {
                    note,
                    reason: DropReason::TineSaturated,
                });
                continue;
            }

            for slot in conflicts {
                if let Some(displaced) = pins[slot].take() {
                    debug!(
                        onset = displaced.note.onset,
                        tine = tine.index,
                        "weaker pin displaced"
                    );
                    dropped.push(DroppedNote {
                        note: displaced.note,
                        reason: DropReason::TineSaturated,
                    });
                    lanes[tine.index].retain(|&s| s != slot);
                }
            }

            lanes[tine.index].push(pins.len());
            pins.push(Some(candidate));
        }

        let layout = PinLayout::from_pins(pins.into_iter().flatten().collect());
        debug_assert!(layout.validate(&self.spec).is_ok());

        MappingResult { layout, dropped }
    }
}
