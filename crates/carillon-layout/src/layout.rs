//! Pin layout: the validated result of mapping, and the drop ledger.
//!
//! A [`PinLayout`] is the sole contract surface handed to geometry
//! generation. It is produced once by the mapper and never edited in
//! place; conflict resolution builds a new layout and records what was
//! dropped and why.

use std::f64::consts::TAU;
use std::fmt;

use serde::{Deserialize, Serialize};

use carillon_core::{MechanismSpec, NoteEvent};

use crate::error::{Error, Result};

/// A note event bound to a physical tine and drum position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappedNote {
    /// The source event (duration already clipped to the loop window).
    pub note: NoteEvent,
    /// Index of the tine this pin strikes.
    pub tine_index: usize,
    /// Angular drum position in [0, 2π).
    pub angle: f64,
    /// Which drum pass this note falls on (0-based).
    pub revolution: u32,
}

/// Why a note did not become a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropReason {
    /// The target lane already holds a pin too close in angle.
    TineSaturated,
    /// The onset falls beyond the configured loop window.
    DurationExceedsLoop,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::TineSaturated => write!(f, "tine-saturated"),
            DropReason::DurationExceedsLoop => write!(f, "duration-exceeds-loop"),
        }
    }
}

/// A note dropped during mapping, kept for user-facing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DroppedNote {
    pub note: NoteEvent,
    pub reason: DropReason,
}

/// Validated set of pins, one [`MappedNote`] per physical pin.
///
/// Invariants (checked by [`validate`](Self::validate), guaranteed by
/// construction when coming from the mapper):
/// 1. no two pins in a lane closer than the lane's minimum angular gap,
///    with wraparound at 0/2π
/// 2. every tine index references an existing tine
/// 3. every angle lies in [0, 2π)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PinLayout {
    pins: Vec<MappedNote>,
}

impl PinLayout {
    pub(crate) fn from_pins(pins: Vec<MappedNote>) -> Self {
        Self { pins }
    }

    pub fn pins(&self) -> &[MappedNote] {
        &self.pins
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Check all layout invariants against the mechanism, reporting the
    /// first violation.
    pub fn validate(&self, spec: &MechanismSpec) -> Result<()> {
        for pin in &self.pins {
            if pin.tine_index >= spec.tines.len() {
                return Err(Error::UnknownTine {
                    tine_index: pin.tine_index,
                    tine_count: spec.tines.len(),
                });
            }
            if !(0.0..TAU).contains(&pin.angle) {
                return Err(Error::AngleOutOfRange { angle: pin.angle });
            }
        }

        for (i, a) in self.pins.iter().enumerate() {
            for b in &self.pins[i + 1..] {
                if a.tine_index != b.tine_index {
                    continue;
                }
                let distance = angular_distance(a.angle, b.angle);
                let minimum = spec.minimum_gap(a.tine_index);
                if distance < minimum {
                    return Err(Error::LaneCollision {
                        lane: a.tine_index,
                        angle_a: a.angle,
                        angle_b: b.angle,
                        distance,
                        minimum,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Shortest angular distance between two angles in [0, 2π), accounting
/// for wraparound.
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs();
    diff.min(TAU - diff)
}
