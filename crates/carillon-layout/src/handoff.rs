//! Geometry-builder handoff.
//!
//! The deliberate seam between "decide what to play" and "draw the
//! part": a [`BuildPlan`] is the exact input contract of the external
//! solid-model builder. Producing it is pure and total — no decisions,
//! no failures — so geometry code never needs to know about notes,
//! strengths, or drop policies.

use serde::{Deserialize, Serialize};

use carillon_core::MechanismSpec;

use crate::layout::PinLayout;

/// One pin for the solid builder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinPlacement {
    /// Lane (= tine) index; the builder resolves it to an axial offset.
    pub lane: usize,
    /// Angular position on the drum in radians, [0, 2π).
    pub angle_radians: f64,
    /// Radial protrusion in mm.
    pub pin_height: f64,
    /// Axial width in mm.
    pub pin_width: f64,
}

/// Overall drum dimensions the builder needs alongside the pins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrumDimensions {
    /// Circumference in mm.
    pub circumference: f64,
    /// Axial length in mm.
    pub axial_length: f64,
    /// Inner bore diameter in mm.
    pub bore_diameter: f64,
}

/// Complete input for the external geometry builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    /// Pins ordered by lane, then angle.
    pub pins: Vec<PinPlacement>,
    pub drum: DrumDimensions,
    /// Axial lane offsets in mm, indexed by lane.
    pub lane_offsets: Vec<f64>,
}

impl BuildPlan {
    /// Serialize a validated layout plus mechanism dimensions into the
    /// builder contract.
    pub fn from_layout(layout: &PinLayout, spec: &MechanismSpec) -> Self {
        let mut pins: Vec<PinPlacement> = layout
            .pins()
            .iter()
            .map(|pin| PinPlacement {
                lane: pin.tine_index,
                angle_radians: pin.angle,
                pin_height: spec.pin_height,
                pin_width: spec.pin_width,
            })
            .collect();
        pins.sort_by(|a, b| {
            a.lane
                .cmp(&b.lane)
                .then(a.angle_radians.total_cmp(&b.angle_radians))
        });

        Self {
            pins,
            drum: DrumDimensions {
                circumference: spec.circumference,
                axial_length: spec.axial_length,
                bore_diameter: spec.bore_diameter,
            },
            lane_offsets: spec.tines.iter().map(|t| t.lane_offset).collect(),
        }
    }
}
