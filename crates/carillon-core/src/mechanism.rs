//! Static model of the physical music box.
//!
//! A [`MechanismSpec`] describes the comb and the drum: which pitches
//! exist, how fast the drum turns, and how close two pins in the same
//! lane may sit before they fuse into one unprintable blob. It is
//! read-only configuration; the pipeline queries it, never mutates it.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::error::{Error, Result};
use crate::note::note_name_to_freq;

/// One fixed metal comb element, struck by pins in its reserved axial lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tine {
    /// Position in the physical comb, 0-based.
    pub index: usize,
    /// Fixed pitch of this tine in Hz.
    pub pitch_hz: f64,
    /// Axial offset (mm) of this tine's lane on the drum.
    pub lane_offset: f64,
}

/// Physical constants of the music box mechanism.
///
/// Validated eagerly via [`MechanismSpec::validate`]; every downstream
/// stage may assume a validated spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismSpec {
    /// Ordered comb, lowest tine first by convention (not required).
    pub tines: Vec<Tine>,
    /// Drum circumference in mm.
    pub circumference: f64,
    /// Seconds for one full drum rotation.
    pub revolution_period: f64,
    /// Radial pin protrusion in mm (how far the pin stands off the drum).
    pub pin_height: f64,
    /// Pin width along the drum axis in mm.
    pub pin_width: f64,
    /// Axial band (mm) reserved per tine.
    pub lane_width: f64,
    /// Minimum angular separation (radians) between two pins in the same
    /// lane. Derived from pin width plus print tolerance.
    pub min_pin_angular_gap: f64,
    /// Axial length of the drum in mm.
    pub axial_length: f64,
    /// Inner bore diameter of the drum in mm.
    pub bore_diameter: f64,
}

/// The comb of the reference 18-note movement, white keys C4 through F6.
/// Log-frequency margin within which [`MechanismSpec::nearest_tine`]
/// treats two tines as equidistant.
const NEAREST_TIE_MARGIN: f64 = 1e-9;

const STANDARD_NOTES: [&str; 18] = [
    "C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5", "D5", "E5", "F5", "G5", "A5", "B5", "C6",
    "D6", "E6", "F6",
];

impl MechanismSpec {
    /// The reference movement this project was built around: an 18-tine
    /// comb (C4..F6), a 13 mm drum turning once every 20 seconds, 16 mm
    /// of comb width, and a 20% arc safety margin between pins.
    pub fn standard_18() -> Self {
        let lane_width = 16.0 / STANDARD_NOTES.len() as f64;
        let pin_width = lane_width / 2.0;
        let diameter = 13.0;
        let radius = diameter / 2.0;
        let arc_safety_factor = 1.2;

        let tines = STANDARD_NOTES
            .iter()
            .enumerate()
            .map(|(index, name)| Tine {
                index,
                // Names in STANDARD_NOTES are all valid.
                pitch_hz: note_name_to_freq(name).unwrap(),
                lane_offset: index as f64 * lane_width,
            })
            .collect();

        Self {
            tines,
            circumference: PI * diameter,
            revolution_period: 20.0,
            pin_height: 0.5,
            pin_width,
            lane_width,
            min_pin_angular_gap: pin_width * arc_safety_factor / radius,
            axial_length: 17.5,
            bore_diameter: 5.0,
        }
    }

    /// Drum radius in mm.
    pub fn radius(&self) -> f64 {
        self.circumference / TAU
    }

    /// Lowest tine pitch in Hz (+∞ on an empty comb; call
    /// [`validate`](Self::validate) first).
    pub fn lowest_pitch(&self) -> f64 {
        self.tines
            .iter()
            .map(|t| t.pitch_hz)
            .fold(f64::INFINITY, f64::min)
    }

    /// Highest tine pitch in Hz.
    pub fn highest_pitch(&self) -> f64 {
        self.tines
            .iter()
            .map(|t| t.pitch_hz)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Check the physical configuration, returning
    /// [`Error::InvalidMechanismSpec`] with the offending value on the
    /// first violation. Run once at startup, before any audio work.
    pub fn validate(&self) -> Result<()> {
        if self.tines.is_empty() {
            return Err(Error::InvalidMechanismSpec("comb has no tines".into()));
        }
        for tine in &self.tines {
            if !(tine.pitch_hz.is_finite() && tine.pitch_hz > 0.0) {
                return Err(Error::InvalidMechanismSpec(format!(
                    "tine {} has non-positive pitch {} Hz",
                    tine.index, tine.pitch_hz
                )));
            }
        }
        // Indices must match positions so tine_index references are stable.
        for (position, tine) in self.tines.iter().enumerate() {
            if tine.index != position {
                return Err(Error::InvalidMechanismSpec(format!(
                    "tine at position {} carries index {}",
                    position, tine.index
                )));
            }
        }
        // Lanes must be a bijection with tines: no two tines may share an
        // axial band, or their pins would strike the wrong tine. Exact
        // abutment (offsets one lane width apart) is legal; the relative
        // margin absorbs rounding in offsets built as index * width.
        let overlap_limit = self.lane_width * (1.0 - 1e-9);
        for a in &self.tines {
            for b in &self.tines[a.index + 1..] {
                if (a.lane_offset - b.lane_offset).abs() < overlap_limit {
                    return Err(Error::InvalidMechanismSpec(format!(
                        "tines {} and {} share a lane (offsets {} mm and {} mm, lane width {} mm)",
                        a.index, b.index, a.lane_offset, b.lane_offset, self.lane_width
                    )));
                }
            }
        }
        for (value, label) in [
            (self.circumference, "circumference"),
            (self.revolution_period, "revolution period"),
            (self.pin_height, "pin height"),
            (self.pin_width, "pin width"),
            (self.lane_width, "lane width"),
            (self.axial_length, "axial length"),
            (self.bore_diameter, "bore diameter"),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidMechanismSpec(format!(
                    "{} must be positive, got {}",
                    label, value
                )));
            }
        }
        if !(self.min_pin_angular_gap > 0.0 && self.min_pin_angular_gap < TAU) {
            return Err(Error::InvalidMechanismSpec(format!(
                "min pin angular gap must be in (0, 2π), got {}",
                self.min_pin_angular_gap
            )));
        }
        Ok(())
    }

    /// Map an arbitrary frequency to the closest tine by log-frequency
    /// distance (musical pitch perception is logarithmic). Ties go to
    /// the lower tine index, with a small log-space margin so a midpoint
    /// computed in floating point still counts as equidistant. Total
    /// over a non-empty comb: every input maps to exactly one tine, and
    /// non-positive input clamps to the quietest representable pitch.
    /// Panics on an empty comb, which [`validate`](Self::validate)
    /// rejects.
    pub fn nearest_tine(&self, pitch_hz: f64) -> &Tine {
        let pitch = if pitch_hz.is_finite() && pitch_hz > 0.0 {
            pitch_hz
        } else {
            f64::MIN_POSITIVE
        };
        let log_pitch = pitch.ln();

        let mut best = &self.tines[0];
        let mut best_dist = (log_pitch - best.pitch_hz.ln()).abs();
        for tine in &self.tines[1..] {
            let dist = (log_pitch - tine.pitch_hz.ln()).abs();
            // A higher tine wins only when meaningfully closer; the
            // margin keeps rounding from stealing exact ties.
            if dist + NEAREST_TIE_MARGIN < best_dist {
                best = tine;
                best_dist = dist;
            }
        }
        best
    }

    /// Map an absolute time to an angular drum position and the revolution
    /// it falls on. Periodic: `angle_for(t + revolution_period)` has the
    /// same angle and the next revolution.
    pub fn angle_for(&self, time: f64) -> (f64, u32) {
        let revolution = (time / self.revolution_period).floor().max(0.0) as u32;
        let wrapped = time.rem_euclid(self.revolution_period);
        let angle = TAU * wrapped / self.revolution_period;
        // rem_euclid of t == period yields exactly period on some inputs
        // due to rounding; fold back into [0, 2π).
        (if angle >= TAU { 0.0 } else { angle }, revolution)
    }

    /// Minimum angular separation for pins in the given lane.
    ///
    /// Uniform across lanes on current hardware; per-lane so a future
    /// comb with mixed pin widths stays expressible.
    pub fn minimum_gap(&self, _lane_index: usize) -> f64 {
        self.min_pin_angular_gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn standard_18_is_valid() {
        let spec = MechanismSpec::standard_18();
        assert!(spec.validate().is_ok());
        assert_eq!(spec.tines.len(), 18);
        assert_relative_eq!(spec.lowest_pitch(), 261.6255653005986, epsilon = 1e-6);
        assert_relative_eq!(spec.highest_pitch(), 1396.9129257320155, epsilon = 1e-6);
    }

    #[test]
    fn standard_18_gap_matches_reference_hardware() {
        // pin_width * 1.2 / radius with 16/18/2 mm pins on a 6.5 mm radius
        let spec = MechanismSpec::standard_18();
        let expected = (16.0 / 18.0 / 2.0) * 1.2 / 6.5;
        assert_relative_eq!(spec.min_pin_angular_gap, expected, epsilon = 1e-12);
    }

    #[test]
    fn validate_rejects_empty_comb() {
        let mut spec = MechanismSpec::standard_18();
        spec.tines.clear();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validate_accepts_exactly_abutting_lanes() {
        // Offsets built as index * width differ from the width by up to
        // an ulp; abutting lanes must still pass.
        let mut spec = MechanismSpec::standard_18();
        let width = spec.lane_width;
        for (i, tine) in spec.tines.iter_mut().enumerate() {
            tine.lane_offset = i as f64 * width;
        }
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_lane() {
        let mut spec = MechanismSpec::standard_18();
        spec.tines[3].lane_offset = spec.tines[2].lane_offset;
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("share a lane"));
    }

    #[test]
    fn validate_rejects_nonpositive_dimensions() {
        let mut spec = MechanismSpec::standard_18();
        spec.revolution_period = 0.0;
        assert!(spec.validate().is_err());

        let mut spec = MechanismSpec::standard_18();
        spec.circumference = -1.0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn nearest_tine_is_total_and_deterministic() {
        let spec = MechanismSpec::standard_18();
        for freq in [-10.0, 0.0, 1.0, 100.0, 440.0, 441.0, 5000.0, f64::NAN] {
            let a = spec.nearest_tine(freq).index;
            let b = spec.nearest_tine(freq).index;
            assert_eq!(a, b);
        }
        // Out-of-range input clamps to the comb edges
        assert_eq!(spec.nearest_tine(1.0).index, 0);
        assert_eq!(spec.nearest_tine(50_000.0).index, 17);
    }

    #[test]
    fn nearest_tine_ties_go_to_lower_index() {
        // Geometric mean of two adjacent tine pitches is equidistant in
        // log-frequency space.
        let spec = MechanismSpec::standard_18();
        let (a, b) = (spec.tines[4].pitch_hz, spec.tines[5].pitch_hz);
        let midpoint = (a * b).sqrt();
        assert_eq!(spec.nearest_tine(midpoint).index, 4);
    }

    #[test]
    #[should_panic]
    fn nearest_tine_requires_a_nonempty_comb() {
        let mut spec = MechanismSpec::standard_18();
        spec.tines.clear();
        let _ = spec.nearest_tine(440.0);
    }

    #[test]
    fn nearest_tine_picks_exact_pitches() {
        let spec = MechanismSpec::standard_18();
        for tine in &spec.tines {
            assert_eq!(spec.nearest_tine(tine.pitch_hz).index, tine.index);
        }
    }

    #[test]
    fn angle_for_is_periodic() {
        let spec = MechanismSpec::standard_18();
        for t in [0.0, 0.1, 5.0, 13.37, 19.999] {
            let (angle, rev) = spec.angle_for(t);
            let (angle2, rev2) = spec.angle_for(t + spec.revolution_period);
            assert_relative_eq!(angle, angle2, epsilon = 1e-9);
            assert_eq!(rev + 1, rev2);
            assert!((0.0..TAU).contains(&angle));
        }
    }

    #[test]
    fn angle_for_maps_quarter_turn() {
        let spec = MechanismSpec::standard_18();
        let (angle, rev) = spec.angle_for(5.0);
        assert_relative_eq!(angle, TAU / 4.0, epsilon = 1e-12);
        assert_eq!(rev, 0);

        let (angle, rev) = spec.angle_for(25.0);
        assert_relative_eq!(angle, TAU / 4.0, epsilon = 1e-9);
        assert_eq!(rev, 1);
    }
}
