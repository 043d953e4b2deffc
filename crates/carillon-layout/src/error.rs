//! Error types.

use thiserror::Error;

/// Error type.
///
/// Variants describe pin layout invariant violations. A layout produced
/// by the mapper never triggers them; they exist so externally supplied
/// layouts can be checked before geometry generation.
#[derive(Error, Debug)]
pub enum Error {
    /// Two pins in one lane sit closer than the minimum angular gap.
    #[error(
        "lane {lane}: pins at {angle_a:.4} rad and {angle_b:.4} rad are \
         {distance:.4} rad apart, minimum is {minimum:.4} rad"
    )]
    LaneCollision {
        lane: usize,
        angle_a: f64,
        angle_b: f64,
        distance: f64,
        minimum: f64,
    },

    /// A pin references a tine the comb does not have.
    #[error("pin references tine {tine_index}, comb has {tine_count} tines")]
    UnknownTine { tine_index: usize, tine_count: usize },

    /// A pin angle falls outside [0, 2π).
    #[error("pin angle {angle} rad outside [0, 2π)")]
    AngleOutOfRange { angle: f64 },
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
