//! Error types.

use thiserror::Error;

/// Error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Unreadable or corrupt audio (non-finite samples, bad sample rate).
    #[error("decode error: {0}")]
    Decode(String),

    /// The sample rate or buffer is too small to resolve the mechanism's
    /// lowest tine pitch across the analysis window.
    #[error(
        "insufficient resolution: {sample_rate} Hz / {available} samples cannot \
         resolve {pitch_hz:.2} Hz (need at least {required} samples per analysis window)"
    )]
    InsufficientResolution {
        /// The lowest tine pitch the extractor must resolve.
        pitch_hz: f64,
        /// Sample rate of the offending input.
        sample_rate: f64,
        /// Samples available in the input.
        available: usize,
        /// Samples required for one analysis window.
        required: usize,
    },
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
