//! Error types.

use thiserror::Error;

/// Error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed physical configuration. Raised by [`crate::MechanismSpec::validate`]
    /// before any audio is processed.
    #[error("invalid mechanism spec: {0}")]
    InvalidMechanismSpec(String),
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
