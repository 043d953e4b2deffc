//! Centralized error type for the carillon umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate
//! boundaries while keeping the failing stage visible in the message.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] carillon_core::Error),

    #[error("extraction: {0}")]
    Analysis(#[from] carillon_analysis::Error),

    #[error("layout: {0}")]
    Layout(#[from] carillon_layout::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
