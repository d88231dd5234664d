//! Error types for the spectrum crate

use thiserror::Error;

/// Spectrum error types
#[derive(Error, Debug)]
pub enum SpectrumError {
    #[error("Invalid FIFO size exponent: {k}")]
    InvalidFifoSize { k: u32 },

    #[error("Core error: {0}")]
    Core(#[from] baseband_core::CoreError),
}

/// Result type for spectrum operations
pub type Result<T> = std::result::Result<T, SpectrumError>;
