//! Error types for the baseband core

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid sample rate: {rate}")]
    InvalidSampleRate { rate: u32 },

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid filter parameters: {msg}")]
    InvalidFilterParameters { msg: String },

    #[error("FFT error: {msg}")]
    FftError { msg: String },

    #[error("Invalid configuration: {msg}")]
    InvalidConfig { msg: String },

    #[error("Resampling error: {msg}")]
    ResampleError { msg: String },
}

/// Result type for baseband core operations
pub type Result<T> = std::result::Result<T, CoreError>;
