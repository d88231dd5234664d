//! Error types for the baseband modem

use thiserror::Error;

/// Modem error types
#[derive(Error, Debug)]
pub enum ModemError {
    #[error("Unsupported source format: {msg}")]
    UnsupportedFormat { msg: String },

    #[error("Audio error: {0}")]
    Audio(#[from] baseband_audio::AudioError),

    #[error("Core error: {0}")]
    Core(#[from] baseband_core::CoreError),
}

/// Result type for baseband modem operations
pub type Result<T> = std::result::Result<T, ModemError>;
