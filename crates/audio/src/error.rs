//! Error types for the audio pipeline

use thiserror::Error;

/// Audio pipeline error types
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Invalid squelch threshold: {threshold}")]
    InvalidThreshold { threshold: f32 },

    #[error("Invalid history depth {depth}, expected 1..=64")]
    InvalidHistoryDepth { depth: u32 },

    #[error("DMA ring needs at least one transfer buffer")]
    EmptyDmaRing,

    #[error("Core error: {0}")]
    Core(#[from] baseband_core::CoreError),
}

/// Result type for audio pipeline operations
pub type Result<T> = std::result::Result<T, AudioError>;
