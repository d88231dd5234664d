//! Baseband Audio - conditioning pipeline for demodulated and monitored audio
//!
//! Shared by the transmit monitor and the receive paths: batching into DMA
//! sized blocks, high-pass and de-emphasis filtering, noise squelch with a
//! hold-open history, saturated 16-bit packing and level statistics.

pub mod block;
pub mod dma;
pub mod error;
pub mod output;
pub mod squelch;

pub use error::{AudioError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        block::BlockBuffer,
        dma::{AudioDma, DmaRing, AUDIO_TRANSFER_LEN},
        error::{AudioError, Result},
        output::{saturate_i16, AudioOutput, ChannelMap, AUDIO_BLOCK_LEN},
        squelch::FmSquelch,
    };
}
