//! Baseband Modem - transmit side of the handheld baseband
//!
//! This crate turns a PCM byte stream into 8-bit IQ: fixed-point
//! resampling to the engine rate, subaudible tone keying, and AM or
//! direct-synthesis FM modulation.

pub mod audiotx;
pub mod error;
pub mod modulation;
pub mod tone;

pub use error::{ModemError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        audiotx::{source_format, AudioTxProcessor, AUDIO_DECIMATION, AUDIO_SUBBUFFER_LEN},
        error::{ModemError, Result},
        modulation::{AmModulator, FmModulator, Modulator, ModulatorKind},
        tone::ToneMixer,
    };
}
