//! Baseband Spectrum - receive-side spectrum estimation
//!
//! The wideband accumulator folds every radio buffer onto 256 bins and
//! flushes a DC-corrected block at a fixed cadence. The collector turns
//! decimated channel blocks into display frames on request and hands them
//! to the display through a lock-free FIFO.

pub mod collector;
pub mod decim;
pub mod error;
pub mod fifo;
pub mod wideband;

pub use error::{Result, SpectrumError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        collector::{db_to_display, SpectrumCollector},
        decim::BlockDecimator,
        error::{Result, SpectrumError},
        fifo::{
            channel_spectrum_fifo, ChannelSpectrum, SpectrumConsumer, SpectrumProducer,
            CHANNEL_SPECTRUM_FIFO_K, CHANNEL_SPECTRUM_LEN,
        },
        wideband::{remove_dc, WidebandSpectrum},
    };
}
