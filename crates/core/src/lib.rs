//! Baseband Core - shared DSP primitives for the handheld baseband
//!
//! This crate provides sample buffers, fixed-point resampling, biquad
//! filtering, FFT wrappers, level statistics and the message/status plumbing
//! every baseband processor is driven through.

pub mod buffer;
pub mod error;
pub mod fft;
pub mod filter;
pub mod message;
pub mod processor;
pub mod resample;
pub mod sine;
pub mod stats;
pub mod status;
pub mod stream;

pub use error::{CoreError, Result};

/// Engine sample rate of the radio IQ stream
pub const BASEBAND_RATE: u32 = 1_536_000;

/// Sample rate of the audio DMA stream
pub const AUDIO_RATE: u32 = 48_000;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        buffer::{Complex16, Complex32i, Complex8, IqBuffer, SampleBuffer, StereoFrame},
        error::{CoreError, Result},
        fft::{window::Window, FftConfig, FftProcessor},
        filter::{BiquadConfig, Filter, IirBiquad},
        message::{Message, StatusEvent},
        processor::{BasebandProcessor, EventDispatcher},
        resample::{PcmFormat, Resampler},
        status::EventSink,
        stream::{InputStream, OutputStream},
        AUDIO_RATE, BASEBAND_RATE,
    };
}
