//! Channel spectrum collection for the display
//!
//! Processing only copies a decimated block and raises a request; the FFT
//! and dB mapping run later on an `UpdateSpectrum` message so they never
//! compete with the tick deadline.

use crate::decim::BlockDecimator;
use crate::fifo::{
    channel_spectrum_fifo, ChannelSpectrum, SpectrumConsumer, SpectrumProducer,
    CHANNEL_SPECTRUM_LEN,
};
use crate::Result;
use baseband_core::buffer::Complex16;
use baseband_core::fft::window::Window;
use baseband_core::fft::{FftConfig, FftProcessor};
use baseband_core::message::{SpectrumStreaming, StatusEvent};
use baseband_core::stats::mag2_to_dbv_norm;
use baseband_core::status::EventSink;
use rustfft::num_complex::Complex32;
use tracing::{debug, warn};

const DB_SCALE: f32 = 5.0;
const FULL_SCALE: f32 = 1.0 / 32768.0;

/// Map a bin to the 0..=255 display scale, 0.2 dB per step below full scale
#[inline]
pub fn db_to_display(mag2: f32) -> u8 {
    let v = mag2_to_dbv_norm(mag2) * DB_SCALE + 255.0;
    v.clamp(0.0, 255.0) as u8
}

pub struct SpectrumCollector {
    decimator: BlockDecimator<Complex16, CHANNEL_SPECTRUM_LEN>,
    fft: FftProcessor,
    fifo: SpectrumProducer,
    window: Window,
    streaming: bool,
    request_update: bool,
    channel_spectrum: Vec<Complex32>,
    windowed: Vec<Complex32>,
    sampling_rate: u32,
    pass_frequency: u32,
    stop_frequency: u32,
}

impl SpectrumCollector {
    /// Create a collector whose FIFO holds `1 << fifo_k` frames
    pub fn new(fifo_k: u32) -> Result<(Self, SpectrumConsumer)> {
        let (fifo, consumer) = channel_spectrum_fifo(fifo_k)?;
        let fft = FftProcessor::new(FftConfig::new(CHANNEL_SPECTRUM_LEN, 1)?)?;

        let collector = Self {
            decimator: BlockDecimator::new(1),
            fft,
            fifo,
            window: Window::Hamming3,
            streaming: false,
            request_update: false,
            channel_spectrum: vec![Complex32::new(0.0, 0.0); CHANNEL_SPECTRUM_LEN],
            windowed: vec![Complex32::new(0.0, 0.0); CHANNEL_SPECTRUM_LEN],
            sampling_rate: 0,
            pass_frequency: 0,
            stop_frequency: 0,
        };
        Ok((collector, consumer))
    }

    pub fn set_decimation_factor(&mut self, factor: usize) {
        self.decimator.set_factor(factor);
    }

    pub fn set_window(&mut self, window: Window) {
        self.window = window;
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// A block is waiting for [`update`](Self::update)
    pub fn update_pending(&self) -> bool {
        self.request_update
    }

    /// Frames dropped because the display side fell behind
    pub fn dropped(&self) -> u64 {
        self.fifo.dropped()
    }

    pub fn set_state(&mut self, state: SpectrumStreaming, events: &mut dyn EventSink) {
        match state {
            SpectrumStreaming::Start => self.start(events),
            SpectrumStreaming::Stop => self.stop(),
        }
    }

    pub fn start(&mut self, events: &mut dyn EventSink) {
        self.streaming = true;
        events.send(StatusEvent::ChannelSpectrumConfig {
            fifo_k: self.fifo.k(),
        });
        debug!("Channel spectrum streaming started");
    }

    pub fn stop(&mut self) {
        self.streaming = false;
        debug!("Channel spectrum streaming stopped");
    }

    /// Offer channel samples; keeps at most one block until it is consumed
    pub fn feed(
        &mut self,
        channel: &[Complex16],
        sampling_rate: u32,
        filter_pass_frequency: u32,
        filter_stop_frequency: u32,
    ) {
        self.pass_frequency = filter_pass_frequency;
        self.stop_frequency = filter_stop_frequency;

        let streaming = self.streaming;
        let request_update = &mut self.request_update;
        let spectrum = &mut self.channel_spectrum;
        let block_rate = &mut self.sampling_rate;
        self.decimator.feed(channel, sampling_rate, |block, rate| {
            if streaming && !*request_update {
                for (dst, src) in spectrum.iter_mut().zip(block.iter()) {
                    *dst = Complex32::new(src.re as f32, src.im as f32);
                }
                *block_rate = rate;
                *request_update = true;
            }
        });
    }

    /// Turn the pending block into a display frame and queue it
    pub fn update(&mut self) {
        if self.streaming && self.request_update {
            if let Err(e) = self.fft.forward_swapped(&mut self.channel_spectrum) {
                warn!("Channel spectrum FFT failed: {}", e);
                self.request_update = false;
                return;
            }
            self.window.apply(&self.channel_spectrum, &mut self.windowed);

            let mut frame = ChannelSpectrum {
                sampling_rate: self.sampling_rate,
                channel_filter_pass_frequency: self.pass_frequency,
                channel_filter_stop_frequency: self.stop_frequency,
                ..Default::default()
            };
            for (db, bin) in frame.db.iter_mut().zip(self.windowed.iter()) {
                *db = db_to_display((*bin * FULL_SCALE).norm_sqr());
            }

            if !self.fifo.push(frame) {
                warn!(
                    "Channel spectrum FIFO full, {} frames dropped",
                    self.fifo.dropped()
                );
            }
        }
        self.request_update = false;
    }
}
