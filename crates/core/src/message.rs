//! Typed messages exchanged with the control side
//!
//! Inbound [`Message`]s configure a processor and are drained between ticks.
//! Outbound [`StatusEvent`]s are the only thing a processor reports back.

use crate::buffer::IQ_BUFFER_LEN;
use crate::resample::{BitDepth, ChannelCount, PcmFormat};
use crate::stats::{AudioStatistics, ChannelStatistics};
use crate::stream::InputStream;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output modulation of the transmit engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modulation {
    Am,
    #[default]
    Fm,
}

/// Audio transmit configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioTxConfig {
    /// Output samples between progress reports (0 reports every buffer)
    pub divider: u32,
    /// Peak FM deviation for a full-scale modulating value
    pub deviation_hz: u32,
    /// Per-sample phase increment of the subaudible tone
    pub tone_key_delta: u32,
    /// Tone share of the modulating signal, 0.0..=1.0
    pub tone_key_mix_weight: f32,
    /// Playback speed in percent
    pub speed: u32,
    pub bit_depth: BitDepth,
    pub channels: ChannelCount,
    pub modulation: Modulation,
}

impl AudioTxConfig {
    pub const MAX_DEVIATION_HZ: u32 = 500_000;
    pub const SPEED_RANGE: std::ops::RangeInclusive<u32> = 10..=1000;

    pub fn validate(&self) -> Result<()> {
        if self.deviation_hz > Self::MAX_DEVIATION_HZ {
            return Err(CoreError::InvalidConfig {
                msg: format!("deviation {} Hz out of range", self.deviation_hz),
            });
        }
        if !Self::SPEED_RANGE.contains(&self.speed) {
            return Err(CoreError::InvalidConfig {
                msg: format!("speed {}% out of range", self.speed),
            });
        }
        if !(0.0..=1.0).contains(&self.tone_key_mix_weight) {
            return Err(CoreError::InvalidConfig {
                msg: format!("tone mix weight {} out of range", self.tone_key_mix_weight),
            });
        }
        Ok(())
    }

    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat::new(self.bit_depth, self.channels)
    }
}

impl Default for AudioTxConfig {
    fn default() -> Self {
        Self {
            divider: 0,
            deviation_hz: 5_000,
            tone_key_delta: 0,
            tone_key_mix_weight: 0.0,
            speed: 100,
            bit_depth: BitDepth::Sixteen,
            channels: ChannelCount::Mono,
            modulation: Modulation::Fm,
        }
    }
}

/// Source sample rate of the attached stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerateConfig {
    pub sample_rate: u32,
}

fn unity_gain() -> i32 {
    1
}

/// Wideband spectrum accumulation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidebandSpectrumConfig {
    pub sampling_rate: u32,
    /// Buffers accumulated per flush, minus one
    pub trigger: u32,
    #[serde(default = "unity_gain")]
    pub gain: i32,
}

impl WidebandSpectrumConfig {
    /// Largest trigger whose accumulated bins still fit in `i32`.
    ///
    /// Every buffer adds `IQ_BUFFER_LEN / 256` samples of magnitude up to 128
    /// to each bin, and a cycle spans `trigger + 1` buffers.
    pub const MAX_TRIGGER: u32 = (i32::MAX as usize / (IQ_BUFFER_LEN / 256 * 128)) as u32 - 1;

    pub fn validate(&self) -> Result<()> {
        if self.sampling_rate == 0 {
            return Err(CoreError::InvalidSampleRate {
                rate: self.sampling_rate,
            });
        }
        if self.trigger > Self::MAX_TRIGGER {
            return Err(CoreError::InvalidConfig {
                msg: format!(
                    "trigger {} exceeds {}",
                    self.trigger,
                    Self::MAX_TRIGGER
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpectrumStreaming {
    Start,
    Stop,
}

/// Attach (`Some`) or release (`None`) the input stream
pub struct ReplayConfig {
    pub stream: Option<Box<dyn InputStream>>,
}

impl fmt::Debug for ReplayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayConfig")
            .field("attached", &self.stream.is_some())
            .finish()
    }
}

/// Inbound control message
#[derive(Debug)]
pub enum Message {
    AudioTxConfig(AudioTxConfig),
    ReplayConfig(ReplayConfig),
    SamplerateConfig(SamplerateConfig),
    /// First data landed in the input stream
    FifoData,
    WidebandSpectrumConfig(WidebandSpectrumConfig),
    SpectrumStreamingConfig(SpectrumStreaming),
    /// Idle-time request to turn the latest channel block into a spectrum frame
    UpdateSpectrum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestSignal {
    /// Input stream is ready and should be prefilled
    FillRequest,
}

/// Why a replay finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayDone {
    EndOfFile,
    ReadError,
}

impl ReplayDone {
    pub fn return_code(&self) -> u32 {
        match self {
            ReplayDone::EndOfFile => 1,
            ReplayDone::ReadError => 2,
        }
    }
}

/// Transmit progress, or the terminal outcome of a replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxProgress {
    /// Cumulative input bytes consumed
    Progress(u32),
    Done(ReplayDone),
}

/// Outbound status event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StatusEvent {
    RequestSignal(RequestSignal),
    TxProgress(TxProgress),
    AudioStatistics(AudioStatistics),
    ChannelStatistics(ChannelStatistics),
    /// Channel spectrum streaming started; the FIFO holds `1 << fifo_k` frames
    ChannelSpectrumConfig { fifo_k: u32 },
}
