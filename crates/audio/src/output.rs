//! Audio conditioning and DMA packing
//!
//! Blocks of 32 samples are optionally squelched and filtered, converted to
//! saturated 16-bit frames, written into the next audio DMA buffer and copied
//! to the monitor stream when one is attached.

use crate::block::BlockBuffer;
use crate::dma::{AudioDma, AUDIO_TRANSFER_LEN};
use crate::squelch::FmSquelch;
use crate::{AudioError, Result};
use baseband_core::buffer::StereoFrame;
use baseband_core::filter::{BiquadConfig, Filter, IirBiquad};
use baseband_core::message::StatusEvent;
use baseband_core::stats::AudioStatsCollector;
use baseband_core::status::EventSink;
use baseband_core::stream::OutputStream;
use baseband_core::AUDIO_RATE;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Samples per processing block, one DMA transfer
pub const AUDIO_BLOCK_LEN: usize = AUDIO_TRANSFER_LEN;

/// Presence history kept when nothing else is configured
pub const DEFAULT_HISTORY_DEPTH: u32 = 64;

const TO_FLOAT: f32 = 1.0 / 32768.0;

/// Convert a normalised sample to 16 bits, clamping instead of wrapping
#[inline]
pub fn saturate_i16(sample: f32) -> i16 {
    let scaled = (sample * 32768.0) as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Placement of a stereo pair into the DMA frame.
///
/// The codec on the handheld is wired with its channels crossed, so the left
/// sample goes into the right slot by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMap {
    Straight,
    #[default]
    Swapped,
}

impl ChannelMap {
    #[inline]
    pub fn frame(&self, left: i16, right: i16) -> StereoFrame {
        match self {
            ChannelMap::Straight => StereoFrame { left, right },
            ChannelMap::Swapped => StereoFrame {
                left: right,
                right: left,
            },
        }
    }
}

/// Audio conditioning pipeline feeding an [`AudioDma`]
pub struct AudioOutput<D> {
    dma: D,
    blocks: BlockBuffer<f32, AUDIO_BLOCK_LEN>,
    hpf: [IirBiquad; 2],
    deemph: [IirBiquad; 2],
    squelch: FmSquelch,
    history: u64,
    history_mask: u64,
    present: bool,
    processing: bool,
    channel_map: ChannelMap,
    stream: Option<Box<dyn OutputStream>>,
    stats: AudioStatsCollector,
}

impl<D: AudioDma> AudioOutput<D> {
    /// Create a pipeline with pass-through filters, squelch off and processing on
    pub fn new(dma: D) -> Self {
        Self {
            dma,
            blocks: BlockBuffer::new(),
            hpf: [IirBiquad::default(), IirBiquad::default()],
            deemph: [IirBiquad::default(), IirBiquad::default()],
            squelch: FmSquelch::new(),
            history: 0,
            history_mask: depth_mask(DEFAULT_HISTORY_DEPTH),
            present: true,
            processing: true,
            channel_map: ChannelMap::default(),
            stream: None,
            stats: AudioStatsCollector::new(),
        }
    }

    /// Replace filter designs and squelch threshold (0 disables squelch)
    pub fn configure(
        &mut self,
        hpf: BiquadConfig,
        deemph: BiquadConfig,
        squelch_threshold: f32,
    ) -> Result<()> {
        self.squelch.set_threshold(squelch_threshold)?;
        for filter in &mut self.hpf {
            filter.configure(hpf);
        }
        for filter in &mut self.deemph {
            filter.configure(deemph);
        }
        debug!("Audio output configured, squelch threshold {}", squelch_threshold);
        Ok(())
    }

    /// Enable or bypass squelch and filtering
    pub fn set_processing(&mut self, enabled: bool) {
        self.processing = enabled;
    }

    /// Number of blocks a single present decision holds the squelch open
    pub fn set_history_depth(&mut self, depth: u32) -> Result<()> {
        if !(1..=64).contains(&depth) {
            return Err(AudioError::InvalidHistoryDepth { depth });
        }
        self.history_mask = depth_mask(depth);
        self.history &= self.history_mask;
        Ok(())
    }

    pub fn set_channel_map(&mut self, channel_map: ChannelMap) {
        self.channel_map = channel_map;
    }

    /// Attach or detach the monitor stream
    pub fn set_stream(&mut self, stream: Option<Box<dyn OutputStream>>) {
        self.stream = stream;
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_squelched(&self) -> bool {
        !self.present
    }

    pub fn dma(&self) -> &D {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut D {
        &mut self.dma
    }

    /// Mono 16-bit audio, batched into blocks across calls
    pub fn write(&mut self, samples: &[i16], events: &mut dyn EventSink) {
        for &sample in samples {
            if let Some(mut block) = self.blocks.push(sample as f32 * TO_FLOAT) {
                self.on_block(&mut block, events);
            }
        }
    }

    /// Mono normalised audio, batched into blocks across calls
    pub fn write_f32(&mut self, samples: &[f32], events: &mut dyn EventSink) {
        for &sample in samples {
            if let Some(mut block) = self.blocks.push(sample) {
                self.on_block(&mut block, events);
            }
        }
    }

    /// Stereo audio, processed directly in blocks; squelch follows the left channel
    pub fn write_stereo(&mut self, left: &[i16], right: &[i16], events: &mut dyn EventSink) {
        for (l, r) in left
            .chunks(AUDIO_BLOCK_LEN)
            .zip(right.chunks(AUDIO_BLOCK_LEN))
        {
            let len = l.len().min(r.len());
            let mut block_l = [0.0f32; AUDIO_BLOCK_LEN];
            let mut block_r = [0.0f32; AUDIO_BLOCK_LEN];
            for i in 0..len {
                block_l[i] = l[i] as f32 * TO_FLOAT;
                block_r[i] = r[i] as f32 * TO_FLOAT;
            }
            self.on_stereo_block(&mut block_l[..len], &mut block_r[..len], events);
        }
    }

    /// Raw stereo pass-through: no squelch or filtering, always forwarded
    pub fn write_direct(&mut self, left: &[i16], right: &[i16], events: &mut dyn EventSink) {
        for (l, r) in left
            .chunks(AUDIO_BLOCK_LEN)
            .zip(right.chunks(AUDIO_BLOCK_LEN))
        {
            let len = l.len().min(r.len());
            let mut mono = [0i16; AUDIO_BLOCK_LEN];
            let mut mono_f = [0.0f32; AUDIO_BLOCK_LEN];

            let buffer = self.dma.tx_empty_buffer();
            let filled = len.min(buffer.len());
            for i in 0..filled {
                buffer[i] = ChannelMap::Swapped.frame(l[i], r[i]);
                mono[i] = ((l[i] as i32 + r[i] as i32) / 2) as i16;
                mono_f[i] = mono[i] as f32 * TO_FLOAT;
            }
            buffer[filled..].fill(StereoFrame::default());

            if let Some(stream) = self.stream.as_mut() {
                stream.write(&mono[..len]);
            }
            self.feed_stats(&mono_f[..len], events);
        }
    }

    fn on_block(&mut self, block: &mut [f32], events: &mut dyn EventSink) {
        if self.processing {
            let present_now = self.squelch.execute(block);
            self.hpf[0].execute_in_place(block);
            self.deemph[0].execute_in_place(block);
            self.update_presence(present_now);
            if !self.present {
                block.fill(0.0);
            }
        } else {
            self.present = true;
        }

        let mut packed = [0i16; AUDIO_BLOCK_LEN];
        let buffer = self.dma.tx_empty_buffer();
        for (i, (slot, &sample)) in buffer.iter_mut().zip(block.iter()).enumerate() {
            let value = saturate_i16(sample);
            *slot = StereoFrame {
                left: value,
                right: value,
            };
            packed[i] = value;
        }

        if self.present {
            if let Some(stream) = self.stream.as_mut() {
                stream.write(&packed[..block.len()]);
            }
        }
        self.feed_stats(block, events);
    }

    fn on_stereo_block(&mut self, left: &mut [f32], right: &mut [f32], events: &mut dyn EventSink) {
        if self.processing {
            let present_now = self.squelch.execute(left);
            self.hpf[0].execute_in_place(left);
            self.hpf[1].execute_in_place(right);
            self.deemph[0].execute_in_place(left);
            self.deemph[1].execute_in_place(right);
            self.update_presence(present_now);
            if !self.present {
                left.fill(0.0);
                right.fill(0.0);
            }
        } else {
            self.present = true;
        }

        let mut mono = [0i16; AUDIO_BLOCK_LEN];
        let channel_map = self.channel_map;
        let buffer = self.dma.tx_empty_buffer();
        let filled = left.len().min(buffer.len());
        for (i, slot) in buffer[..filled].iter_mut().enumerate() {
            let l = saturate_i16(left[i]);
            let r = saturate_i16(right[i]);
            *slot = channel_map.frame(l, r);
            mono[i] = ((l as i32 + r as i32) / 2) as i16;
        }
        // Short final chunk: silence the rest of the transfer
        buffer[filled..].fill(StereoFrame::default());

        if self.present {
            if let Some(stream) = self.stream.as_mut() {
                stream.write(&mono[..left.len()]);
            }
        }
        self.feed_stats(left, events);
    }

    fn update_presence(&mut self, present_now: bool) {
        self.history = ((self.history << 1) | present_now as u64) & self.history_mask;
        self.present = self.history != 0;
    }

    fn feed_stats(&mut self, block: &[f32], events: &mut dyn EventSink) {
        if let Some(statistics) = self.stats.feed(block, AUDIO_RATE) {
            events.send(StatusEvent::AudioStatistics(statistics));
        }
    }
}

fn depth_mask(depth: u32) -> u64 {
    if depth >= 64 {
        u64::MAX
    } else {
        (1u64 << depth) - 1
    }
}
