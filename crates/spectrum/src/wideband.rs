//! Wideband spectrum accumulator
//!
//! Each hardware buffer is folded onto 256 bins and summed over
//! `trigger + 1` buffers. A flush removes the DC offset, applies gain and
//! hands the bins to the channel statistics and the spectrum collector.

use crate::collector::SpectrumCollector;
use crate::fifo::CHANNEL_SPECTRUM_LEN;
use baseband_core::buffer::{Complex16, Complex32i, IqBuffer};
use baseband_core::message::{Message, StatusEvent, WidebandSpectrumConfig};
use baseband_core::processor::BasebandProcessor;
use baseband_core::stats::ChannelStatsCollector;
use baseband_core::status::EventSink;
use tracing::{debug, warn};

/// Channel statistics run this many times slower than the flush rate
const STATS_RATE_DIVISOR: u32 = 20;

/// Subtract the integer mean of all bins, then scale by `gain`
pub fn remove_dc(bins: &mut [Complex32i], gain: i32) {
    if bins.is_empty() {
        return;
    }

    let (sum_re, sum_im) = bins.iter().fold((0i64, 0i64), |(re, im), bin| {
        (re + bin.re as i64, im + bin.im as i64)
    });
    let offset_re = (sum_re / bins.len() as i64) as i32;
    let offset_im = (sum_im / bins.len() as i64) as i32;

    for bin in bins.iter_mut() {
        bin.re = (bin.re - offset_re).saturating_mul(gain);
        bin.im = (bin.im - offset_im).saturating_mul(gain);
    }
}

pub struct WidebandSpectrum<E> {
    spectrum: [Complex32i; CHANNEL_SPECTRUM_LEN],
    flushed: [Complex16; CHANNEL_SPECTRUM_LEN],
    phase: u32,
    trigger: u32,
    gain: i32,
    sampling_rate: u32,
    configured: bool,
    channel_stats: ChannelStatsCollector,
    collector: SpectrumCollector,
    events: E,
}

impl<E: EventSink> WidebandSpectrum<E> {
    pub fn new(collector: SpectrumCollector, events: E) -> Self {
        Self {
            spectrum: [Complex32i::ZERO; CHANNEL_SPECTRUM_LEN],
            flushed: [Complex16::default(); CHANNEL_SPECTRUM_LEN],
            phase: 0,
            trigger: 0,
            gain: 1,
            sampling_rate: 0,
            configured: false,
            channel_stats: ChannelStatsCollector::new(),
            collector,
            events,
        }
    }

    /// Buffers accumulated so far in the current cycle, minus one
    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Bins of the most recent flush
    pub fn last_flush(&self) -> &[Complex16; CHANNEL_SPECTRUM_LEN] {
        &self.flushed
    }

    pub fn collector(&self) -> &SpectrumCollector {
        &self.collector
    }

    pub fn collector_mut(&mut self) -> &mut SpectrumCollector {
        &mut self.collector
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    fn configure(&mut self, config: WidebandSpectrumConfig) {
        if let Err(e) = config.validate() {
            warn!("Ignoring wideband spectrum config: {}", e);
            return;
        }

        self.sampling_rate = config.sampling_rate;
        self.trigger = config.trigger;
        self.gain = config.gain;
        self.phase = 0;
        self.configured = true;
        debug!(
            "Wideband spectrum at {} Hz, flush every {} buffers, gain {}",
            config.sampling_rate,
            config.trigger.saturating_add(1),
            config.gain
        );
    }

    fn flush(&mut self) {
        remove_dc(&mut self.spectrum, self.gain);
        for (out, bin) in self.flushed.iter_mut().zip(self.spectrum.iter()) {
            *out = bin.saturate();
        }

        let stats_rate = self.sampling_rate / STATS_RATE_DIVISOR / self.trigger.saturating_add(1);
        if let Some(statistics) = self.channel_stats.feed(&self.flushed, stats_rate) {
            self.events.send(StatusEvent::ChannelStatistics(statistics));
        }
        self.collector.feed(&self.flushed, self.sampling_rate, 0, 0);
    }
}

impl<E: EventSink> BasebandProcessor for WidebandSpectrum<E> {
    fn execute(&mut self, buffer: &mut IqBuffer) {
        if !self.configured {
            return;
        }

        if self.phase == 0 {
            self.spectrum.fill(Complex32i::ZERO);
        }

        for segment in buffer.data().chunks_exact(CHANNEL_SPECTRUM_LEN) {
            for (bin, &sample) in self.spectrum.iter_mut().zip(segment) {
                *bin += sample;
            }
        }

        if self.phase >= self.trigger {
            self.flush();
            self.phase = 0;
        } else {
            self.phase += 1;
        }
    }

    fn on_message(&mut self, message: Message) {
        match message {
            Message::WidebandSpectrumConfig(config) => self.configure(config),
            Message::SpectrumStreamingConfig(state) => {
                self.collector.set_state(state, &mut self.events)
            }
            Message::UpdateSpectrum => self.collector.update(),
            _ => {}
        }
    }
}
