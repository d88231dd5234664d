//! Audio transmit processor
//!
//! Per hardware buffer, every IQ slot advances the resampler, mixes in the
//! keying tone and modulates. Every 32nd slot also feeds the interpolated
//! audio to the monitoring [`AudioOutput`].

use crate::modulation::{Modulator, ModulatorKind};
use crate::tone::ToneMixer;
use crate::{ModemError, Result};
use baseband_audio::dma::AudioDma;
use baseband_audio::output::AudioOutput;
use baseband_core::buffer::IqBuffer;
use baseband_core::filter::{BiquadConfig, AUDIO_48K_HPF_30HZ};
use baseband_core::message::{
    AudioTxConfig, Message, ReplayConfig, RequestSignal, SamplerateConfig, StatusEvent,
    TxProgress,
};
use baseband_core::processor::BasebandProcessor;
use baseband_core::resample::{BitDepth, ChannelCount, PcmFormat, Resampler};
use baseband_core::status::EventSink;
use baseband_core::stream::InputStream;
use baseband_core::{AUDIO_RATE, BASEBAND_RATE};
use tracing::{debug, warn};

/// IQ slots per audio sample handed to the monitor
pub const AUDIO_DECIMATION: usize = (BASEBAND_RATE / AUDIO_RATE) as usize;

/// Audio samples collected before each monitor write
pub const AUDIO_SUBBUFFER_LEN: usize = 32;

/// Source layout for PCM described by bits per sample and channel count
pub fn source_format(bits_per_sample: u16, channels: u16) -> Result<PcmFormat> {
    let depth = match bits_per_sample {
        8 => BitDepth::Eight,
        16 => BitDepth::Sixteen,
        other => {
            return Err(ModemError::UnsupportedFormat {
                msg: format!("{}-bit samples", other),
            })
        }
    };
    let channels = match channels {
        1 => ChannelCount::Mono,
        2 => ChannelCount::Stereo,
        other => {
            return Err(ModemError::UnsupportedFormat {
                msg: format!("{} channels", other),
            })
        }
    };
    Ok(PcmFormat::new(depth, channels))
}

/// Replays a PCM stream as an AM or FM modulated IQ stream
pub struct AudioTxProcessor<D, E> {
    resampler: Resampler,
    tone: ToneMixer,
    modulator: ModulatorKind,
    stream: Option<Box<dyn InputStream>>,
    audio_output: AudioOutput<D>,
    events: E,
    config: AudioTxConfig,
    source_rate: Option<u32>,
    configured: bool,
    audio_left: [i16; AUDIO_SUBBUFFER_LEN],
    audio_right: [i16; AUDIO_SUBBUFFER_LEN],
    audio_index: usize,
    audio_skip: usize,
    progress_samples: u32,
}

impl<D: AudioDma, E: EventSink> AudioTxProcessor<D, E> {
    pub fn new(dma: D, events: E) -> Self {
        let config = AudioTxConfig::default();
        Self {
            resampler: Resampler::new(config.pcm_format()),
            tone: ToneMixer::new(),
            modulator: ModulatorKind::new(config.modulation, config.deviation_hz, BASEBAND_RATE),
            stream: None,
            audio_output: AudioOutput::new(dma),
            events,
            config,
            source_rate: None,
            configured: false,
            audio_left: [0; AUDIO_SUBBUFFER_LEN],
            audio_right: [0; AUDIO_SUBBUFFER_LEN],
            audio_index: 0,
            audio_skip: 0,
            progress_samples: 0,
        }
    }

    /// Virtual engine rate after playback speed scaling
    pub fn engine_rate(&self) -> u32 {
        (BASEBAND_RATE as u64 * 100 / self.config.speed.max(1) as u64) as u32
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Input bytes consumed since the stream was attached
    pub fn bytes_read(&self) -> u32 {
        self.resampler.bytes_read()
    }

    pub fn config(&self) -> &AudioTxConfig {
        &self.config
    }

    pub fn resampler(&self) -> &Resampler {
        &self.resampler
    }

    pub fn modulator(&self) -> &ModulatorKind {
        &self.modulator
    }

    pub fn audio_output(&self) -> &AudioOutput<D> {
        &self.audio_output
    }

    pub fn audio_output_mut(&mut self) -> &mut AudioOutput<D> {
        &mut self.audio_output
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    fn audio_config(&mut self, config: AudioTxConfig) {
        if let Err(e) = config.validate() {
            warn!("Ignoring audio TX config: {}", e);
            return;
        }

        self.config = config;
        self.tone.configure(config.tone_key_delta, config.tone_key_mix_weight);
        self.modulator = ModulatorKind::new(config.modulation, config.deviation_hz, BASEBAND_RATE);
        self.resampler.configure(config.pcm_format());
        self.progress_samples = 0;

        if let Err(e) =
            self.audio_output
                .configure(AUDIO_48K_HPF_30HZ, BiquadConfig::passthrough(), 0.0)
        {
            warn!("Monitor output left unconfigured: {}", e);
        }

        self.update_increment();
        debug!(
            "Audio TX configured: {:?}, {} Hz deviation, {}% speed, {:?}",
            config.modulation,
            config.deviation_hz,
            config.speed,
            config.pcm_format()
        );
    }

    fn replay_config(&mut self, replay: ReplayConfig) {
        self.configured = false;
        self.resampler.reset_bytes_read();

        match replay.stream {
            Some(stream) => {
                self.stream = Some(stream);
                self.resampler.reset();
                self.modulator.reset();
                self.tone.reset();
                self.events.send(StatusEvent::RequestSignal(RequestSignal::FillRequest));
                debug!("Replay stream attached");
            }
            None => {
                self.stream = None;
                debug!("Replay stream released");
            }
        }
    }

    fn samplerate_config(&mut self, config: SamplerateConfig) {
        self.source_rate = Some(config.sample_rate);
        if self.update_increment() {
            self.resampler.reset();
        }
    }

    /// Recompute the resampler increment, returning whether it was accepted
    fn update_increment(&mut self) -> bool {
        let Some(source_rate) = self.source_rate else {
            return false;
        };

        match self.resampler.set_rates(source_rate, self.engine_rate()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Keeping previous resampler rate: {}", e);
                false
            }
        }
    }

    fn flush_audio(&mut self, stereo: bool) {
        if stereo {
            self.audio_output
                .write_direct(&self.audio_left, &self.audio_right, &mut self.events);
        } else {
            self.audio_output.write(&self.audio_left, &mut self.events);
        }
    }
}

impl<D: AudioDma, E: EventSink> BasebandProcessor for AudioTxProcessor<D, E> {
    fn execute(&mut self, buffer: &mut IqBuffer) {
        if !self.configured || self.stream.is_none() {
            return;
        }

        let stereo = self.resampler.format().channels == ChannelCount::Stereo;

        for slot in buffer.data_mut().iter_mut() {
            let (left, right) = self.resampler.next_frame(self.stream.as_deref_mut());

            let mono = if stereo {
                ((left as i32 + right as i32) / 2) as i16
            } else {
                left
            };
            let sample = self.tone.process((mono >> 8) as i8);
            *slot = self.modulator.modulate(sample);

            if self.audio_skip == 0 {
                self.audio_skip = AUDIO_DECIMATION - 1;
                self.audio_left[self.audio_index] = left;
                self.audio_right[self.audio_index] = right;
                self.audio_index += 1;
                if self.audio_index == AUDIO_SUBBUFFER_LEN {
                    self.audio_index = 0;
                    self.flush_audio(stereo);
                }
            } else {
                self.audio_skip -= 1;
            }
        }

        // A zero divider reports after every buffer
        let divider = self.config.divider;
        self.progress_samples = self.progress_samples.saturating_add(buffer.len() as u32);
        if self.progress_samples >= divider {
            self.progress_samples = match divider {
                0 => 0,
                _ => self.progress_samples - divider,
            };
            self.events.send(StatusEvent::TxProgress(TxProgress::Progress(
                self.resampler.bytes_read(),
            )));
        }
    }

    fn on_message(&mut self, message: Message) {
        match message {
            Message::AudioTxConfig(config) => self.audio_config(config),
            Message::ReplayConfig(replay) => self.replay_config(replay),
            Message::SamplerateConfig(config) => self.samplerate_config(config),
            Message::FifoData => self.configured = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseband_audio::dma::DmaRing;
    use baseband_core::buffer::{Complex8, StereoFrame, IQ_BUFFER_LEN};
    use baseband_core::message::Modulation;
    use baseband_core::stream::{input_stream, StreamFeeder};
    use std::f64::consts::PI;

    type TestProcessor = AudioTxProcessor<DmaRing, Vec<StatusEvent>>;

    fn processor() -> TestProcessor {
        AudioTxProcessor::new(DmaRing::new(4).unwrap(), Vec::new())
    }

    fn start(processor: &mut TestProcessor, config: AudioTxConfig, rate: u32, bytes: &[u8]) -> StreamFeeder {
        let (mut feeder, input) = input_stream(1 << 16);
        feeder.feed(bytes);
        processor.on_message(Message::AudioTxConfig(config));
        processor.on_message(Message::SamplerateConfig(SamplerateConfig { sample_rate: rate }));
        processor.on_message(Message::ReplayConfig(ReplayConfig {
            stream: Some(Box::new(input)),
        }));
        processor.on_message(Message::FifoData);
        feeder
    }

    fn iq_buffer() -> IqBuffer {
        IqBuffer::new(IQ_BUFFER_LEN, BASEBAND_RATE).unwrap()
    }

    fn pcm16(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Mean instantaneous frequency of a chunk from successive phase differences
    fn mean_frequency(iq: &[Complex8]) -> f64 {
        let total: f64 = iq
            .windows(2)
            .map(|w| {
                let a = (w[0].im as f64).atan2(w[0].re as f64);
                let b = (w[1].im as f64).atan2(w[1].re as f64);
                let mut d = b - a;
                if d > PI {
                    d -= 2.0 * PI;
                } else if d < -PI {
                    d += 2.0 * PI;
                }
                d
            })
            .sum();
        total / (2.0 * PI) * BASEBAND_RATE as f64 / (iq.len() - 1) as f64
    }

    #[test]
    fn test_fm_tracks_ramp() {
        let mut processor = processor();
        let config = AudioTxConfig {
            deviation_hz: 2500,
            bit_depth: BitDepth::Eight,
            channels: ChannelCount::Mono,
            modulation: Modulation::Fm,
            ..Default::default()
        };
        let ramp: Vec<u8> = (0..=255u8).collect();
        let _feeder = start(&mut processor, config, 8000, &ramp);

        let mut frequencies = Vec::new();
        let mut buffer = iq_buffer();
        for _ in 0..26 {
            processor.execute(&mut buffer);
            frequencies.push(mean_frequency(buffer.data()));
        }

        // One source step is 2500/128 Hz; 2048 slots span 2048/192 source samples
        let expected = 2500.0 / 128.0 * 2048.0 / 192.0;
        for pair in frequencies[1..21].windows(2) {
            let slope = pair[1] - pair[0];
            assert!(
                (slope - expected).abs() < 20.0,
                "frequency step {} Hz, expected {} Hz",
                slope,
                expected
            );
        }
        assert_eq!(processor.bytes_read(), 256);
    }

    #[test]
    fn test_am_full_scale_is_constant() {
        let mut processor = processor();
        let config = AudioTxConfig {
            modulation: Modulation::Am,
            ..Default::default()
        };
        let _feeder = start(&mut processor, config, 48000, &pcm16(&[i16::MAX; 512]));

        let mut buffer = iq_buffer();
        processor.execute(&mut buffer);
        // Interpolation settles after two source periods
        assert!(buffer.data()[64..]
            .iter()
            .all(|iq| *iq == Complex8::new(127, 0)));

        processor.execute(&mut buffer);
        assert!(buffer.data().iter().all(|iq| *iq == Complex8::new(127, 0)));
    }

    #[test]
    fn test_unconfigured_is_noop() {
        let mut processor = processor();
        let mut buffer = iq_buffer();
        buffer.fill(Complex8::new(5, 5));

        processor.execute(&mut buffer);
        assert!(buffer.data().iter().all(|iq| *iq == Complex8::new(5, 5)));

        // Attached but no data signalled yet
        let (_feeder, input) = input_stream(64);
        processor.on_message(Message::ReplayConfig(ReplayConfig {
            stream: Some(Box::new(input)),
        }));
        processor.execute(&mut buffer);
        assert!(!processor.is_configured());
        assert!(buffer.data().iter().all(|iq| *iq == Complex8::new(5, 5)));
    }

    #[test]
    fn test_attach_requests_fill() {
        let mut processor = processor();
        let _feeder = start(&mut processor, AudioTxConfig::default(), 48000, &[]);
        assert_eq!(
            processor.events(),
            &vec![StatusEvent::RequestSignal(RequestSignal::FillRequest)]
        );
        assert!(processor.is_configured());
    }

    #[test]
    fn test_release_stops_processing() {
        let mut processor = processor();
        let _feeder = start(&mut processor, AudioTxConfig::default(), 48000, &[0; 1024]);
        processor.on_message(Message::ReplayConfig(ReplayConfig { stream: None }));
        assert!(!processor.is_configured());

        let mut buffer = iq_buffer();
        buffer.fill(Complex8::new(9, 9));
        processor.on_message(Message::FifoData);
        processor.execute(&mut buffer);
        assert_eq!(buffer[0], Complex8::new(9, 9));
    }

    #[test]
    fn test_progress_reports() {
        let mut processor = processor();
        let config = AudioTxConfig {
            divider: 2 * IQ_BUFFER_LEN as u32,
            ..Default::default()
        };
        let _feeder = start(&mut processor, config, 48000, &pcm16(&[0; 4096]));
        processor.events_mut().clear();

        let mut buffer = iq_buffer();
        for _ in 0..4 {
            processor.execute(&mut buffer);
        }

        // 64 mono 16-bit frames per buffer at 48 kHz
        assert_eq!(
            processor.events(),
            &vec![
                StatusEvent::TxProgress(TxProgress::Progress(256)),
                StatusEvent::TxProgress(TxProgress::Progress(512)),
            ]
        );
    }

    #[test]
    fn test_zero_divider_reports_every_buffer() {
        let mut processor = processor();
        let _feeder = start(&mut processor, AudioTxConfig::default(), 48000, &pcm16(&[0; 4096]));
        processor.events_mut().clear();

        let mut buffer = iq_buffer();
        for _ in 0..8 {
            processor.execute(&mut buffer);
        }
        let expected: Vec<StatusEvent> = (1..=8)
            .map(|n| StatusEvent::TxProgress(TxProgress::Progress(128 * n)))
            .collect();
        assert_eq!(processor.events(), &expected);
    }

    #[test]
    fn test_rejected_rate_keeps_increment() {
        let mut processor = processor();
        processor.on_message(Message::SamplerateConfig(SamplerateConfig { sample_rate: 8000 }));
        assert_eq!(processor.resampler().inc(), 87381);

        processor.on_message(Message::SamplerateConfig(SamplerateConfig {
            sample_rate: 2_000_000,
        }));
        assert_eq!(processor.resampler().inc(), 87381);
    }

    #[test]
    fn test_rate_change_restarts_conversion() {
        let mut processor = processor();
        let ramp: Vec<u8> = (0..=255u8).collect();
        let config = AudioTxConfig {
            bit_depth: BitDepth::Eight,
            ..Default::default()
        };
        let _feeder = start(&mut processor, config, 8000, &ramp);

        let mut buffer = iq_buffer();
        processor.execute(&mut buffer);
        assert_ne!(processor.resampler().acc(), 0);

        processor.on_message(Message::SamplerateConfig(SamplerateConfig { sample_rate: 16000 }));
        assert_eq!(processor.resampler().acc(), 0);
        assert_eq!(processor.resampler().inc(), 174_762);
        // Bytes already consumed still count towards progress
        assert!(processor.bytes_read() > 0);
    }

    #[test]
    fn test_rejected_rate_keeps_phase() {
        let mut processor = processor();
        let _feeder = start(&mut processor, AudioTxConfig::default(), 8000, &pcm16(&[0; 1024]));

        let mut buffer = iq_buffer();
        processor.execute(&mut buffer);
        let acc = processor.resampler().acc();

        processor.on_message(Message::SamplerateConfig(SamplerateConfig {
            sample_rate: 2_000_000,
        }));
        assert_eq!(processor.resampler().acc(), acc);
    }

    #[test]
    fn test_new_replay_restarts_carrier_phase() {
        let mut processor = processor();
        let config = AudioTxConfig {
            bit_depth: BitDepth::Eight,
            ..Default::default()
        };
        let _feeder = start(&mut processor, config, 48000, &[0xff; 1024]);

        let mut buffer = iq_buffer();
        processor.execute(&mut buffer);
        let ModulatorKind::Fm(fm) = processor.modulator() else {
            panic!("expected FM");
        };
        assert_ne!(fm.phase(), 0);

        let (_feeder, input) = input_stream(64);
        processor.on_message(Message::ReplayConfig(ReplayConfig {
            stream: Some(Box::new(input)),
        }));
        let ModulatorKind::Fm(fm) = processor.modulator() else {
            panic!("expected FM");
        };
        assert_eq!(fm.phase(), 0);
    }

    #[test]
    fn test_speed_rescales_increment() {
        let mut processor = processor();
        processor.on_message(Message::SamplerateConfig(SamplerateConfig { sample_rate: 8000 }));
        processor.on_message(Message::AudioTxConfig(AudioTxConfig {
            speed: 200,
            ..Default::default()
        }));
        assert_eq!(processor.engine_rate(), 768_000);
        assert_eq!(processor.resampler().inc(), 174_762);
    }

    #[test]
    fn test_source_format() {
        let format = source_format(8, 2).unwrap();
        assert_eq!(format, PcmFormat::new(BitDepth::Eight, ChannelCount::Stereo));
        assert_eq!(format.frame_bytes(), 2);
        assert!(source_format(24, 1).is_err());
        assert!(source_format(16, 6).is_err());
    }

    #[test]
    fn test_invalid_config_ignored() {
        let mut processor = processor();
        processor.on_message(Message::AudioTxConfig(AudioTxConfig {
            speed: 0,
            modulation: Modulation::Am,
            ..Default::default()
        }));
        assert_eq!(processor.config().modulation, Modulation::Fm);
    }

    #[test]
    fn test_monitor_gets_two_blocks_per_buffer() {
        let mut processor = processor();
        let _feeder = start(&mut processor, AudioTxConfig::default(), 48000, &pcm16(&[0; 4096]));

        let mut buffer = iq_buffer();
        processor.execute(&mut buffer);
        assert_eq!(processor.audio_output().dma().issued(), 2);
    }

    #[test]
    fn test_stereo_uses_direct_path() {
        let mut processor = processor();
        let config = AudioTxConfig {
            channels: ChannelCount::Stereo,
            modulation: Modulation::Am,
            ..Default::default()
        };
        let frames: Vec<i16> = (0..1024).flat_map(|_| [1000i16, 3000]).collect();
        let _feeder = start(&mut processor, config, 48000, &pcm16(&frames));

        let mut buffer = iq_buffer();
        processor.execute(&mut buffer);
        processor.execute(&mut buffer);

        // Unfiltered, swapped into the DMA slots
        let dma = processor.audio_output().dma().last_filled().unwrap();
        assert_eq!(dma[0], StereoFrame { left: 3000, right: 1000 });

        // Modulated from the channel average: 2000 >> 8 = 7
        assert_eq!(buffer[0], Complex8::new(7 / 2 + 64, 0));
    }
}
