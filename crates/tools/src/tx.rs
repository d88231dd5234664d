//! Transmit replay: WAV in, cs8 IQ out
//!
//! Stands in for the control side of the handheld. It owns the byte stream
//! feeding the engine, answers fill requests, and reports the end of the
//! replay once the engine has consumed every byte.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use baseband_audio::dma::DmaRing;
use baseband_core::buffer::{IqBuffer, IQ_BUFFER_LEN};
use baseband_core::message::{
    Message, Modulation, ReplayConfig, ReplayDone, RequestSignal, SamplerateConfig, StatusEvent,
    TxProgress,
};
use baseband_core::processor::{EventDispatcher, MessageSender};
use baseband_core::resample::{BitDepth, PcmFormat};
use baseband_core::status::status_channel;
use baseband_core::stream::{input_stream, monitor_stream};
use baseband_core::{AUDIO_RATE, BASEBAND_RATE};
use baseband_modem::audiotx::{source_format, AudioTxProcessor};

use crate::common::ProgressReporter;
use crate::config::TxSessionConfig;

const STREAM_CAPACITY: usize = 1 << 16;
const STATUS_QUEUE_LEN: usize = 64;
const MESSAGE_QUEUE_LEN: usize = 8;
const DMA_TRANSFERS: usize = 4;
const MONITOR_CAPACITY: usize = AUDIO_RATE as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModulationType {
    Am,
    Fm,
}

impl From<ModulationType> for Modulation {
    fn from(value: ModulationType) -> Self {
        match value {
            ModulationType::Am => Modulation::Am,
            ModulationType::Fm => Modulation::Fm,
        }
    }
}

/// Replay a WAV file through the transmit engine
#[derive(Debug, Clone, Parser)]
#[command(name = "tx")]
#[command(about = "Modulate a WAV file into 8-bit IQ")]
pub struct TxArgs {
    /// Input WAV file (8 or 16-bit PCM, mono or stereo)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output cs8 IQ file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Optional WAV file receiving the conditioned monitor audio
    #[arg(long)]
    pub monitor: Option<PathBuf>,

    /// Session config (TOML); replaces the modulation flags below
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Modulation scheme
    #[arg(short, long, value_enum, default_value = "fm")]
    pub modulation: ModulationType,

    /// FM deviation in Hz
    #[arg(long, default_value = "5000")]
    pub deviation: u32,

    /// Playback speed in percent
    #[arg(long, default_value = "100")]
    pub speed: u32,

    /// Subaudible tone frequency in Hz (0 disables)
    #[arg(long, default_value = "0")]
    pub tone: f32,

    /// Tone share of the modulating signal
    #[arg(long, default_value = "0.15")]
    pub tone_mix: f32,
}

impl TxArgs {
    pub fn session(&self) -> Result<TxSessionConfig> {
        if let Some(path) = &self.config {
            return TxSessionConfig::from_file(path);
        }

        Ok(TxSessionConfig {
            modulation: self.modulation.into(),
            deviation_hz: self.deviation,
            tone_hz: self.tone,
            tone_mix_weight: if self.tone > 0.0 { self.tone_mix } else { 0.0 },
            speed: self.speed,
            ..Default::default()
        })
    }
}

/// PCM bytes exactly as the engine expects them on its input stream
#[derive(Debug, Clone)]
pub struct PcmSource {
    pub bytes: Vec<u8>,
    pub format: PcmFormat,
    pub sample_rate: u32,
}

impl PcmSource {
    /// Read a WAV file, rejecting layouts the engine cannot replay
    pub fn from_wav(path: &Path) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {:?}", path))?;
        let spec = reader.spec();

        if spec.sample_format != hound::SampleFormat::Int {
            bail!("Unsupported WAV sample format: {:?}", spec.sample_format);
        }
        let format = source_format(spec.bits_per_sample, spec.channels)?;

        let bytes = match format.depth {
            // 8-bit WAV is unsigned on disk, hound hands it back signed
            BitDepth::Eight => reader
                .samples::<i8>()
                .map(|s| s.map(|v| (v as u8) ^ 0x80))
                .collect::<Result<Vec<_>, _>>(),
            BitDepth::Sixteen => reader
                .samples::<i16>()
                .map(|s| s.map(i16::to_le_bytes))
                .collect::<Result<Vec<_>, _>>()
                .map(|samples| samples.concat()),
        }
        .with_context(|| "Failed to read audio samples")?;

        info!(
            "Read {} bytes of {:?} at {} Hz from {:?}",
            bytes.len(),
            format,
            spec.sample_rate,
            path
        );
        Ok(Self {
            bytes,
            format,
            sample_rate: spec.sample_rate,
        })
    }
}

/// Everything one replay produced
#[derive(Debug, Default)]
pub struct ReplayOutput {
    /// Interleaved signed 8-bit I/Q
    pub iq: Vec<u8>,
    /// Monitor audio at 48 kHz
    pub monitor: Vec<i16>,
    pub bytes_read: u32,
    pub ticks: usize,
    pub done: Option<ReplayDone>,
}

fn send(sender: &mut MessageSender, message: Message) -> Result<()> {
    sender
        .send(message)
        .map_err(|m| anyhow!("Message queue full, dropped {:?}", m))
}

/// Drive the engine tick by tick until `source` is consumed
pub fn replay(
    source: &PcmSource,
    session: &TxSessionConfig,
    with_monitor: bool,
) -> Result<ReplayOutput> {
    let config = session.audio_tx_config(source.format);
    config.validate()?;

    let (events, mut status) = status_channel(STATUS_QUEUE_LEN);
    let mut processor = AudioTxProcessor::new(DmaRing::new(DMA_TRANSFERS)?, events);
    let mut tap = None;
    if with_monitor {
        let (monitor, monitor_tap) = monitor_stream(MONITOR_CAPACITY);
        processor.audio_output_mut().set_stream(Some(Box::new(monitor)));
        tap = Some(monitor_tap);
    }

    let (mut dispatcher, mut sender) = EventDispatcher::new(processor, MESSAGE_QUEUE_LEN);
    let (mut feeder, input) = input_stream(STREAM_CAPACITY);

    send(&mut sender, Message::AudioTxConfig(config))?;
    send(
        &mut sender,
        Message::SamplerateConfig(SamplerateConfig {
            sample_rate: source.sample_rate,
        }),
    )?;
    send(
        &mut sender,
        Message::ReplayConfig(ReplayConfig {
            stream: Some(Box::new(input)),
        }),
    )?;
    dispatcher.dispatch_pending();

    if dispatcher.processor().resampler().inc() == 0 {
        bail!(
            "Cannot replay {} Hz at {}% speed",
            source.sample_rate,
            session.speed
        );
    }

    let pcm = &source.bytes;
    let total = pcm.len() - pcm.len() % source.format.frame_bytes();
    let mut fed = 0;
    let mut reporter = ProgressReporter::new(total);
    let mut buffer = IqBuffer::new(IQ_BUFFER_LEN, BASEBAND_RATE)?;
    let mut output = ReplayOutput::default();

    loop {
        for event in status.drain() {
            match event {
                StatusEvent::RequestSignal(RequestSignal::FillRequest) => {
                    fed += feeder.feed(&pcm[fed..total]);
                    send(&mut sender, Message::FifoData)?;
                }
                StatusEvent::TxProgress(TxProgress::Progress(bytes)) => {
                    reporter.update(bytes as usize)
                }
                StatusEvent::AudioStatistics(stats) => {
                    debug!("Monitor audio rms {:.1} dB, peak {:.1} dB", stats.rms_db, stats.max_db)
                }
                other => debug!("Status event: {:?}", other),
            }
        }

        output.bytes_read = dispatcher.processor().bytes_read();
        if output.bytes_read as usize >= total {
            break;
        }

        fed += feeder.feed(&pcm[fed..total]);
        dispatcher.tick(&mut buffer);
        output
            .iq
            .extend(buffer.data().iter().flat_map(|s| [s.re as u8, s.im as u8]));
        if let Some(tap) = tap.as_mut() {
            tap.drain_into(&mut output.monitor);
        }
        output.ticks += 1;
    }

    send(&mut sender, Message::ReplayConfig(ReplayConfig { stream: None }))?;
    dispatcher.dispatch_pending();

    let dropped = dispatcher.processor().events().dropped();
    if dropped > 0 {
        warn!("{} status events dropped", dropped);
    }

    let done = ReplayDone::EndOfFile;
    reporter.complete();
    info!(
        "Replay finished after {} buffers: {:?} (code {})",
        output.ticks,
        TxProgress::Done(done),
        done.return_code()
    );
    output.done = Some(done);
    Ok(output)
}

/// Transmit tool
pub struct Transmitter {
    args: TxArgs,
    session: TxSessionConfig,
}

impl Transmitter {
    pub fn new(args: TxArgs) -> Result<Self> {
        let session = args.session()?;
        Ok(Self { args, session })
    }

    pub fn session(&self) -> &TxSessionConfig {
        &self.session
    }

    /// Replay the input file and write the IQ (and monitor) output
    pub fn transmit(&self) -> Result<ReplayOutput> {
        let source = PcmSource::from_wav(&self.args.input)?;
        let output = replay(&source, &self.session, self.args.monitor.is_some())?;

        let file = File::create(&self.args.output)
            .with_context(|| format!("Failed to create IQ file: {:?}", self.args.output))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&output.iq)?;
        writer.flush()?;
        info!("Wrote {} IQ samples to {:?}", output.iq.len() / 2, self.args.output);

        if let Some(path) = &self.args.monitor {
            write_monitor_wav(&output.monitor, path)?;
        }
        Ok(output)
    }
}

fn write_monitor_wav(samples: &[i16], path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: AUDIO_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    info!("Wrote {} monitor samples to {:?}", samples.len(), path);
    Ok(())
}
