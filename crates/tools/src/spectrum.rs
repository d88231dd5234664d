//! Spectrum capture: cs8 IQ in, display frames and channel statistics out

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use baseband_core::buffer::{Complex8, IqBuffer, IQ_BUFFER_LEN};
use baseband_core::message::{Message, SpectrumStreaming, StatusEvent};
use baseband_core::processor::{EventDispatcher, MessageSender};
use baseband_core::stats::ChannelStatistics;
use baseband_core::status::status_channel;
use baseband_spectrum::collector::SpectrumCollector;
use baseband_spectrum::fifo::ChannelSpectrum;
use baseband_spectrum::wideband::WidebandSpectrum;

use crate::config::SpectrumSessionConfig;

const STATUS_QUEUE_LEN: usize = 64;
const MESSAGE_QUEUE_LEN: usize = 8;

/// Run the wideband spectrum over a recorded IQ file
#[derive(Debug, Clone, Parser)]
#[command(name = "spectrum")]
#[command(about = "Accumulate spectrum frames from an 8-bit IQ recording")]
pub struct SpectrumArgs {
    /// Input cs8 IQ file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file for spectrum frames, one JSON object per line
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Session config (TOML); replaces the flags below
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Sampling rate of the recording in Hz
    #[arg(long, default_value = "1536000")]
    pub sample_rate: u32,

    /// Buffers accumulated per flush, minus one
    #[arg(long, default_value = "0")]
    pub trigger: u32,

    /// Gain applied after DC removal
    #[arg(long, default_value = "1")]
    pub gain: i32,
}

impl SpectrumArgs {
    pub fn session(&self) -> Result<SpectrumSessionConfig> {
        if let Some(path) = &self.config {
            return SpectrumSessionConfig::from_file(path);
        }

        Ok(SpectrumSessionConfig {
            sampling_rate: self.sample_rate,
            trigger: self.trigger,
            gain: self.gain,
            ..Default::default()
        })
    }
}

/// Serializable form of a display frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumFrame {
    pub index: usize,
    pub sampling_rate: u32,
    pub channel_filter_pass_frequency: u32,
    pub channel_filter_stop_frequency: u32,
    pub db: Vec<u8>,
}

impl SpectrumFrame {
    fn new(index: usize, frame: &ChannelSpectrum) -> Self {
        Self {
            index,
            sampling_rate: frame.sampling_rate,
            channel_filter_pass_frequency: frame.channel_filter_pass_frequency,
            channel_filter_stop_frequency: frame.channel_filter_stop_frequency,
            db: frame.db.to_vec(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CaptureOutput {
    pub frames: Vec<SpectrumFrame>,
    pub statistics: Vec<ChannelStatistics>,
    pub buffers: usize,
    pub dropped_frames: u64,
}

fn send(sender: &mut MessageSender, message: Message) -> Result<()> {
    sender
        .send(message)
        .map_err(|m| anyhow!("Message queue full, dropped {:?}", m))
}

/// Feed interleaved I/Q bytes through the accumulator, one hardware buffer at a time
pub fn capture(
    iq: &[u8],
    session: &SpectrumSessionConfig,
    stream_frames: bool,
) -> Result<CaptureOutput> {
    session.wideband_config().validate()?;

    let (mut collector, mut consumer) = SpectrumCollector::new(session.fifo_k)?;
    collector.set_window(session.window);
    collector.set_decimation_factor(session.decimation);

    let (events, mut status) = status_channel(STATUS_QUEUE_LEN);
    let (mut dispatcher, mut sender) =
        EventDispatcher::new(WidebandSpectrum::new(collector, events), MESSAGE_QUEUE_LEN);

    send(&mut sender, Message::WidebandSpectrumConfig(session.wideband_config()))?;
    if stream_frames {
        send(
            &mut sender,
            Message::SpectrumStreamingConfig(SpectrumStreaming::Start),
        )?;
    }

    let chunk_len = IQ_BUFFER_LEN * 2;
    let chunks = iq.chunks_exact(chunk_len);
    if !chunks.remainder().is_empty() {
        warn!(
            "Ignoring {} trailing bytes short of a full buffer",
            chunks.remainder().len()
        );
    }

    let mut buffer = IqBuffer::new(IQ_BUFFER_LEN, session.sampling_rate)?;
    let mut output = CaptureOutput::default();

    for chunk in chunks {
        for (slot, pair) in buffer.data_mut().iter_mut().zip(chunk.chunks_exact(2)) {
            *slot = Complex8::new(pair[0] as i8, pair[1] as i8);
        }
        dispatcher.tick(&mut buffer);
        output.buffers += 1;

        // Idle time after the tick: build any pending display frame
        if dispatcher.processor().collector().update_pending() {
            send(&mut sender, Message::UpdateSpectrum)?;
            dispatcher.dispatch_pending();
        }

        while let Some(frame) = consumer.pop() {
            output
                .frames
                .push(SpectrumFrame::new(output.frames.len(), &frame));
        }

        for event in status.drain() {
            match event {
                StatusEvent::ChannelStatistics(stats) => output.statistics.push(stats),
                StatusEvent::ChannelSpectrumConfig { fifo_k } => {
                    debug!("Spectrum FIFO holds {} frames", 1u32 << fifo_k)
                }
                other => debug!("Status event: {:?}", other),
            }
        }
    }

    output.dropped_frames = dispatcher.processor().collector().dropped();
    info!(
        "Processed {} buffers, {} frames, {} statistics reports",
        output.buffers,
        output.frames.len(),
        output.statistics.len()
    );
    Ok(output)
}

/// Spectrum capture tool
pub struct SpectrumCapture {
    args: SpectrumArgs,
    session: SpectrumSessionConfig,
}

impl SpectrumCapture {
    pub fn new(args: SpectrumArgs) -> Result<Self> {
        let session = args.session()?;
        Ok(Self { args, session })
    }

    pub fn session(&self) -> &SpectrumSessionConfig {
        &self.session
    }

    pub fn run(&self) -> Result<CaptureOutput> {
        let iq = std::fs::read(&self.args.input)
            .with_context(|| format!("Failed to read IQ file: {:?}", self.args.input))?;
        let output = capture(&iq, &self.session, self.args.output.is_some())?;

        if let Some(path) = &self.args.output {
            write_frames(&output.frames, path)?;
        }
        Ok(output)
    }
}

fn write_frames(frames: &[SpectrumFrame], path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create frame file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    for frame in frames {
        serde_json::to_writer(&mut writer, frame)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!("Wrote {} spectrum frames to {:?}", frames.len(), path);
    Ok(())
}
