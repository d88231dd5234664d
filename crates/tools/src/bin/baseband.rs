//! Baseband - unified host tool for the transmit and spectrum engines

use anyhow::Result;
use baseband_core::fft::window::Window;
use baseband_core::{AUDIO_RATE, BASEBAND_RATE};
use baseband_spectrum::fifo::{CHANNEL_SPECTRUM_FIFO_K, CHANNEL_SPECTRUM_LEN};
use baseband_tools::{init_logging, SpectrumArgs, SpectrumCapture, Transmitter, TxArgs};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "baseband")]
#[command(about = "Replay audio as IQ and capture spectrum frames")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Modulate a WAV file into 8-bit IQ
    Tx(TxArgs),
    /// Accumulate spectrum frames from an IQ recording
    Spectrum(SpectrumArgs),
    /// Show engine parameters
    Info,
}

fn show_info() {
    println!("\n=== Baseband Engine ===");
    println!("Engine rate:      {} Hz", BASEBAND_RATE);
    println!("Audio rate:       {} Hz", AUDIO_RATE);
    println!("Spectrum bins:    {}", CHANNEL_SPECTRUM_LEN);
    println!("Spectrum FIFO:    {} frames", 1u32 << CHANNEL_SPECTRUM_FIFO_K);

    println!("\n=== Transmit ===");
    println!("  • AM and direct-synthesis FM");
    println!("  • 8/16-bit PCM, mono or stereo, any rate below the engine rate");
    println!("  • Subaudible tone keying");

    println!("\n=== Spectrum Windows ===");
    for window in [Window::None, Window::Hamming3, Window::Blackman3] {
        println!("  • {:?}", window);
    }

    println!("\n=== Example Usage ===");
    println!("  Transmit: baseband tx -i voice.wav -o voice.cs8 --monitor monitor.wav");
    println!("  Spectrum: baseband spectrum -i capture.cs8 -o frames.jsonl --trigger 3");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    match cli.command {
        Commands::Tx(args) => {
            info!("Replaying {:?}", args.input);
            let output = Transmitter::new(args.clone())?.transmit()?;
            println!(
                "✓ Transmission complete: {} IQ samples written to {:?}",
                output.iq.len() / 2,
                args.output
            );
        }

        Commands::Spectrum(args) => {
            info!("Capturing spectrum from {:?}", args.input);
            let output = SpectrumCapture::new(args)?.run()?;
            for stats in &output.statistics {
                println!("Channel peak {} dB over {} bins", stats.max_db, stats.count);
            }
            println!(
                "✓ Spectrum complete: {} buffers, {} frames ({} dropped)",
                output.buffers,
                output.frames.len(),
                output.dropped_frames
            );
        }

        Commands::Info => show_info(),
    }

    Ok(())
}
