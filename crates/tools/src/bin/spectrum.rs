//! Baseband Spectrum - accumulate spectrum frames from an IQ recording

use anyhow::Result;
use baseband_tools::{init_logging, SpectrumArgs, SpectrumCapture};
use clap::Parser;

fn main() -> Result<()> {
    init_logging(true, false);

    let args = SpectrumArgs::parse();
    let output = SpectrumCapture::new(args)?.run()?;

    for stats in &output.statistics {
        println!("Channel peak {} dB over {} bins", stats.max_db, stats.count);
    }
    println!(
        "Spectrum complete: {} buffers, {} frames",
        output.buffers,
        output.frames.len()
    );
    Ok(())
}
