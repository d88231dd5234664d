//! Baseband TX - replay a WAV file through the transmit engine

use anyhow::Result;
use baseband_tools::{init_logging, Transmitter, TxArgs};
use clap::Parser;

fn main() -> Result<()> {
    init_logging(true, false);

    let args = TxArgs::parse();
    let output = Transmitter::new(args)?.transmit()?;

    println!(
        "Transmission complete: {} IQ samples from {} input bytes",
        output.iq.len() / 2,
        output.bytes_read
    );
    Ok(())
}
