//! Baseband Tools library
//!
//! Host-side stand-ins for the control side of the handheld: they feed the
//! processing engines from files and collect what comes back.

pub mod common;
pub mod config;
pub mod spectrum;
pub mod tx;

pub use common::{init_logging, load_config, save_config, ProgressReporter};
pub use config::{SpectrumSessionConfig, TxSessionConfig};
pub use spectrum::{capture, CaptureOutput, SpectrumArgs, SpectrumCapture, SpectrumFrame};
pub use tx::{replay, PcmSource, ReplayOutput, Transmitter, TxArgs};
