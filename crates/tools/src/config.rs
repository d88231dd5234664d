//! Session configuration files for the tools

use anyhow::{Context, Result};
use baseband_core::fft::window::Window;
use baseband_core::message::{AudioTxConfig, Modulation, WidebandSpectrumConfig};
use baseband_core::resample::PcmFormat;
use baseband_core::BASEBAND_RATE;
use baseband_modem::tone::ToneMixer;
use baseband_spectrum::fifo::CHANNEL_SPECTRUM_FIFO_K;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Transmit replay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxSessionConfig {
    pub modulation: Modulation,
    pub deviation_hz: u32,
    /// Subaudible keying tone, 0 disables it
    pub tone_hz: f32,
    pub tone_mix_weight: f32,
    /// Playback speed in percent
    pub speed: u32,
    /// IQ samples between progress reports
    pub progress_divider: u32,
}

impl Default for TxSessionConfig {
    fn default() -> Self {
        Self {
            modulation: Modulation::Fm,
            deviation_hz: 5_000,
            tone_hz: 0.0,
            tone_mix_weight: 0.0,
            speed: 100,
            progress_divider: BASEBAND_RATE / 10,
        }
    }
}

impl TxSessionConfig {
    /// Engine configuration for a source in `format`
    pub fn audio_tx_config(&self, format: PcmFormat) -> AudioTxConfig {
        AudioTxConfig {
            divider: self.progress_divider,
            deviation_hz: self.deviation_hz,
            tone_key_delta: ToneMixer::delta_for(self.tone_hz, BASEBAND_RATE),
            tone_key_mix_weight: self.tone_mix_weight,
            speed: self.speed,
            bit_depth: format.depth,
            channels: format.channels,
            modulation: self.modulation,
        }
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }
}

/// Spectrum capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumSessionConfig {
    pub sampling_rate: u32,
    /// Buffers accumulated per flush, minus one
    pub trigger: u32,
    pub gain: i32,
    pub window: Window,
    /// Channel blocks skipped between display frames, plus one
    pub decimation: usize,
    pub fifo_k: u32,
}

impl Default for SpectrumSessionConfig {
    fn default() -> Self {
        Self {
            sampling_rate: BASEBAND_RATE,
            trigger: 0,
            gain: 1,
            window: Window::Hamming3,
            decimation: 1,
            fifo_k: CHANNEL_SPECTRUM_FIFO_K,
        }
    }
}

impl SpectrumSessionConfig {
    pub fn wideband_config(&self) -> WidebandSpectrumConfig {
        WidebandSpectrumConfig {
            sampling_rate: self.sampling_rate,
            trigger: self.trigger,
            gain: self.gain,
        }
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }
}
