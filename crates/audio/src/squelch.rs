//! Noise-based FM squelch

use crate::{AudioError, Result};
use baseband_core::filter::{BiquadConfig, Filter, IirBiquad, NON_AUDIO_48K_HPF_9KHZ};

/// Decides signal presence from out-of-band noise.
///
/// An FM discriminator output is quiet above the audio band while a carrier
/// is captured and noisy when it is not, so the block is high-passed and its
/// peak power compared against the threshold.
#[derive(Debug, Clone)]
pub struct FmSquelch {
    threshold_squared: f32,
    noise_hpf: IirBiquad,
}

impl FmSquelch {
    pub fn new() -> Self {
        Self::with_noise_filter(NON_AUDIO_48K_HPF_9KHZ)
    }

    /// Use a different noise-band filter (e.g. for another audio rate)
    pub fn with_noise_filter(config: BiquadConfig) -> Self {
        Self {
            threshold_squared: 0.0,
            noise_hpf: IirBiquad::new(config),
        }
    }

    /// Set the noise threshold; 0 disables squelch
    pub fn set_threshold(&mut self, threshold: f32) -> Result<()> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(AudioError::InvalidThreshold { threshold });
        }
        self.threshold_squared = threshold * threshold;
        Ok(())
    }

    pub fn threshold(&self) -> f32 {
        self.threshold_squared.sqrt()
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold_squared > 0.0
    }

    /// True when the block carries a signal
    pub fn execute(&mut self, block: &[f32]) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let max_squared = block.iter().fold(0.0f32, |max, &sample| {
            let noise = self.noise_hpf.process_sample(sample);
            max.max(noise * noise)
        });

        max_squared < self.threshold_squared
    }

    pub fn reset(&mut self) {
        self.noise_hpf.reset();
    }
}

impl Default for FmSquelch {
    fn default() -> Self {
        Self::new()
    }
}
