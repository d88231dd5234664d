//! Digital filter implementations

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Generic filter trait
pub trait Filter<T: Copy> {
    /// Process a single sample
    fn process_sample(&mut self, input: T) -> T;

    /// Process a buffer of samples
    fn process_buffer(&mut self, input: &[T], output: &mut [T]) -> Result<()> {
        if input.len() != output.len() {
            return Err(CoreError::BufferSizeMismatch {
                expected: input.len(),
                actual: output.len(),
            });
        }

        for (out, sample) in output.iter_mut().zip(input) {
            *out = self.process_sample(*sample);
        }

        Ok(())
    }

    /// Filter a block, replacing each sample with the filter output
    fn execute_in_place(&mut self, buffer: &mut [T]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Reset the filter state
    fn reset(&mut self);
}

/// Second-order section coefficients, `a[0]` normalised to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadConfig {
    pub b: [f32; 3],
    pub a: [f32; 3],
}

/// Butterworth high-pass at 30 Hz for 48 kHz audio, removes DC and rumble.
pub const AUDIO_48K_HPF_30HZ: BiquadConfig = BiquadConfig {
    b: [0.997_227_05, -1.994_454_1, 0.997_227_05],
    a: [1.0, -1.994_446_4, 0.994_461_8],
};

/// Butterworth high-pass at 9 kHz for 48 kHz audio; isolates the noise band the squelch watches.
pub const NON_AUDIO_48K_HPF_9KHZ: BiquadConfig = BiquadConfig {
    b: [0.418_163_35, -0.836_326_7, 0.418_163_35],
    a: [1.0, -0.462_938_03, 0.209_715_36],
};

impl BiquadConfig {
    /// Identity section
    pub const fn passthrough() -> Self {
        Self {
            b: [1.0, 0.0, 0.0],
            a: [1.0, 0.0, 0.0],
        }
    }

    /// RBJ cookbook high-pass section
    pub fn highpass(cutoff_freq: f32, sample_rate: f32, q: f32) -> Result<Self> {
        if cutoff_freq <= 0.0 || cutoff_freq >= sample_rate / 2.0 {
            return Err(CoreError::InvalidFilterParameters {
                msg: format!("Invalid cutoff frequency: {}", cutoff_freq),
            });
        }
        if q <= 0.0 {
            return Err(CoreError::InvalidFilterParameters {
                msg: format!("Invalid Q: {}", q),
            });
        }

        let w0 = 2.0 * PI * cutoff_freq / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let norm = 1.0 / (1.0 + alpha);

        Ok(Self {
            b: [
                (1.0 + cos) * 0.5 * norm,
                -(1.0 + cos) * norm,
                (1.0 + cos) * 0.5 * norm,
            ],
            a: [1.0, -2.0 * cos * norm, (1.0 - alpha) * norm],
        })
    }

    /// First-order de-emphasis for a time constant in seconds (75e-6 or 50e-6 for broadcast FM).
    ///
    /// Bilinear transform prewarped at the corner, unity gain at DC.
    pub fn deemphasis(time_constant: f32, sample_rate: f32) -> Result<Self> {
        if time_constant <= 0.0 {
            return Err(CoreError::InvalidFilterParameters {
                msg: format!("Invalid time constant: {}", time_constant),
            });
        }
        let corner = 1.0 / (2.0 * PI * time_constant);
        if corner >= sample_rate / 2.0 {
            return Err(CoreError::InvalidFilterParameters {
                msg: format!("De-emphasis corner {} Hz above Nyquist", corner),
            });
        }

        let k = 1.0 / (1.0 / (2.0 * sample_rate * time_constant)).tan();
        let norm = 1.0 / (1.0 + k);

        Ok(Self {
            b: [norm, norm, 0.0],
            a: [1.0, (1.0 - k) * norm, 0.0],
        })
    }
}

impl Default for BiquadConfig {
    fn default() -> Self {
        Self::passthrough()
    }
}

/// Direct form I biquad
#[derive(Debug, Clone)]
pub struct IirBiquad {
    config: BiquadConfig,
    x: [f32; 2],
    y: [f32; 2],
}

impl IirBiquad {
    pub fn new(config: BiquadConfig) -> Self {
        Self {
            config,
            x: [0.0; 2],
            y: [0.0; 2],
        }
    }

    /// Swap coefficients, clearing history
    pub fn configure(&mut self, config: BiquadConfig) {
        self.config = config;
        self.reset();
    }

    pub fn config(&self) -> &BiquadConfig {
        &self.config
    }
}

impl Default for IirBiquad {
    fn default() -> Self {
        Self::new(BiquadConfig::passthrough())
    }
}

impl Filter<f32> for IirBiquad {
    fn process_sample(&mut self, input: f32) -> f32 {
        let BiquadConfig { b, a } = self.config;
        let output = b[0] * input + b[1] * self.x[0] + b[2] * self.x[1]
            - a[1] * self.y[0]
            - a[2] * self.y[1];

        self.x = [input, self.x[0]];
        self.y = [output, self.y[0]];

        output
    }

    fn reset(&mut self) {
        self.x = [0.0; 2];
        self.y = [0.0; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * PI * freq * n as f32 / rate).sin() * 0.5)
            .collect()
    }

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_highpass_design_matches_table() {
        let designed = BiquadConfig::highpass(30.0, 48000.0, std::f32::consts::FRAC_1_SQRT_2).unwrap();
        for i in 0..3 {
            assert!((designed.b[i] - AUDIO_48K_HPF_30HZ.b[i]).abs() < 1e-4);
            assert!((designed.a[i] - AUDIO_48K_HPF_30HZ.a[i]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_invalid_designs() {
        assert!(BiquadConfig::highpass(0.0, 48000.0, 0.7).is_err());
        assert!(BiquadConfig::highpass(30000.0, 48000.0, 0.7).is_err());
        assert!(BiquadConfig::highpass(300.0, 48000.0, 0.0).is_err());
        assert!(BiquadConfig::deemphasis(0.0, 48000.0).is_err());
        assert!(BiquadConfig::deemphasis(1e-7, 48000.0).is_err());
    }

    #[test]
    fn test_passthrough_is_identity() {
        let mut filter = IirBiquad::default();
        let mut block = [0.25, -0.5, 1.0, 0.0];
        filter.execute_in_place(&mut block);
        assert_eq!(block, [0.25, -0.5, 1.0, 0.0]);
    }

    #[test]
    fn test_highpass_removes_dc() {
        let mut filter = IirBiquad::new(AUDIO_48K_HPF_30HZ);
        let mut block = vec![0.5f32; 48000];
        filter.execute_in_place(&mut block);
        assert!(peak(&block[47000..]) < 1e-3);
    }

    #[test]
    fn test_deemphasis_response() {
        let config = BiquadConfig::deemphasis(75e-6, 48000.0).unwrap();

        let mut filter = IirBiquad::new(config);
        let mut dc = vec![0.5f32; 4800];
        filter.execute_in_place(&mut dc);
        assert!((dc[4799] - 0.5).abs() < 1e-3);

        let mut filter = IirBiquad::new(config);
        let mut treble = tone(10000.0, 48000.0, 4800);
        filter.execute_in_place(&mut treble);
        assert!(peak(&treble[2400..]) < 0.5 * 0.25);
    }

    #[test]
    fn test_process_buffer_length_mismatch() {
        let mut filter = IirBiquad::default();
        let input = [0.0f32; 4];
        let mut output = [0.0f32; 3];
        assert!(filter.process_buffer(&input, &mut output).is_err());
    }
}
