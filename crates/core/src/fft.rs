//! FFT processing wrapper

use crate::{CoreError, Result};
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// FFT configuration
#[derive(Debug, Clone)]
pub struct FftConfig {
    pub size: usize,
    pub sample_rate: u32,
}

impl FftConfig {
    pub fn new(size: usize, sample_rate: u32) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(CoreError::FftError {
                msg: format!("FFT size must be a power of 2, got {}", size),
            });
        }

        if sample_rate == 0 {
            return Err(CoreError::InvalidSampleRate { rate: sample_rate });
        }

        Ok(Self { size, sample_rate })
    }

    /// Get frequency resolution (Hz per bin)
    pub fn frequency_resolution(&self) -> f32 {
        self.sample_rate as f32 / self.size as f32
    }
}

/// Forward FFT with planning and scratch space done up front
pub struct FftProcessor {
    config: FftConfig,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex32>,
}

impl FftProcessor {
    /// Create a new FFT processor
    pub fn new(config: FftConfig) -> Result<Self> {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.size);
        let scratch = vec![Complex32::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(Self {
            config,
            fft,
            scratch,
        })
    }

    /// Get the FFT configuration
    pub fn config(&self) -> &FftConfig {
        &self.config
    }

    /// Perform forward FFT in place
    pub fn forward(&mut self, buffer: &mut [Complex32]) -> Result<()> {
        if buffer.len() != self.config.size {
            return Err(CoreError::BufferSizeMismatch {
                expected: self.config.size,
                actual: buffer.len(),
            });
        }

        self.fft.process_with_scratch(buffer, &mut self.scratch);
        Ok(())
    }

    /// Forward FFT with the halves swapped so DC lands in the middle bin
    pub fn forward_swapped(&mut self, buffer: &mut [Complex32]) -> Result<()> {
        self.forward(buffer)?;
        buffer.rotate_left(self.config.size / 2);
        Ok(())
    }
}

/// Windowing applied to spectrum bins
pub mod window {
    use rustfft::num_complex::Complex32;
    use serde::{Deserialize, Serialize};

    /// Window applied as a short convolution over FFT bins.
    ///
    /// Multiplying by a raised-cosine window in time is the same as a
    /// three/five-tap kernel across neighbouring bins, so no time-domain pass
    /// is needed. Without the `spectrum-window` feature every variant is `None`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Window {
        #[default]
        None,
        Hamming3,
        Blackman3,
    }

    impl Window {
        /// Windowed value of bin `i`; `bins.len()` must be a power of two
        #[inline]
        pub fn sample(&self, bins: &[Complex32], i: usize) -> Complex32 {
            debug_assert!(bins.len().is_power_of_two());
            let mask = bins.len() - 1;
            let at = |offset: isize| bins[(i as isize + offset) as usize & mask];

            #[cfg(feature = "spectrum-window")]
            {
                match self {
                    Window::None => bins[i],
                    Window::Hamming3 => at(0) * 0.54 - (at(-1) + at(1)) * 0.23,
                    Window::Blackman3 => {
                        at(0) * 0.42 - (at(-1) + at(1)) * 0.25 + (at(-2) + at(2)) * 0.04
                    }
                }
            }
            #[cfg(not(feature = "spectrum-window"))]
            {
                let _ = at;
                bins[i]
            }
        }

        /// Window every bin of `input` into `output`
        pub fn apply(&self, input: &[Complex32], output: &mut [Complex32]) {
            for (i, out) in output.iter_mut().enumerate().take(input.len()) {
                *out = self.sample(input, i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::window::Window;
    use super::*;

    #[test]
    fn test_fft_config_creation() {
        let config = FftConfig::new(256, 2_560_000).unwrap();
        assert_eq!(config.size, 256);
        assert!((config.frequency_resolution() - 10_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_fft_config_invalid_size() {
        assert!(FftConfig::new(1000, 48000).is_err());
        assert!(FftConfig::new(0, 48000).is_err());
        assert!(FftConfig::new(256, 0).is_err());
    }

    #[test]
    fn test_swapped_dc_in_centre() {
        let mut processor = FftProcessor::new(FftConfig::new(8, 1000).unwrap()).unwrap();
        let mut buffer = vec![Complex32::new(1.0, 0.0); 8];
        processor.forward_swapped(&mut buffer).unwrap();

        assert!((buffer[4].re - 8.0).abs() < 1e-5);
        for (i, bin) in buffer.iter().enumerate() {
            if i != 4 {
                assert!(bin.norm() < 1e-5);
            }
        }
    }

    #[test]
    fn test_forward_rejects_wrong_length() {
        let mut processor = FftProcessor::new(FftConfig::new(8, 1000).unwrap()).unwrap();
        let mut buffer = vec![Complex32::new(0.0, 0.0); 4];
        assert!(processor.forward(&mut buffer).is_err());
    }

    #[test]
    fn test_window_none_is_identity() {
        let bins: Vec<Complex32> = (0..8).map(|i| Complex32::new(i as f32, -(i as f32))).collect();
        let mut out = vec![Complex32::new(0.0, 0.0); 8];
        Window::None.apply(&bins, &mut out);
        assert_eq!(bins, out);
    }

    #[cfg(feature = "spectrum-window")]
    #[test]
    fn test_hamming_spreads_single_bin() {
        let mut bins = vec![Complex32::new(0.0, 0.0); 8];
        bins[0] = Complex32::new(1.0, 0.0);
        let mut out = vec![Complex32::new(0.0, 0.0); 8];
        Window::Hamming3.apply(&bins, &mut out);

        assert!((out[0].re - 0.54).abs() < 1e-6);
        assert!((out[1].re + 0.23).abs() < 1e-6);
        // Wraps around the array
        assert!((out[7].re + 0.23).abs() < 1e-6);
        assert!(out[2].re.abs() < 1e-6);
    }

    #[cfg(feature = "spectrum-window")]
    #[test]
    fn test_blackman_reduces_leakage() {
        let n = 256;
        let tone: Vec<Complex32> = (0..n)
            .map(|k| {
                let phase = 2.0 * std::f32::consts::PI * 20.5 * k as f32 / n as f32;
                Complex32::new(phase.cos(), phase.sin())
            })
            .collect();

        let mut spectrum = tone.clone();
        let mut processor = FftProcessor::new(FftConfig::new(n, 1000).unwrap()).unwrap();
        processor.forward(&mut spectrum).unwrap();

        let mut windowed = vec![Complex32::new(0.0, 0.0); n];
        Window::Blackman3.apply(&spectrum, &mut windowed);

        // Far from the tone the windowed spectrum is much cleaner
        let far = 120;
        assert!(windowed[far].norm() < spectrum[far].norm() * 0.1);
    }
}
