//! Sample buffers and fixed-point sample types

use crate::{CoreError, Result};
use std::ops::{Index, IndexMut};

/// Complex samples per hardware transfer buffer.
pub const IQ_BUFFER_LEN: usize = 2048;

/// Generic fixed-capacity sample buffer tagged with its sampling rate
#[derive(Debug, Clone)]
pub struct SampleBuffer<T> {
    data: Vec<T>,
    sample_rate: u32,
}

impl<T> SampleBuffer<T>
where
    T: Clone + Default,
{
    /// Create a new sample buffer with specified length and sample rate
    pub fn new(len: usize, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(CoreError::InvalidSampleRate { rate: sample_rate });
        }

        Ok(Self {
            data: vec![T::default(); len],
            sample_rate,
        })
    }

    /// Create a buffer from existing data
    pub fn from_data(data: Vec<T>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(CoreError::InvalidSampleRate { rate: sample_rate });
        }

        Ok(Self { data, sample_rate })
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Retag the buffer after the transfer clock changed
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(CoreError::InvalidSampleRate { rate: sample_rate });
        }
        self.sample_rate = sample_rate;
        Ok(())
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Overwrite every sample with `value` without reallocating
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T> Index<usize> for SampleBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for SampleBuffer<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// Signed 8-bit IQ pair, the radio transfer format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Complex8 {
    pub re: i8,
    pub im: i8,
}

impl Complex8 {
    pub const fn new(re: i8, im: i8) -> Self {
        Self { re, im }
    }
}

/// Signed 16-bit IQ pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Complex16 {
    pub re: i16,
    pub im: i16,
}

impl Complex16 {
    pub const fn new(re: i16, im: i16) -> Self {
        Self { re, im }
    }

    /// Squared magnitude, exact in 32 bits
    pub fn norm_sqr(&self) -> u32 {
        let re = self.re.unsigned_abs() as u32;
        let im = self.im.unsigned_abs() as u32;
        re * re + im * im
    }
}

/// 32-bit integer IQ pair used as an accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Complex32i {
    pub re: i32,
    pub im: i32,
}

impl Complex32i {
    pub const ZERO: Self = Self { re: 0, im: 0 };

    pub const fn new(re: i32, im: i32) -> Self {
        Self { re, im }
    }

    /// Narrow to 16 bits, saturating each component
    pub fn saturate(self) -> Complex16 {
        Complex16 {
            re: self.re.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            im: self.im.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        }
    }
}

/// Accumulation clamps at the `i32` range rather than wrapping
impl std::ops::AddAssign<Complex8> for Complex32i {
    fn add_assign(&mut self, rhs: Complex8) {
        self.re = self.re.saturating_add(rhs.re as i32);
        self.im = self.im.saturating_add(rhs.im as i32);
    }
}

/// One frame of the stereo audio DMA stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StereoFrame {
    pub left: i16,
    pub right: i16,
}

/// Hardware transfer buffer of radio samples
pub type IqBuffer = SampleBuffer<Complex8>;

/// Buffer of narrowed spectrum bins
pub type SpectrumBuffer = SampleBuffer<Complex16>;
