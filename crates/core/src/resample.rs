//! Fixed-point sample rate conversion
//!
//! A 24-bit phase accumulator decides, per output slot, whether a new source
//! frame is due. Between fetches the output walks linearly from the current
//! frame towards the next one, so no resampling kernel is buffered.

use crate::stream::InputStream;
use crate::{CoreError, Result};
use dasp::Sample;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Wrap threshold of the phase accumulator (1.0 in 8.24 fixed point).
pub const PHASE_ONE: u32 = 0x100_0000;

/// Bytes per sample of the source stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitDepth {
    /// Unsigned 8-bit PCM
    Eight,
    /// Signed little-endian 16-bit PCM
    Sixteen,
}

impl BitDepth {
    pub fn bytes(&self) -> usize {
        match self {
            BitDepth::Eight => 1,
            BitDepth::Sixteen => 2,
        }
    }
}

/// Interleaved channel count of the source stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelCount {
    Mono,
    Stereo,
}

impl ChannelCount {
    pub fn count(&self) -> usize {
        match self {
            ChannelCount::Mono => 1,
            ChannelCount::Stereo => 2,
        }
    }
}

/// Layout of one source frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    pub depth: BitDepth,
    pub channels: ChannelCount,
}

impl PcmFormat {
    pub const fn new(depth: BitDepth, channels: ChannelCount) -> Self {
        Self { depth, channels }
    }

    /// Bytes consumed per fetch
    pub fn frame_bytes(&self) -> usize {
        self.depth.bytes() * self.channels.count()
    }

    fn decode(&self, raw: &[u8]) -> i16 {
        match self.depth {
            BitDepth::Eight => raw[0].to_sample::<i16>(),
            BitDepth::Sixteen => i16::from_le_bytes([raw[0], raw[1]]),
        }
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::new(BitDepth::Sixteen, ChannelCount::Mono)
    }
}

/// Linear walk from the current sample towards the next one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Interpolator {
    current: i32,
    next: i32,
    step: i32,
}

impl Interpolator {
    fn fetch(&mut self, next: i16, steps: i32) {
        self.current = self.next;
        self.next = next as i32;
        self.step = (self.next - self.current) / steps;
    }

    fn hold(&mut self) {
        self.current = self.next;
        self.step = 0;
    }

    fn advance(&mut self) {
        self.current += self.step;
    }

    fn value(&self) -> i16 {
        self.current.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }
}

/// Phase-accumulator resampler reading frames from an [`InputStream`]
#[derive(Debug, Clone)]
pub struct Resampler {
    acc: u32,
    inc: u32,
    format: PcmFormat,
    left: Interpolator,
    right: Interpolator,
    frame: [u8; 4],
    frame_len: usize,
    bytes_read: u32,
}

impl Resampler {
    /// Create an idle resampler; it produces silence until an increment is set
    pub fn new(format: PcmFormat) -> Self {
        Self {
            acc: 0,
            inc: 0,
            format,
            left: Interpolator::default(),
            right: Interpolator::default(),
            frame: [0; 4],
            frame_len: 0,
            bytes_read: 0,
        }
    }

    /// `(source_rate << 24) / engine_rate`, rejected when it would not fit below [`PHASE_ONE`]
    pub fn increment_for(source_rate: u32, engine_rate: u32) -> Result<u32> {
        if source_rate == 0 {
            return Err(CoreError::InvalidSampleRate { rate: source_rate });
        }
        if engine_rate == 0 {
            return Err(CoreError::InvalidSampleRate { rate: engine_rate });
        }

        let inc = ((source_rate as u64) << 24) / engine_rate as u64;
        if inc >= PHASE_ONE as u64 {
            return Err(CoreError::ResampleError {
                msg: format!(
                    "source rate {} Hz not below engine rate {} Hz",
                    source_rate, engine_rate
                ),
            });
        }

        Ok(inc as u32)
    }

    /// Set the per-slot increment for a source/engine rate pair
    pub fn set_rates(&mut self, source_rate: u32, engine_rate: u32) -> Result<()> {
        self.inc = Self::increment_for(source_rate, engine_rate)?;
        debug!(
            "Resampling {} Hz to {} Hz, increment {}",
            source_rate, engine_rate, self.inc
        );
        Ok(())
    }

    /// Change the source layout and restart conversion
    pub fn configure(&mut self, format: PcmFormat) {
        self.format = format;
        self.reset();
    }

    /// Clear phase and interpolation history, keeping the increment
    pub fn reset(&mut self) {
        self.acc = 0;
        self.left = Interpolator::default();
        self.right = Interpolator::default();
        self.frame_len = 0;
    }

    pub fn reset_bytes_read(&mut self) {
        self.bytes_read = 0;
    }

    /// Advance one output slot and return the interpolated `(left, right)` pair.
    ///
    /// For mono sources the right value stays 0.
    #[inline]
    pub fn next_frame<S: InputStream + ?Sized>(&mut self, stream: Option<&mut S>) -> (i16, i16) {
        self.acc += self.inc;
        if self.acc >= PHASE_ONE {
            self.acc -= PHASE_ONE;
            if let Some(stream) = stream {
                self.fetch(stream);
            }
        } else {
            self.left.advance();
            self.right.advance();
        }
        (self.left.value(), self.right.value())
    }

    fn fetch<S: InputStream + ?Sized>(&mut self, stream: &mut S) {
        let steps = ((PHASE_ONE - self.acc) / self.inc).max(1) as i32;
        let need = self.format.frame_bytes();

        let got = stream.read(&mut self.frame[self.frame_len..need]);
        self.frame_len += got;
        self.bytes_read = self.bytes_read.wrapping_add(got as u32);

        if self.frame_len < need {
            // Underrun: keep the last complete frame, finish this one on a later fetch
            self.left.hold();
            self.right.hold();
            return;
        }
        self.frame_len = 0;

        let width = self.format.depth.bytes();
        let left = self.format.decode(&self.frame[..width]);
        self.left.fetch(left, steps);
        if self.format.channels == ChannelCount::Stereo {
            let right = self.format.decode(&self.frame[width..2 * width]);
            self.right.fetch(right, steps);
        }
    }

    pub fn acc(&self) -> u32 {
        self.acc
    }

    pub fn inc(&self) -> u32 {
        self.inc
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Total bytes taken from the stream since the last reset
    pub fn bytes_read(&self) -> u32 {
        self.bytes_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::input_stream;
    use quickcheck_macros::quickcheck;

    const ENGINE_RATE: u32 = 1_536_000;

    fn pcm16(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_increment_for() {
        assert_eq!(Resampler::increment_for(8000, ENGINE_RATE).unwrap(), 87381);
        assert_eq!(Resampler::increment_for(48000, ENGINE_RATE).unwrap(), PHASE_ONE / 32);
        assert!(Resampler::increment_for(0, ENGINE_RATE).is_err());
        assert!(Resampler::increment_for(8000, 0).is_err());
        assert!(Resampler::increment_for(ENGINE_RATE, ENGINE_RATE).is_err());
    }

    #[test]
    fn test_fetches_one_frame_per_wrap() {
        let (mut feeder, mut input) = input_stream(4096);
        feeder.feed(&pcm16(&[100; 1000]));

        let mut resampler = Resampler::new(PcmFormat::default());
        resampler.set_rates(48000, ENGINE_RATE).unwrap();
        for _ in 0..32 * 10 {
            resampler.next_frame(Some(&mut input));
        }
        assert_eq!(resampler.bytes_read(), 20);
    }

    #[test]
    fn test_eight_bit_stereo_decoding() {
        let (mut feeder, mut input) = input_stream(64);
        feeder.feed(&[0xFF, 0x00, 0x80, 0x80]);

        let format = PcmFormat::new(BitDepth::Eight, ChannelCount::Stereo);
        let mut resampler = Resampler::new(format);
        resampler.set_rates(48000, ENGINE_RATE).unwrap();

        // First wrap loads the frame as "next", second makes it current
        let mut last = (0, 0);
        for _ in 0..64 {
            last = resampler.next_frame(Some(&mut input));
        }
        assert_eq!(resampler.bytes_read(), 4);
        assert_eq!(last, (0x7F00, i16::MIN));
    }

    #[test]
    fn test_underrun_holds_last_sample() {
        let (mut feeder, mut input) = input_stream(64);
        feeder.feed(&pcm16(&[1000, 2000]));

        let mut resampler = Resampler::new(PcmFormat::default());
        resampler.set_rates(48000, ENGINE_RATE).unwrap();
        let mut out = Vec::new();
        for _ in 0..32 * 8 {
            out.push(resampler.next_frame(Some(&mut input)).0);
        }
        assert_eq!(resampler.bytes_read(), 4);
        assert!(out[32 * 6..].iter().all(|s| *s == 2000));
    }

    #[test]
    fn test_partial_frame_completes_later() {
        let (mut feeder, mut input) = input_stream(64);
        let bytes = pcm16(&[1234]);
        feeder.feed(&bytes[..1]);

        let mut resampler = Resampler::new(PcmFormat::default());
        resampler.set_rates(48000, ENGINE_RATE).unwrap();
        for _ in 0..32 {
            resampler.next_frame(Some(&mut input));
        }
        assert_eq!(resampler.bytes_read(), 1);

        feeder.feed(&bytes[1..]);
        let mut last = 0;
        for _ in 0..64 {
            last = resampler.next_frame(Some(&mut input)).0;
        }
        assert_eq!(resampler.bytes_read(), 2);
        assert_eq!(last, 1234);
    }

    #[test]
    fn test_no_stream_never_reads() {
        let mut resampler = Resampler::new(PcmFormat::default());
        resampler.set_rates(8000, ENGINE_RATE).unwrap();
        for _ in 0..10_000 {
            assert_eq!(resampler.next_frame::<crate::stream::StreamInput>(None), (0, 0));
        }
        assert!(resampler.acc() < PHASE_ONE);
    }

    #[quickcheck]
    fn prop_accumulator_stays_below_wrap(rates: Vec<(u16, u8)>) -> bool {
        let (mut feeder, mut input) = input_stream(1 << 16);
        feeder.feed(&[0x55; 1 << 16]);

        let mut resampler = Resampler::new(PcmFormat::default());
        for (source, speed) in rates {
            let engine = ENGINE_RATE * 100 / (speed as u32 % 200 + 20);
            let _ = resampler.set_rates(source as u32, engine);
            for _ in 0..2048 {
                resampler.next_frame(Some(&mut input));
            }
            if resampler.acc() >= PHASE_ONE {
                return false;
            }
        }
        true
    }

    #[quickcheck]
    fn prop_interpolation_is_monotonic(a: i16, b: i16, rate: u16) -> bool {
        let source_rate = 1000 + rate as u32 % 47_000;
        let (mut feeder, mut input) = input_stream(64);
        feeder.feed(&pcm16(&[a, b, b]));

        let mut resampler = Resampler::new(PcmFormat::default());
        resampler.set_rates(source_rate, ENGINE_RATE).unwrap();

        // Skip to the wrap that makes `a` current
        let mut wraps = 0;
        let mut segment = Vec::new();
        while wraps < 3 {
            let before = resampler.acc();
            let (value, _) = resampler.next_frame(Some(&mut input));
            if resampler.acc() < before + resampler.inc() {
                wraps += 1;
            }
            if wraps == 2 {
                segment.push(value);
            } else if wraps == 3 {
                // Step boundary lands exactly on `b`
                if value != b {
                    return false;
                }
            }
        }

        let (lo, hi) = (a.min(b), a.max(b));
        let in_range = segment.iter().all(|v| (lo..=hi).contains(v));
        let monotonic = if b >= a {
            segment.windows(2).all(|w| w[0] <= w[1])
        } else {
            segment.windows(2).all(|w| w[0] >= w[1])
        };
        segment.first() == Some(&a) && in_range && monotonic
    }
}
