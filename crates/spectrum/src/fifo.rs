//! Channel spectrum frames and their FIFO to the display side

use crate::{Result, SpectrumError};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Bins per channel spectrum frame
pub const CHANNEL_SPECTRUM_LEN: usize = 256;

/// Default FIFO depth exponent, 4 frames
pub const CHANNEL_SPECTRUM_FIFO_K: u32 = 2;

const MAX_FIFO_K: u32 = 12;

/// One display frame: log magnitudes mapped onto 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpectrum {
    pub db: [u8; CHANNEL_SPECTRUM_LEN],
    pub sampling_rate: u32,
    pub channel_filter_pass_frequency: u32,
    pub channel_filter_stop_frequency: u32,
}

impl Default for ChannelSpectrum {
    fn default() -> Self {
        Self {
            db: [0; CHANNEL_SPECTRUM_LEN],
            sampling_rate: 0,
            channel_filter_pass_frequency: 0,
            channel_filter_stop_frequency: 0,
        }
    }
}

/// Create a FIFO holding `1 << k` frames
pub fn channel_spectrum_fifo(k: u32) -> Result<(SpectrumProducer, SpectrumConsumer)> {
    if k > MAX_FIFO_K {
        return Err(SpectrumError::InvalidFifoSize { k });
    }

    let (prod, cons) = HeapRb::<ChannelSpectrum>::new(1 << k).split();
    Ok((
        SpectrumProducer {
            prod,
            k,
            dropped: 0,
        },
        SpectrumConsumer { cons },
    ))
}

/// Producer half; a full FIFO drops the frame being pushed
pub struct SpectrumProducer {
    prod: HeapProd<ChannelSpectrum>,
    k: u32,
    dropped: u64,
}

impl SpectrumProducer {
    /// Queue a frame, returning false if it was dropped
    pub fn push(&mut self, frame: ChannelSpectrum) -> bool {
        if self.prod.try_push(frame).is_err() {
            self.dropped += 1;
            return false;
        }
        true
    }

    /// Depth exponent announced to the consumer
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Frames lost to a full FIFO
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Consumer half read by the display side
pub struct SpectrumConsumer {
    cons: HeapCons<ChannelSpectrum>,
}

impl SpectrumConsumer {
    pub fn pop(&mut self) -> Option<ChannelSpectrum> {
        self.cons.try_pop()
    }

    pub fn len(&self) -> usize {
        self.cons.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.cons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rate: u32) -> ChannelSpectrum {
        ChannelSpectrum {
            sampling_rate: rate,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_fifo_drops_newest() {
        let (mut producer, mut consumer) = channel_spectrum_fifo(1).unwrap();
        assert!(producer.push(frame(1)));
        assert!(producer.push(frame(2)));
        assert!(!producer.push(frame(3)));
        assert_eq!(producer.dropped(), 1);

        assert_eq!(consumer.len(), 2);
        assert_eq!(consumer.pop().unwrap().sampling_rate, 1);
        assert_eq!(consumer.pop().unwrap().sampling_rate, 2);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_fifo_size_limit() {
        assert!(channel_spectrum_fifo(MAX_FIFO_K + 1).is_err());
        let (producer, _) = channel_spectrum_fifo(CHANNEL_SPECTRUM_FIFO_K).unwrap();
        assert_eq!(producer.k(), CHANNEL_SPECTRUM_FIFO_K);
    }
}
