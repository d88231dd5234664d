//! Byte and sample streams shared with the control side
//!
//! Both directions are single-producer/single-consumer rings; neither end
//! ever blocks. A short read or write is the only signal of underrun/overrun.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Source of raw PCM bytes consumed by the processing tick
pub trait InputStream: Send {
    /// Copy up to `dst.len()` bytes, returning how many were available
    fn read(&mut self, dst: &mut [u8]) -> usize;
}

/// Sink for conditioned audio (e.g. a monitor output)
pub trait OutputStream: Send {
    /// Queue samples, returning how many were accepted
    fn write(&mut self, samples: &[i16]) -> usize;
}

/// Create a byte stream of `capacity` bytes
pub fn input_stream(capacity: usize) -> (StreamFeeder, StreamInput) {
    let (prod, cons) = HeapRb::<u8>::new(capacity.max(2)).split();
    (StreamFeeder { prod }, StreamInput { cons })
}

/// Control-side writer of an input stream
pub struct StreamFeeder {
    prod: HeapProd<u8>,
}

impl StreamFeeder {
    /// Push as many bytes as fit
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        self.prod.push_slice(bytes)
    }

    /// Free space in bytes
    pub fn vacant(&self) -> usize {
        self.prod.vacant_len()
    }
}

/// Processing-side reader of an input stream
pub struct StreamInput {
    cons: HeapCons<u8>,
}

impl StreamInput {
    /// Bytes queued and not yet read
    pub fn available(&self) -> usize {
        self.cons.occupied_len()
    }
}

impl InputStream for StreamInput {
    fn read(&mut self, dst: &mut [u8]) -> usize {
        self.cons.pop_slice(dst)
    }
}

/// Create a monitor stream holding up to `capacity` samples
pub fn monitor_stream(capacity: usize) -> (MonitorOutput, MonitorTap) {
    let (prod, cons) = HeapRb::<i16>::new(capacity.max(2)).split();
    (MonitorOutput { prod, dropped: 0 }, MonitorTap { cons })
}

/// Processing-side writer of a monitor stream
pub struct MonitorOutput {
    prod: HeapProd<i16>,
    dropped: u64,
}

impl MonitorOutput {
    /// Samples discarded because the tap was not drained in time
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl OutputStream for MonitorOutput {
    fn write(&mut self, samples: &[i16]) -> usize {
        let written = self.prod.push_slice(samples);
        self.dropped += (samples.len() - written) as u64;
        written
    }
}

/// Control-side reader of a monitor stream
pub struct MonitorTap {
    cons: HeapCons<i16>,
}

impl MonitorTap {
    /// Move every queued sample into `dst`
    pub fn drain_into(&mut self, dst: &mut Vec<i16>) -> usize {
        let before = dst.len();
        dst.extend(self.cons.pop_iter());
        dst.len() - before
    }

    pub fn is_empty(&self) -> bool {
        self.cons.is_empty()
    }
}
