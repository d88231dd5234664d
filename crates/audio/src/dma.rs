//! Audio DMA transfer buffers

use crate::{AudioError, Result};
use baseband_core::buffer::StereoFrame;

/// Frames in one audio DMA transfer
pub const AUDIO_TRANSFER_LEN: usize = 32;

/// Hands out the next free transmit buffer of the audio DMA.
///
/// Buffers are owned by the DMA layer; callers only fill them.
pub trait AudioDma {
    fn tx_empty_buffer(&mut self) -> &mut [StereoFrame];
}

/// Pre-allocated round-robin pool of transfer buffers
#[derive(Debug, Clone)]
pub struct DmaRing {
    transfers: Vec<[StereoFrame; AUDIO_TRANSFER_LEN]>,
    next: usize,
    issued: u64,
}

impl DmaRing {
    pub fn new(transfer_count: usize) -> Result<Self> {
        if transfer_count == 0 {
            return Err(AudioError::EmptyDmaRing);
        }

        Ok(Self {
            transfers: vec![[StereoFrame::default(); AUDIO_TRANSFER_LEN]; transfer_count],
            next: 0,
            issued: 0,
        })
    }

    /// Number of buffers handed out so far
    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn transfer(&self, index: usize) -> Option<&[StereoFrame]> {
        self.transfers.get(index).map(|t| &t[..])
    }

    /// The buffer most recently handed out
    pub fn last_filled(&self) -> Option<&[StereoFrame]> {
        if self.issued == 0 {
            return None;
        }
        let index = (self.next + self.transfers.len() - 1) % self.transfers.len();
        self.transfer(index)
    }
}

impl AudioDma for DmaRing {
    fn tx_empty_buffer(&mut self) -> &mut [StereoFrame] {
        let index = self.next;
        self.next = (self.next + 1) % self.transfers.len();
        self.issued += 1;
        &mut self.transfers[index]
    }
}
