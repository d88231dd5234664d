//! Fixed-size block batching

/// Collects samples into blocks of exactly `N`, carrying partial blocks over
/// between feeds.
#[derive(Debug, Clone)]
pub struct BlockBuffer<T, const N: usize> {
    block: [T; N],
    len: usize,
}

impl<T: Copy + Default, const N: usize> BlockBuffer<T, N> {
    pub fn new() -> Self {
        Self {
            block: [T::default(); N],
            len: 0,
        }
    }

    /// Append one sample, returning the completed block when it fills
    #[inline]
    pub fn push(&mut self, value: T) -> Option<[T; N]> {
        self.block[self.len] = value;
        self.len += 1;
        if self.len == N {
            self.len = 0;
            Some(self.block)
        } else {
            None
        }
    }

    /// Append a slice, handing every completed block to `on_block` in order
    pub fn feed<F>(&mut self, samples: &[T], mut on_block: F)
    where
        F: FnMut(&mut [T; N]),
    {
        for &sample in samples {
            if let Some(mut block) = self.push(sample) {
                on_block(&mut block);
            }
        }
    }

    /// Samples waiting for the current block to fill
    pub fn pending(&self) -> usize {
        self.len
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<T: Copy + Default, const N: usize> Default for BlockBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
