//! Block decimation

/// Passes one block of `N` consecutive samples, then skips `factor - 1` blocks.
///
/// Spectral estimates only need an occasional contiguous block, so whole
/// blocks are dropped instead of filtering sample by sample.
#[derive(Debug, Clone)]
pub struct BlockDecimator<T, const N: usize> {
    block: [T; N],
    index: usize,
    skip: usize,
    factor: usize,
}

impl<T: Copy + Default, const N: usize> BlockDecimator<T, N> {
    pub fn new(factor: usize) -> Self {
        Self {
            block: [T::default(); N],
            index: 0,
            skip: 0,
            factor: factor.max(1),
        }
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Change the factor, restarting the current block
    pub fn set_factor(&mut self, factor: usize) {
        self.factor = factor.max(1);
        self.index = 0;
        self.skip = 0;
    }

    /// Feed samples at `sampling_rate`; each full block is handed to
    /// `on_block` with the decimated rate
    pub fn feed<F>(&mut self, samples: &[T], sampling_rate: u32, mut on_block: F)
    where
        F: FnMut(&[T; N], u32),
    {
        let output_rate = sampling_rate / self.factor as u32;
        for &sample in samples {
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }

            self.block[self.index] = sample;
            self.index += 1;
            if self.index == N {
                on_block(&self.block, output_rate);
                self.index = 0;
                self.skip = (self.factor - 1) * N;
            }
        }
    }
}
