//! Subaudible tone keying

use baseband_core::sine::sin_i8;
use serde::{Deserialize, Serialize};

/// Mixes a sine tone into the modulating signal.
///
/// The tone phase advances on every sample even when the mix weight is 0, so
/// a later weight change picks the tone up without a phase jump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ToneMixer {
    delta: u32,
    weight: f32,
    phase: u32,
}

impl ToneMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase increment per sample for a tone of `tone_hz` at `sample_rate`
    pub fn delta_for(tone_hz: f32, sample_rate: u32) -> u32 {
        if sample_rate == 0 || tone_hz <= 0.0 {
            return 0;
        }
        ((tone_hz as f64 * 4_294_967_296.0) / sample_rate as f64) as u32
    }

    /// Set the tone increment and its share of the output (clamped to 0.0..=1.0)
    pub fn configure(&mut self, delta: u32, weight: f32) {
        self.delta = delta;
        self.weight = weight.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn process(&mut self, sample: i8) -> i8 {
        let tone = sin_i8(self.phase);
        self.phase = self.phase.wrapping_add(self.delta);

        let mixed = sample as f32 * (1.0 - self.weight) + tone as f32 * self.weight;
        mixed as i8
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_zero_weight_passes_sample() {
        let mut tone = ToneMixer::new();
        tone.configure(ToneMixer::delta_for(88.5, 1_536_000), 0.0);
        for sample in [-128i8, -1, 0, 1, 127] {
            assert_eq!(tone.process(sample), sample);
        }
    }

    #[test]
    fn test_phase_advances_regardless_of_weight() {
        let mut tone = ToneMixer::new();
        tone.configure(1000, 0.0);
        for _ in 0..10 {
            tone.process(0);
        }
        assert_eq!(tone.phase(), 10_000);
    }

    #[test]
    fn test_full_weight_is_pure_tone() {
        let mut tone = ToneMixer::new();
        // Quarter turn per sample: 0, +peak, 0, -peak
        tone.configure(1 << 30, 1.0);
        let out: Vec<i8> = (0..4).map(|_| tone.process(100)).collect();
        assert_eq!(out, vec![0, 127, 0, -127]);
    }

    #[test]
    fn test_delta_for() {
        assert_eq!(ToneMixer::delta_for(48_000.0, 192_000), 1 << 30);
        assert_eq!(ToneMixer::delta_for(100.0, 0), 0);
    }

    #[quickcheck]
    fn prop_mix_stays_between_inputs(sample: i8, weight: u8) -> bool {
        let mut tone = ToneMixer::new();
        tone.configure(0, weight as f32 / 255.0);
        // Phase 0 gives a tone value of 0
        let out = tone.process(sample) as i16;
        let (lo, hi) = ((sample as i16).min(0), (sample as i16).max(0));
        (lo..=hi).contains(&out)
    }
}
