//! AM and FM modulation of 8-bit samples into IQ pairs

use baseband_core::buffer::Complex8;
use baseband_core::message::Modulation;
use baseband_core::sine::{cos_i8, sin_i8};

/// Sample-by-sample modulator
pub trait Modulator {
    /// Map one signed modulating value to an IQ pair
    fn modulate(&mut self, sample: i8) -> Complex8;

    /// Reset modulator state
    fn reset(&mut self);
}

/// Carrier amplitude follows the signal; output is real only
#[derive(Debug, Clone, Copy, Default)]
pub struct AmModulator;

impl Modulator for AmModulator {
    #[inline]
    fn modulate(&mut self, sample: i8) -> Complex8 {
        Complex8::new(sample / 2 + 64, 0)
    }

    fn reset(&mut self) {}
}

/// Direct digital synthesis FM: the signal steers a 32-bit phase accumulator
#[derive(Debug, Clone, Copy, Default)]
pub struct FmModulator {
    fm_delta: u32,
    phase: u32,
}

impl FmModulator {
    pub fn new(deviation_hz: u32, engine_rate: u32) -> Self {
        Self {
            fm_delta: Self::delta_for(deviation_hz, engine_rate),
            phase: 0,
        }
    }

    /// Phase increment per unit of modulating value.
    ///
    /// A full-scale value of 128 advances the phase by `deviation_hz` cycles
    /// per second at `engine_rate`.
    pub fn delta_for(deviation_hz: u32, engine_rate: u32) -> u32 {
        if engine_rate == 0 {
            return 0;
        }
        (((deviation_hz as u64) << 25) / engine_rate as u64) as u32
    }

    pub fn fm_delta(&self) -> u32 {
        self.fm_delta
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }
}

impl Modulator for FmModulator {
    #[inline]
    fn modulate(&mut self, sample: i8) -> Complex8 {
        let delta = (sample as i32).wrapping_mul(self.fm_delta as i32);
        self.phase = self.phase.wrapping_add(delta as u32);
        Complex8::new(cos_i8(self.phase), sin_i8(self.phase))
    }

    fn reset(&mut self) {
        self.phase = 0;
    }
}

/// The modulator selected by configuration
#[derive(Debug, Clone, Copy)]
pub enum ModulatorKind {
    Am(AmModulator),
    Fm(FmModulator),
}

impl ModulatorKind {
    pub fn new(modulation: Modulation, deviation_hz: u32, engine_rate: u32) -> Self {
        match modulation {
            Modulation::Am => ModulatorKind::Am(AmModulator),
            Modulation::Fm => ModulatorKind::Fm(FmModulator::new(deviation_hz, engine_rate)),
        }
    }

    pub fn modulation(&self) -> Modulation {
        match self {
            ModulatorKind::Am(_) => Modulation::Am,
            ModulatorKind::Fm(_) => Modulation::Fm,
        }
    }
}

impl Modulator for ModulatorKind {
    #[inline]
    fn modulate(&mut self, sample: i8) -> Complex8 {
        match self {
            ModulatorKind::Am(am) => am.modulate(sample),
            ModulatorKind::Fm(fm) => fm.modulate(sample),
        }
    }

    fn reset(&mut self) {
        match self {
            ModulatorKind::Am(am) => am.reset(),
            ModulatorKind::Fm(fm) => fm.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseband_core::BASEBAND_RATE;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_am_range() {
        let mut am = AmModulator;
        assert_eq!(am.modulate(127), Complex8::new(127, 0));
        assert_eq!(am.modulate(0), Complex8::new(64, 0));
        assert_eq!(am.modulate(-128), Complex8::new(0, 0));
    }

    #[test]
    fn test_fm_delta_scaling() {
        // 2500 Hz deviation at the engine rate
        assert_eq!(FmModulator::delta_for(2500, BASEBAND_RATE), 54613);
        assert_eq!(FmModulator::delta_for(2500, 0), 0);
    }

    #[test]
    fn test_fm_silence_is_unmodulated_carrier() {
        let mut fm = FmModulator::new(5000, BASEBAND_RATE);
        for _ in 0..100 {
            assert_eq!(fm.modulate(0), Complex8::new(127, 0));
        }
    }

    #[test]
    fn test_fm_full_scale_deviation() {
        let mut fm = FmModulator::new(5000, BASEBAND_RATE);
        let hz = fm.fm_delta() as f64 * 128.0 * BASEBAND_RATE as f64 / 4_294_967_296.0;
        assert!((hz - 5000.0).abs() < 1.0);

        fm.modulate(-128);
        assert_eq!(fm.phase(), 0u32.wrapping_sub(128 * fm.fm_delta()));
    }

    #[quickcheck]
    fn prop_fm_constant_envelope(samples: Vec<i8>) -> bool {
        let mut fm = FmModulator::new(12_500, BASEBAND_RATE);
        samples.iter().all(|&s| {
            let iq = fm.modulate(s);
            let power = iq.re as i32 * iq.re as i32 + iq.im as i32 * iq.im as i32;
            (15_000..=16_400).contains(&power)
        })
    }

    #[test]
    fn test_kind_selection() {
        let kind = ModulatorKind::new(Modulation::Am, 5000, BASEBAND_RATE);
        assert_eq!(kind.modulation(), Modulation::Am);
        let kind = ModulatorKind::new(Modulation::Fm, 5000, BASEBAND_RATE);
        assert_eq!(kind.modulation(), Modulation::Fm);
    }
}
