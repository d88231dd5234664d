//! Running level statistics reported to the status channel

use crate::buffer::Complex16;
use serde::{Deserialize, Serialize};

/// Interval between statistics reports, in seconds of signal
const UPDATE_INTERVAL: f32 = 0.1;

/// Power ratio (magnitude squared, full scale = 1.0) to dB
pub fn mag2_to_dbv_norm(mag2: f32) -> f32 {
    10.0 * mag2.max(1e-12).log10()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioStatistics {
    pub rms_db: f32,
    pub max_db: f32,
    pub count: usize,
}

/// Accumulates audio power until a report interval has elapsed
#[derive(Debug, Clone, Default)]
pub struct AudioStatsCollector {
    squared_sum: f32,
    max_squared: f32,
    count: usize,
}

impl AudioStatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed normalised samples; returns a report once per interval
    pub fn feed(&mut self, samples: &[f32], sample_rate: u32) -> Option<AudioStatistics> {
        for sample in samples {
            let squared = sample * sample;
            self.squared_sum += squared;
            self.max_squared = self.max_squared.max(squared);
        }
        self.count += samples.len();

        let samples_per_update = (sample_rate as f32 * UPDATE_INTERVAL) as usize;
        if self.count < samples_per_update.max(1) {
            return None;
        }

        let statistics = AudioStatistics {
            rms_db: mag2_to_dbv_norm(self.squared_sum / self.count as f32),
            max_db: mag2_to_dbv_norm(self.max_squared),
            count: self.count,
        };
        *self = Self::default();
        Some(statistics)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatistics {
    pub max_db: i32,
    pub count: usize,
}

/// Tracks peak channel power until a report interval has elapsed
#[derive(Debug, Clone, Default)]
pub struct ChannelStatsCollector {
    max_squared: u32,
    count: usize,
}

impl ChannelStatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, samples: &[Complex16], sample_rate: u32) -> Option<ChannelStatistics> {
        for sample in samples {
            self.max_squared = self.max_squared.max(sample.norm_sqr());
        }
        self.count += samples.len();

        let samples_per_update = (sample_rate as f32 * UPDATE_INTERVAL) as usize;
        if self.count < samples_per_update.max(1) {
            return None;
        }

        let max_db = mag2_to_dbv_norm(self.max_squared as f32 / (32768.0 * 32768.0));
        let statistics = ChannelStatistics {
            max_db: max_db.round() as i32,
            count: self.count,
        };
        *self = Self::default();
        Some(statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_conversion() {
        assert!((mag2_to_dbv_norm(1.0)).abs() < 1e-6);
        assert!((mag2_to_dbv_norm(0.01) + 20.0).abs() < 1e-4);
        assert!(mag2_to_dbv_norm(0.0).is_finite());
    }

    #[test]
    fn test_audio_stats_interval() {
        let mut stats = AudioStatsCollector::new();
        let block = [0.5f32; 32];

        // 4800 samples at 48 kHz per report
        for _ in 0..149 {
            assert!(stats.feed(&block, 48000).is_none());
        }
        let report = stats.feed(&block, 48000).unwrap();
        assert_eq!(report.count, 4800);
        assert!((report.rms_db - mag2_to_dbv_norm(0.25)).abs() < 1e-3);
        assert!((report.max_db - report.rms_db).abs() < 1e-3);

        assert!(stats.feed(&block, 48000).is_none());
    }

    #[test]
    fn test_channel_stats_full_scale() {
        let mut stats = ChannelStatsCollector::new();
        let bins = [Complex16::new(i16::MIN, 0); 256];
        let report = stats.feed(&bins, 2560).unwrap();
        assert_eq!(report.max_db, 0);
        assert_eq!(report.count, 256);
    }
}
