//! Common utilities shared by the tools

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Initialize logging from the global verbosity flags
pub fn init_logging(verbose: bool, debug: bool) {
    let log_level = if debug {
        tracing::Level::DEBUG
    } else if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();
}

/// Load configuration from a JSON or TOML file
pub fn load_config<T: for<'a> Deserialize<'a>>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
        return serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path));
    }

    toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Save configuration as JSON or TOML depending on the extension
pub fn save_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
        serde_json::to_string_pretty(config)?
    } else {
        toml::to_string_pretty(config)?
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    Ok(())
}

/// Progress reporter for replays, logging every 10%
pub struct ProgressReporter {
    total: usize,
    current: usize,
    last_percent: u8,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            current: 0,
            last_percent: 0,
        }
    }

    pub fn update(&mut self, current: usize) {
        self.current = current.min(self.total);

        if self.total > 0 {
            let percent = ((self.current * 100) / self.total) as u8;
            if percent / 10 > self.last_percent / 10 {
                info!("Progress: {}%", percent);
                self.last_percent = percent;
            }
        }
    }

    pub fn percent(&self) -> u8 {
        self.last_percent
    }

    pub fn complete(&mut self) {
        info!("Complete: {}/{} bytes", self.current, self.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        rate: u32,
    }

    #[test]
    fn test_config_round_trip_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let sample = Sample {
            name: "replay".to_string(),
            rate: 48_000,
        };

        for file in ["session.json", "session.toml"] {
            let path = dir.path().join(file);
            save_config(&sample, &path).unwrap();
            let loaded: Sample = load_config(&path).unwrap();
            assert_eq!(loaded, sample);
        }

        let json = std::fs::read_to_string(dir.path().join("session.json")).unwrap();
        assert!(json.trim_start().starts_with('{'));
    }

    #[test]
    fn test_missing_config_reports_path() {
        let err = load_config::<Sample>(Path::new("/nonexistent/session.toml")).unwrap_err();
        assert!(err.to_string().contains("session.toml"));
    }

    #[test]
    fn test_progress_reporter() {
        let mut reporter = ProgressReporter::new(200);
        reporter.update(19);
        assert_eq!(reporter.percent(), 0);
        reporter.update(50);
        assert_eq!(reporter.percent(), 25);
        reporter.update(500);
        assert_eq!(reporter.current, 200);
        reporter.complete();
    }

    #[quickcheck]
    fn prop_progress_stays_within_total(updates: Vec<usize>) -> bool {
        let mut reporter = ProgressReporter::new(1_000);
        updates.into_iter().all(|current| {
            reporter.update(current);
            reporter.current <= 1_000 && reporter.percent() <= 100
        })
    }
}
