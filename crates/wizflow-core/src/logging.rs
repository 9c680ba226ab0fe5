//! Logging configuration
//!
//! Consumed by the binary's logging bootstrap. The bridge itself only emits
//! `tracing` events; where they go (console, file, both) is decided here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Mirror log output to stderr.
    pub console_output: bool,
    /// Write log output to a file under `log_dir`.
    pub file_output: bool,
    /// Directory for log files.
    pub log_dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl LogConfig {
    /// Parse the configured level, falling back to INFO on nonsense.
    pub fn parse_level(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::INFO)
    }

    /// Path of the current log file.
    pub fn current_log_path(&self) -> PathBuf {
        self.log_dir.join("wizflow.log")
    }

    /// Create the log directory if missing.
    pub fn ensure_log_directory(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.log_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), LevelFilter::INFO);

        config.level = "debug".to_string();
        assert_eq!(config.parse_level(), LevelFilter::DEBUG);

        config.level = "not-a-level".to_string();
        assert_eq!(config.parse_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_log_path_under_dir() {
        let config = LogConfig {
            log_dir: PathBuf::from("/tmp/wizflow-logs"),
            ..Default::default()
        };
        assert_eq!(
            config.current_log_path(),
            PathBuf::from("/tmp/wizflow-logs/wizflow.log")
        );
    }
}
