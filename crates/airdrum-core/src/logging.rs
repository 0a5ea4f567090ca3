//! Logging configuration
//!
//! The subscriber itself is installed by the host binary; this module only
//! carries the settings and the log file housekeeping.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use tracing::Level;

const LOG_FILE_PREFIX: &str = "airdrum_";
const LOG_FILE_SUFFIX: &str = ".log";

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level name: trace, debug, info, warn or error
    pub level: String,
    /// Log to stderr
    pub console_output: bool,
    /// Log to a file under `log_dir`
    pub file_output: bool,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Number of log files kept by [`cleanup_old_logs`](Self::cleanup_old_logs)
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from("logs"),
            max_files: 10,
        }
    }
}

impl LogConfig {
    /// Configured level, `INFO` if the name is not recognised
    pub fn parse_level(&self) -> Level {
        self.level.trim().parse().unwrap_or(Level::INFO)
    }

    /// Create the log directory when file output is enabled
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            std::fs::create_dir_all(&self.log_dir)?;
        }
        Ok(())
    }

    /// Path of the log file for a session started now
    pub fn current_log_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        self.log_dir
            .join(format!("{}{}{}", LOG_FILE_PREFIX, stamp, LOG_FILE_SUFFIX))
    }

    /// Delete the oldest log files so that at most `max_files - 1` remain,
    /// leaving room for the file about to be created. Returns how many were
    /// removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.file_output || !self.log_dir.is_dir() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = std::fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(LOG_FILE_SUFFIX))
                    .unwrap_or(false)
            })
            .collect();

        let keep = self.max_files.saturating_sub(1);
        if logs.len() <= keep {
            return Ok(0);
        }

        // Timestamped names sort chronologically
        logs.sort();
        let excess = logs.len() - keep;
        for path in &logs[..excess] {
            std::fs::remove_file(path)?;
        }
        Ok(excess)
    }
}
