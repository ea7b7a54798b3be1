//! Configuration for the diagnostics logger

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::archive::DEFAULT_EXCERPT_CHARS;
use crate::logging::{DEFAULT_MAX_FILE_BYTES, DEFAULT_RETENTION_DAYS};
use crate::paths;

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Application name, used for the log directory and file names
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Log directory override (default: platform log directory for `app_name`)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Active file size in bytes above which it is rotated (default: 4,000,000)
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Characters kept in the archive's tail excerpt (default: 12,000)
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    /// Lines that may wait for the writer thread before producers fall back to stderr
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Rotated backups older than this many days are deleted at startup (0 disables)
    #[serde(default = "default_backup_retention_days")]
    pub backup_retention_days: u64,

    /// Executable used to build archives
    #[serde(default = "default_zip_program")]
    pub zip_program: String,
}

fn default_app_name() -> String {
    "InsightLog".to_string()
}

fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_FILE_BYTES
}

fn default_excerpt_chars() -> usize {
    DEFAULT_EXCERPT_CHARS
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_backup_retention_days() -> u64 {
    DEFAULT_RETENTION_DAYS
}

fn default_zip_program() -> String {
    "zip".to_string()
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            log_dir: None,
            max_file_bytes: default_max_file_bytes(),
            excerpt_chars: default_excerpt_chars(),
            queue_capacity: default_queue_capacity(),
            backup_retention_days: default_backup_retention_days(),
            zip_program: default_zip_program(),
        }
    }
}

impl LoggerConfig {
    /// Default configuration for the named application
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    /// Write logs to `dir` instead of the platform location
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Directory logs are written to
    pub fn resolved_log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| paths::directory_for(&self.app_name))
    }

    /// Load configuration from a TOML file, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}
