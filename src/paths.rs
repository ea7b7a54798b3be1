//! Storage locations for the active log, its backups and archive artifacts
//!
//! Everything here is a pure path computation; creating directories is left to the caller.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone};

/// Name of the tail excerpt written into the staging directory
pub const EXCERPT_FILE_NAME: &str = "short_log.txt";

/// Name of the archive artifact inside the log directory
pub const ARCHIVE_FILE_NAME: &str = "insight_report.zip";

/// Name of the transient staging directory inside the log directory
pub const STAGING_DIR_NAME: &str = "report_temp";

/// Timestamp format used in backup file names
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Get the log directory for an application
///
/// On macOS this is `~/Library/Logs/<app_name>`. Other platforms, or a missing
/// home directory, fall back to `<temp dir>/<app_name>`.
pub fn directory_for(app_name: &str) -> PathBuf {
    platform_log_root()
        .unwrap_or_else(std::env::temp_dir)
        .join(app_name)
}

#[cfg(target_os = "macos")]
fn platform_log_root() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join("Library").join("Logs"))
}

#[cfg(not(target_os = "macos"))]
fn platform_log_root() -> Option<PathBuf> {
    None
}

/// Path of the active log file: `<dir>/<app_name>.log`
pub fn log_file_path(dir: &Path, app_name: &str) -> PathBuf {
    dir.join(format!("{}.log", app_name))
}

/// Path of a rotated backup: `<dir>/<app_name>_<YYYY-MM-DD_HH-MM-SS>.log`
pub fn backup_file_path<Tz: TimeZone>(
    dir: &Path,
    app_name: &str,
    timestamp: &DateTime<Tz>,
) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    dir.join(format!(
        "{}_{}.log",
        app_name,
        timestamp.format(BACKUP_TIMESTAMP_FORMAT)
    ))
}

/// Check whether a file name is a rotated backup of `app_name`
pub fn is_backup_file_name(name: &str, app_name: &str) -> bool {
    name.strip_prefix(app_name)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(".log"))
        .is_some_and(|stamp| NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT).is_ok())
}

/// Path of the archive artifact inside `dir`
pub fn archive_path(dir: &Path) -> PathBuf {
    dir.join(ARCHIVE_FILE_NAME)
}

/// Path of the staging directory inside `dir`
pub fn staging_dir_path(dir: &Path) -> PathBuf {
    dir.join(STAGING_DIR_NAME)
}
