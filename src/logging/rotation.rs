//! Size-based rotation of the active log file
//!
//! Runs on the writer thread right before each append, so rotation never
//! interleaves with a write to the same file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use super::entry::Severity;
use super::file_writer::ActiveFile;
use super::sink::{report, StructuredSink};
use crate::error::{Error, Result};
use crate::paths;

/// Default size threshold in bytes
pub const DEFAULT_MAX_FILE_BYTES: u64 = 4_000_000;

/// When and where the active file is rotated
#[derive(Debug, Clone)]
pub(crate) struct RotationPolicy {
    max_file_bytes: u64,
    app_name: String,
}

impl RotationPolicy {
    pub(crate) fn new(app_name: impl Into<String>, max_file_bytes: u64) -> Self {
        Self {
            max_file_bytes,
            app_name: app_name.into(),
        }
    }

    /// True when the file exists and is strictly larger than the threshold
    pub(crate) fn needs_rotation(&self, path: &Path) -> bool {
        fs::metadata(path)
            .map(|meta| meta.len() > self.max_file_bytes)
            .unwrap_or(false)
    }

    /// Rotate if the threshold is exceeded
    ///
    /// Failures are reported through `sink` and swallowed; the next write
    /// re-acquires the handle. Returns the backup path when a rotation happened.
    pub(crate) fn check(
        &self,
        active: &mut ActiveFile,
        now: &DateTime<Local>,
        sink: Option<&dyn StructuredSink>,
    ) -> Option<PathBuf> {
        if !self.needs_rotation(active.path()) {
            return None;
        }

        match self.rotate(active, now) {
            Ok(backup) => {
                debug!(backup = %backup.display(), "Rotated log file");
                Some(backup)
            }
            Err(e) => {
                report(sink, Severity::Warning, &format!("Log rotation failed: {}", e));
                None
            }
        }
    }

    /// Move the active file to a timestamped backup and start a fresh one
    pub(crate) fn rotate(&self, active: &mut ActiveFile, now: &DateTime<Local>) -> Result<PathBuf> {
        let dir = active.path().parent().unwrap_or(Path::new("."));
        let backup = paths::backup_file_path(dir, &self.app_name, now);

        active.close();

        // Last rotation within the same second wins
        if backup.exists() {
            fs::remove_file(&backup).map_err(|source| Error::Rotation {
                path: backup.clone(),
                source,
            })?;
        }

        fs::rename(active.path(), &backup).map_err(|source| Error::Rotation {
            path: active.path().to_path_buf(),
            source,
        })?;

        active.reopen().map_err(|source| Error::Rotation {
            path: active.path().to_path_buf(),
            source,
        })?;

        Ok(backup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 21, 14, 30, 45).unwrap()
    }

    #[test]
    fn test_no_rotation_below_threshold() {
        let temp_dir = TempDir::new().unwrap();
        let mut active = ActiveFile::new(temp_dir.path().join("App.log"));
        active.append("short line\n").unwrap();

        let policy = RotationPolicy::new("App", 1000);
        assert!(policy.check(&mut active, &fixed_time(), None).is_none());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_file_is_not_rotated() {
        let temp_dir = TempDir::new().unwrap();
        let mut active = ActiveFile::new(temp_dir.path().join("App.log"));

        let policy = RotationPolicy::new("App", 0);
        assert!(policy.check(&mut active, &fixed_time(), None).is_none());
        assert!(!active.path().exists());
    }

    #[test]
    fn test_rotation_moves_contents_to_backup() {
        let temp_dir = TempDir::new().unwrap();
        let mut active = ActiveFile::new(temp_dir.path().join("App.log"));
        let payload = "x".repeat(1500);
        active.append(&payload).unwrap();

        let policy = RotationPolicy::new("App", 1000);
        let backup = policy.check(&mut active, &fixed_time(), None).unwrap();

        assert_eq!(backup, temp_dir.path().join("App_2026-01-21_14-30-45.log"));
        assert!(fs::metadata(&backup).unwrap().len() >= 1000);
        assert_eq!(fs::metadata(active.path()).unwrap().len(), 0);

        // Fresh handle appends from offset zero
        active.append("after\n").unwrap();
        assert_eq!(fs::read_to_string(active.path()).unwrap(), "after\n");
    }

    #[test]
    fn test_rotation_replaces_backup_with_same_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let backup = temp_dir.path().join("App_2026-01-21_14-30-45.log");
        fs::write(&backup, "stale backup").unwrap();

        let mut active = ActiveFile::new(temp_dir.path().join("App.log"));
        active.append(&"y".repeat(200)).unwrap();

        let policy = RotationPolicy::new("App", 100);
        policy.rotate(&mut active, &fixed_time()).unwrap();

        assert_eq!(fs::read_to_string(&backup).unwrap(), "y".repeat(200));
        let backups = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| paths::is_backup_file_name(&e.file_name().to_string_lossy(), "App"))
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_failed_rotation_is_reported_and_writes_continue() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory squatting on the backup name cannot be removed as a file
        let backup = temp_dir.path().join("App_2026-01-21_14-30-45.log");
        fs::create_dir_all(backup.join("occupied")).unwrap();

        let mut active = ActiveFile::new(temp_dir.path().join("App.log"));
        active.append(&"z".repeat(200)).unwrap();

        let sink = RecordingSink::default();
        let policy = RotationPolicy::new("App", 100);
        let sink_ref: &dyn StructuredSink = &sink;
        assert!(policy.check(&mut active, &fixed_time(), Some(sink_ref)).is_none());

        let reported = sink.lines();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].0, Severity::Warning);
        assert!(reported[0].1.contains("[WARN] Log rotation failed"));
        assert!(backup.is_dir());

        active.append("still writing\n").unwrap();
        let content = fs::read_to_string(active.path()).unwrap();
        assert_eq!(content, format!("{}still writing\n", "z".repeat(200)));
    }
}
