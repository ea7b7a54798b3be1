//! Diagnostics archive packaging
//!
//! Bundles the active log, a tail excerpt and an optional host environment report
//! into a single flat archive at a fixed path inside the log directory.

mod compress;
mod environment;

pub use compress::{CompressError, Compressor, ZipCommand};
pub use environment::{render_applications, ActiveApplication, EnvironmentProvider, HostEnvironment};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::logging::{report, Severity, StructuredSink};
use crate::paths::{self, EXCERPT_FILE_NAME};

/// Default length of the tail excerpt, in characters
pub const DEFAULT_EXCERPT_CHARS: usize = 12_000;

/// File name of the environment snapshot inside the archive
pub const SYSTEM_REPORT_FILE_NAME: &str = "system_report.txt";

/// File name of the running applications list inside the archive
pub const APPLICATIONS_FILE_NAME: &str = "active_applications.txt";

/// Suffix of the in-progress artifact, renamed over the final path on success
const PARTIAL_SUFFIX: &str = ".partial";

/// Get the trailing `max_chars` characters of `text`, or all of it when shorter
pub fn tail_excerpt(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    text.char_indices()
        .rev()
        .nth(max_chars - 1)
        .map(|(start, _)| &text[start..])
        .unwrap_or(text)
}

/// Builds diagnostics archives on demand
pub struct ArchiveBuilder {
    log_dir: PathBuf,
    excerpt_chars: usize,
    environment: Option<Arc<dyn EnvironmentProvider>>,
    compressor: Arc<dyn Compressor>,
    sink: Option<Arc<dyn StructuredSink>>,
}

impl ArchiveBuilder {
    /// Create a builder writing artifacts into `log_dir`
    pub fn new(log_dir: PathBuf, compressor: Arc<dyn Compressor>) -> Self {
        Self {
            log_dir,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            environment: None,
            compressor,
            sink: None,
        }
    }

    /// Set the tail excerpt length
    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    /// Include environment reports from the given provider
    pub fn with_environment(mut self, environment: Option<Arc<dyn EnvironmentProvider>>) -> Self {
        self.environment = environment;
        self
    }

    /// Report skipped steps and failures through `sink` instead of `tracing`
    pub fn with_sink(mut self, sink: Option<Arc<dyn StructuredSink>>) -> Self {
        self.sink = sink;
        self
    }

    fn report(&self, severity: Severity, text: &str) {
        report(self.sink.as_deref(), severity, text);
    }

    /// Final artifact path
    pub fn artifact_path(&self) -> PathBuf {
        paths::archive_path(&self.log_dir)
    }

    /// Transient staging directory
    pub fn staging_dir(&self) -> PathBuf {
        paths::staging_dir_path(&self.log_dir)
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self.artifact_path().into_os_string();
        name.push(PARTIAL_SUFFIX);
        PathBuf::from(name)
    }

    /// Package `log_file` into the archive artifact
    ///
    /// Returns `None` when the log file does not exist or any step fails. The
    /// staging directory is removed in every case, and an earlier artifact is
    /// only replaced once the new one is complete.
    pub fn build(&self, log_file: &Path) -> Option<PathBuf> {
        if !log_file.is_file() {
            debug!(path = %log_file.display(), "No active log file to archive");
            return None;
        }

        let staging = self.staging_dir();
        let partial = self.partial_path();

        let result = self.build_in(log_file, &staging, &partial);

        if let Err(e) = remove_dir_if_present(&staging) {
            self.report(
                Severity::Warning,
                &format!("Failed to remove staging directory {}: {}", staging.display(), e),
            );
        }
        if let Err(e) = remove_file_if_present(&partial) {
            self.report(
                Severity::Warning,
                &format!("Failed to remove partial archive {}: {}", partial.display(), e),
            );
        }

        match result {
            Ok(artifact) => {
                info!(path = %artifact.display(), "Built diagnostics archive");
                Some(artifact)
            }
            Err(e) => {
                self.report(
                    Severity::Error,
                    &format!("Failed to build diagnostics archive: {}", e),
                );
                None
            }
        }
    }

    fn build_in(&self, log_file: &Path, staging: &Path, partial: &Path) -> Result<PathBuf> {
        remove_dir_if_present(staging).map_err(|source| staging_error(staging, source))?;
        remove_file_if_present(partial).map_err(|source| staging_error(partial, source))?;
        fs::create_dir_all(staging).map_err(|source| staging_error(staging, source))?;

        let file_name = log_file
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("current.log"));
        fs::copy(log_file, staging.join(file_name))
            .map_err(|source| staging_error(log_file, source))?;

        if let Err(e) = write_excerpt(log_file, &staging.join(EXCERPT_FILE_NAME), self.excerpt_chars) {
            self.report(Severity::Warning, &format!("Skipping log excerpt: {}", e));
        }

        if let Some(environment) = &self.environment {
            if let Err(e) = write_environment_report(environment.as_ref(), staging) {
                self.report(Severity::Warning, &format!("Skipping environment report: {}", e));
            }
        }

        let files = staged_files(staging).map_err(|source| staging_error(staging, source))?;
        self.compressor.compress(&files, partial)?;

        let artifact = self.artifact_path();
        fs::rename(partial, &artifact).map_err(|source| staging_error(&artifact, source))?;

        Ok(artifact)
    }
}

fn staging_error(path: &Path, source: io::Error) -> Error {
    Error::Staging {
        path: path.to_path_buf(),
        source,
    }
}

fn write_excerpt(log_file: &Path, destination: &Path, max_chars: usize) -> io::Result<()> {
    let bytes = fs::read(log_file)?;
    let text = String::from_utf8_lossy(&bytes);
    fs::write(destination, tail_excerpt(&text, max_chars))
}

fn write_environment_report(environment: &dyn EnvironmentProvider, staging: &Path) -> io::Result<()> {
    fs::write(staging.join(SYSTEM_REPORT_FILE_NAME), environment.snapshot())?;
    let apps = render_applications(&environment.active_applications());
    fs::write(staging.join(APPLICATIONS_FILE_NAME), apps)
}

/// Regular files directly inside `dir`, sorted by name
fn staged_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn remove_dir_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn remove_file_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
