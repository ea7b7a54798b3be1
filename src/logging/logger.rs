//! The diagnostics logger service
//!
//! A `Logger` is constructed explicitly and shared by reference (usually behind an
//! `Arc`). It owns its writer thread; dropping it drains the queue and joins the thread.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{error, info, warn};

use super::entry::{LogEntry, Severity};
use super::file_writer::{spawn_writer, WriterCommand};
use super::retention::cleanup_old_backups;
use super::rotation::RotationPolicy;
use super::sink::{console_fallback, StructuredSink, TracingSink};
use crate::archive::{ArchiveBuilder, Compressor, EnvironmentProvider, HostEnvironment, ZipCommand};
use crate::config::LoggerConfig;
use crate::error::{Error, Result};
use crate::paths;

/// Builder for a [`Logger`] with custom collaborators
pub struct LoggerBuilder {
    config: LoggerConfig,
    sink: Option<Arc<dyn StructuredSink>>,
    environment: Option<Arc<dyn EnvironmentProvider>>,
    compressor: Arc<dyn Compressor>,
}

impl LoggerBuilder {
    fn new(config: LoggerConfig) -> Self {
        let compressor = Arc::new(ZipCommand::new(config.zip_program.clone()));
        Self {
            config,
            sink: Some(Arc::new(TracingSink)),
            environment: HostEnvironment::detect()
                .map(|host| Arc::new(host) as Arc<dyn EnvironmentProvider>),
            compressor,
        }
    }

    /// Mirror lines to `sink` instead of `tracing`
    pub fn sink(mut self, sink: impl StructuredSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Do not mirror lines anywhere; they go to stderr alongside the file
    pub fn without_sink(mut self) -> Self {
        self.sink = None;
        self
    }

    /// Describe the host with `environment` in archives
    pub fn environment(mut self, environment: impl EnvironmentProvider + 'static) -> Self {
        self.environment = Some(Arc::new(environment));
        self
    }

    /// Leave environment reports out of archives
    pub fn without_environment(mut self) -> Self {
        self.environment = None;
        self
    }

    /// Build archives with `compressor` instead of the `zip` utility
    pub fn compressor(mut self, compressor: impl Compressor + 'static) -> Self {
        self.compressor = Arc::new(compressor);
        self
    }

    /// Create the log directory, prune expired backups and start the writer thread
    ///
    /// An unusable log directory is logged, not returned; lines then go to the
    /// sink and stderr until the directory becomes writable.
    pub fn build(self) -> Result<Logger> {
        let config = self.config;
        let log_dir = config.resolved_log_dir();

        if let Err(source) = std::fs::create_dir_all(&log_dir) {
            let e = Error::CreateDirectory {
                path: log_dir.clone(),
                source,
            };
            warn!("{}", e);
        }

        if config.backup_retention_days > 0 {
            match cleanup_old_backups(&log_dir, &config.app_name, config.backup_retention_days) {
                Ok(count) if count > 0 => info!("Cleaned up {} old log backups", count),
                Ok(_) => {}
                Err(e) => error!("Failed to clean up old log backups: {}", e),
            }
        }

        let log_path = paths::log_file_path(&log_dir, &config.app_name);
        let rotation = RotationPolicy::new(config.app_name.clone(), config.max_file_bytes);
        let (sender, worker) = spawn_writer(
            log_path.clone(),
            rotation,
            self.sink.clone(),
            config.queue_capacity,
        )?;

        let archive = ArchiveBuilder::new(log_dir.clone(), self.compressor)
            .with_excerpt_chars(config.excerpt_chars)
            .with_environment(self.environment)
            .with_sink(self.sink);

        Ok(Logger {
            sender,
            worker: Some(worker),
            log_dir,
            log_path,
            archive,
            dropped: AtomicU64::new(0),
        })
    }
}

/// In-process diagnostics logger
///
/// Logging calls render the line on the caller's thread, queue it and return.
/// A single writer thread applies queued lines to the log file in order.
pub struct Logger {
    sender: SyncSender<WriterCommand>,
    worker: Option<JoinHandle<()>>,
    log_dir: PathBuf,
    log_path: PathBuf,
    archive: ArchiveBuilder,
    dropped: AtomicU64,
}

impl Logger {
    /// Create a logger with the default collaborators
    pub fn new(config: LoggerConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start building a logger with custom collaborators
    pub fn builder(config: LoggerConfig) -> LoggerBuilder {
        LoggerBuilder::new(config)
    }

    /// Directory holding the active log, backups and archives
    pub fn log_directory(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the active log file
    pub fn log_file_path(&self) -> &Path {
        &self.log_path
    }

    /// Lines that went to stderr because the queue was full or closed
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queue a line at the given severity
    pub fn emit(&self, severity: Severity, text: impl Into<String>) {
        let line = LogEntry::new(severity, text).render();

        if let Err(err) = self.sender.try_send(WriterCommand::Write { severity, line }) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            let command = match err {
                TrySendError::Full(command) | TrySendError::Disconnected(command) => command,
            };
            if let WriterCommand::Write { line, .. } = command {
                console_fallback(&line);
            }
        }
    }

    /// Queue a line at TRACE severity
    pub fn trace(&self, text: impl Into<String>) {
        self.emit(Severity::Trace, text);
    }

    /// Queue a line at INFO severity
    pub fn info(&self, text: impl Into<String>) {
        self.emit(Severity::Info, text);
    }

    /// Queue a line at NOTICE severity
    pub fn notice(&self, text: impl Into<String>) {
        self.emit(Severity::Notice, text);
    }

    /// Queue a line at WARN severity
    pub fn warning(&self, text: impl Into<String>) {
        self.emit(Severity::Warning, text);
    }

    /// Queue a line at ERROR severity
    pub fn error(&self, text: impl Into<String>) {
        self.emit(Severity::Error, text);
    }

    /// Queue a line at CRITICAL severity
    pub fn critical(&self, text: impl Into<String>) {
        self.emit(Severity::Critical, text);
    }

    /// Block until every line queued before this call has been written and synced
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.sender.send(WriterCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Package the current log into the archive artifact
    ///
    /// Flushes pending lines first. Returns the artifact path, or `None` when there
    /// is no log file yet or any step failed (the failure is logged).
    pub fn build_archive(&self) -> Option<PathBuf> {
        self.flush();
        self.archive.build(&self.log_path)
    }

    /// [`build_archive`](Self::build_archive) on tokio's blocking thread pool
    pub async fn build_archive_async(self: Arc<Self>) -> Option<PathBuf> {
        match tokio::task::spawn_blocking(move || self.build_archive()).await {
            Ok(result) => result,
            Err(e) => {
                error!("Archive task failed: {}", e);
                None
            }
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let _ = self.sender.send(WriterCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                console_fallback("insightlog: log writer thread panicked\n");
            }
        }
    }
}
