//! Serialized log writer
//!
//! A single background thread owns the active log file. Producers hand rendered
//! lines over a bounded channel and return immediately; the thread applies them
//! one at a time, in the order they were queued.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Local;
use tracing::{debug, warn};

use super::entry::Severity;
use super::rotation::RotationPolicy;
use super::sink::{console_fallback, StructuredSink};
use crate::error::{Error, Result};

/// Commands processed by the writer thread
#[derive(Debug)]
pub(crate) enum WriterCommand {
    /// Append a rendered line
    Write { severity: Severity, line: String },
    /// Acknowledge once every earlier command has been applied
    Flush(mpsc::Sender<()>),
    /// Stop after draining earlier commands
    Shutdown,
}

/// The active log file and its lazily opened handle
///
/// The handle is opened read/write rather than in append mode, so every write
/// seeks to the end first.
#[derive(Debug)]
pub(crate) struct ActiveFile {
    path: PathBuf,
    file: Option<File>,
}

impl ActiveFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Return the open handle, (re)opening it if absent or if the file was removed
    fn ensure_open(&mut self) -> io::Result<&mut File> {
        let file = match self.file.take() {
            Some(file) if self.path.exists() => file,
            stale => {
                if stale.is_some() {
                    debug!(path = %self.path.display(), "Active log file disappeared, reopening");
                }
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&self.path)?
            }
        };
        Ok(self.file.insert(file))
    }

    /// Drop the handle
    pub(crate) fn close(&mut self) {
        self.file = None;
    }

    /// Recreate the file if needed and position the handle at its end
    pub(crate) fn reopen(&mut self) -> io::Result<()> {
        self.close();
        let file = self.ensure_open()?;
        file.seek(SeekFrom::End(0))?;
        Ok(())
    }

    /// Seek to the end, append the bytes and force them to stable storage
    pub(crate) fn append(&mut self, line: &str) -> io::Result<()> {
        let file = self.ensure_open()?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(line.as_bytes())?;
        file.sync_data()
    }
}

/// Writer state owned by the background thread
struct LogWriter {
    commands: mpsc::Receiver<WriterCommand>,
    active: ActiveFile,
    rotation: RotationPolicy,
    sink: Option<Arc<dyn StructuredSink>>,
}

impl LogWriter {
    fn run(mut self) {
        debug!(path = %self.active.path().display(), "Starting log writer thread");

        while let Ok(command) = self.commands.recv() {
            match command {
                WriterCommand::Write { severity, line } => self.write_line(severity, &line),
                WriterCommand::Flush(ack) => {
                    // Ignore error if the caller stopped waiting
                    let _ = ack.send(());
                }
                WriterCommand::Shutdown => break,
            }
        }

        self.active.close();
        debug!("Log writer thread stopped");
    }

    fn write_line(&mut self, severity: Severity, line: &str) {
        let opened = match self.active.ensure_open() {
            Ok(_) => true,
            Err(e) => {
                warn!(path = %self.active.path().display(), "Failed to open log file: {}", e);
                false
            }
        };

        if opened {
            self.rotation
                .check(&mut self.active, &Local::now(), self.sink.as_deref());
        }

        let delivered = match &self.sink {
            Some(sink) => {
                sink.emit(severity, line);
                true
            }
            None => false,
        };

        let written = opened
            && match self.active.append(line) {
                Ok(()) => true,
                Err(e) => {
                    warn!(path = %self.active.path().display(), "Failed to append to log file: {}", e);
                    self.active.close();
                    false
                }
            };

        if !(written && delivered) {
            console_fallback(line);
        }
    }
}

/// Start the writer thread
///
/// Returns the bounded sender producers submit to, and the thread handle.
pub(crate) fn spawn_writer(
    path: PathBuf,
    rotation: RotationPolicy,
    sink: Option<Arc<dyn StructuredSink>>,
    queue_capacity: usize,
) -> Result<(mpsc::SyncSender<WriterCommand>, JoinHandle<()>)> {
    let (sender, commands) = mpsc::sync_channel(queue_capacity.max(1));

    let writer = LogWriter {
        commands,
        active: ActiveFile::new(path),
        rotation,
        sink,
    };

    let handle = thread::Builder::new()
        .name("insightlog-writer".to_string())
        .spawn(move || writer.run())
        .map_err(Error::WriterSpawn)?;

    Ok((sender, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;
    use tempfile::TempDir;

    #[test]
    fn test_active_file_is_opened_lazily() {
        let temp_dir = TempDir::new().unwrap();
        let mut active = ActiveFile::new(temp_dir.path().join("App.log"));
        assert!(!active.path().exists());

        active.append("first\n").unwrap();
        assert_eq!(fs::read_to_string(active.path()).unwrap(), "first\n");
    }

    #[test]
    fn test_append_seeks_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("App.log");
        fs::write(&path, "existing\n").unwrap();

        let mut active = ActiveFile::new(path.clone());
        active.append("one\n").unwrap();
        active.append("two\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\none\ntwo\n");
    }

    #[test]
    fn test_handle_reacquired_after_external_removal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("App.log");
        let mut active = ActiveFile::new(path.clone());

        active.append("before\n").unwrap();
        fs::remove_file(&path).unwrap();
        active.append("after\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "after\n");
    }

    #[test]
    fn test_missing_parent_directory_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("App.log");
        let mut active = ActiveFile::new(path.clone());

        active.append("line\n").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_writer_applies_commands_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("App.log");
        let sink = Arc::new(RecordingSink::default());

        let (sender, handle) = spawn_writer(
            path.clone(),
            RotationPolicy::new("App", 1_000_000),
            Some(sink.clone() as Arc<dyn StructuredSink>),
            4,
        )
        .unwrap();

        for i in 0..20 {
            sender
                .send(WriterCommand::Write {
                    severity: Severity::Info,
                    line: format!("line {}\n", i),
                })
                .unwrap();
        }
        sender.send(WriterCommand::Shutdown).unwrap();
        handle.join().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let expected: String = (0..20).map(|i| format!("line {}\n", i)).collect();
        assert_eq!(content, expected);

        let recorded = sink.lines();
        assert_eq!(recorded.len(), 20);
        assert_eq!(recorded[0], (Severity::Info, "line 0\n".to_string()));
    }

    #[test]
    fn test_flush_acknowledges_after_earlier_writes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("App.log");

        let (sender, handle) =
            spawn_writer(path.clone(), RotationPolicy::new("App", 1_000_000), None, 16).unwrap();

        sender
            .send(WriterCommand::Write {
                severity: Severity::Error,
                line: "written before flush\n".to_string(),
            })
            .unwrap();

        let (ack_tx, ack_rx) = mpsc::channel();
        sender.send(WriterCommand::Flush(ack_tx)).unwrap();
        ack_rx.recv().unwrap();

        // Without a sink the line still reaches the file
        assert_eq!(fs::read_to_string(&path).unwrap(), "written before flush\n");

        sender.send(WriterCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_unopenable_path_falls_back_then_recovers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("App.log");
        fs::create_dir(&path).unwrap();
        let sink = Arc::new(RecordingSink::default());

        let (sender, handle) = spawn_writer(
            path.clone(),
            RotationPolicy::new("App", 1_000_000),
            Some(sink.clone() as Arc<dyn StructuredSink>),
            16,
        )
        .unwrap();

        sender
            .send(WriterCommand::Write {
                severity: Severity::Error,
                line: "while blocked\n".to_string(),
            })
            .unwrap();
        let (ack_tx, ack_rx) = mpsc::channel();
        sender.send(WriterCommand::Flush(ack_tx)).unwrap();
        ack_rx.recv().unwrap();

        // The line still reached the sink; the writer thread is alive
        assert!(path.is_dir());
        assert_eq!(sink.lines().len(), 1);

        fs::remove_dir(&path).unwrap();
        sender
            .send(WriterCommand::Write {
                severity: Severity::Info,
                line: "after recovery\n".to_string(),
            })
            .unwrap();
        sender.send(WriterCommand::Shutdown).unwrap();
        handle.join().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "after recovery\n");
        assert_eq!(sink.lines().len(), 2);
    }
}
