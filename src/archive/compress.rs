//! Compression collaborator
//!
//! The archive builder treats compression as a black box: a list of files goes
//! in, a single flat archive comes out at the destination path.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Errors reported by a compressor
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    /// The utility is missing or not executable
    #[error("Compression utility `{program}` not found or not executable")]
    NotFound {
        /// Program that was invoked
        program: String,
    },

    /// The utility ran and exited unsuccessfully
    #[error("Compression utility `{program}` failed with exit code {code}: {stderr}")]
    Failed {
        /// Program that was invoked
        program: String,
        /// Exit code, or -1 when terminated by a signal
        code: i32,
        /// Trimmed standard error output
        stderr: String,
    },

    /// The utility could not be started for another reason
    #[error("Failed to run compression utility `{program}`: {source}")]
    Spawn {
        /// Program that was invoked
        program: String,
        /// The underlying error
        source: io::Error,
    },
}

/// Packs files into a single archive
pub trait Compressor: Send + Sync {
    /// Compress `files` into `destination`, without preserving directory structure
    fn compress(&self, files: &[PathBuf], destination: &Path) -> Result<(), CompressError>;
}

/// Compressor that shells out to the `zip` command-line utility
#[derive(Debug, Clone)]
pub struct ZipCommand {
    program: String,
}

impl ZipCommand {
    /// Use the given executable name or path
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Get the executable this compressor invokes
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ZipCommand {
    fn default() -> Self {
        Self::new("zip")
    }
}

impl Compressor for ZipCommand {
    fn compress(&self, files: &[PathBuf], destination: &Path) -> Result<(), CompressError> {
        tracing::debug!(
            program = %self.program,
            destination = %destination.display(),
            files = files.len(),
            "Compressing files"
        );

        // -j junks paths so the archive stays flat
        let output = Command::new(&self.program)
            .arg("-q")
            .arg("-j")
            .arg(destination)
            .args(files)
            .output()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    CompressError::NotFound {
                        program: self.program.clone(),
                    }
                }
                _ => CompressError::Spawn {
                    program: self.program.clone(),
                    source,
                },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompressError::Failed {
                program: self.program.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}
