//! Error types for the diagnostics logger

use std::io;
use std::path::PathBuf;

use crate::archive::CompressError;

/// Result type for logger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while writing, rotating or archiving logs
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to create log directory
    #[error("Failed to create log directory at {path}: {source}")]
    CreateDirectory {
        /// The path that failed to be created
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Failed to rotate the active log file
    #[error("Failed to rotate log file {path}: {source}")]
    Rotation {
        /// The path involved in the failing step
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Failed to prepare a file in the archive staging directory
    #[error("Failed to stage {path} for archiving: {source}")]
    Staging {
        /// The path that could not be staged
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Compression utility missing or failed
    #[error(transparent)]
    Compress(#[from] CompressError),

    /// The writer thread could not be started
    #[error("Failed to spawn log writer thread: {0}")]
    WriterSpawn(io::Error),

    /// Unrecognised severity name
    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),
}
