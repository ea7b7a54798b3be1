//! InsightLog - in-process diagnostics logging
//!
//! Serializes log lines from any number of threads into a rotating log file,
//! mirrors them to a structured sink, and packages recent logs with a host
//! environment report into a single shareable archive.

pub mod archive;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

#[cfg(test)]
mod test_support;

pub use archive::{ArchiveBuilder, CompressError};
pub use config::LoggerConfig;
pub use error::{Error, Result};
pub use logging::{Logger, LoggerBuilder, Severity};
