//! Serialized file logging for InsightLog
//!
//! Provides the logger service, line rendering, size-based rotation, backup
//! retention and the structured sink lines are mirrored to.

mod entry;
mod file_writer;
mod logger;
mod retention;
mod rotation;
mod sink;

pub use entry::{LogEntry, Severity};
pub use logger::{Logger, LoggerBuilder};
pub use retention::{cleanup_old_backups, DEFAULT_RETENTION_DAYS};
pub use rotation::DEFAULT_MAX_FILE_BYTES;
pub use sink::{StructuredSink, TracingSink};
pub(crate) use sink::report;
