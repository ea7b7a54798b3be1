//! Structured log sink
//!
//! Every line written to the log file is mirrored to a structured sink at the
//! matching severity. The default sink forwards to `tracing`.

use super::entry::{LogEntry, Severity};

/// Destination that receives each rendered line alongside the log file
pub trait StructuredSink: Send + Sync {
    /// Forward a rendered line at the given severity
    fn emit(&self, severity: Severity, line: &str);
}

/// Sink that forwards lines to the `tracing` dispatcher under the `insightlog` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StructuredSink for TracingSink {
    fn emit(&self, severity: Severity, line: &str) {
        let line = line.trim_end();
        let tag = severity.tag();
        match severity {
            Severity::Trace => tracing::trace!(target: "insightlog", severity = tag, "{}", line),
            Severity::Info | Severity::Notice => {
                tracing::info!(target: "insightlog", severity = tag, "{}", line)
            }
            Severity::Warning => tracing::warn!(target: "insightlog", severity = tag, "{}", line),
            Severity::Error | Severity::Critical => {
                tracing::error!(target: "insightlog", severity = tag, "{}", line)
            }
        }
    }
}

/// Report an internal failure through the sink, or `tracing` when none is installed
pub(crate) fn report(sink: Option<&dyn StructuredSink>, severity: Severity, text: &str) {
    match sink {
        Some(sink) => sink.emit(severity, &LogEntry::new(severity, text).render()),
        None if severity >= Severity::Error => tracing::error!("{}", text),
        None => tracing::warn!("{}", text),
    }
}

/// Best-effort console write used when the file or the sink is unavailable
pub(crate) fn console_fallback(line: &str) {
    use std::io::Write;

    let _ = std::io::stderr().lock().write_all(line.as_bytes());
}
