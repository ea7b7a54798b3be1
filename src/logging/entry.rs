//! Severity model and log line rendering

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};

use crate::error::Error;

/// Severity of a log entry, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Every severity, in ascending order
    pub const ALL: [Severity; 6] = [
        Severity::Trace,
        Severity::Info,
        Severity::Notice,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Canonical tag written between brackets in each log line
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Severity {
    type Err = Error;

    /// Accepts either the tag or the full name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Severity::Trace),
            "INFO" => Ok(Severity::Info),
            "NOTICE" => Ok(Severity::Notice),
            "WARN" | "WARNING" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(Error::UnknownSeverity(s.to_string())),
        }
    }
}

/// A single log entry, captured at call time and rendered straight away
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Timestamp when the entry was created
    pub timestamp: DateTime<Local>,
    /// Severity
    pub severity: Severity,
    /// Message text
    pub text: String,
}

impl LogEntry {
    /// Create a new log entry stamped with the current time
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            severity,
            text: text.into(),
        }
    }

    /// Render as `<timestamp> [<TAG>] <text>\n`
    ///
    /// The timestamp carries milliseconds followed by a three-digit microsecond
    /// remainder, e.g. `2026-01-21 14:30:45.123.456`.
    pub fn render(&self) -> String {
        let micros = self.timestamp.timestamp_subsec_micros() % 1000;
        format!(
            "{}.{:03} [{}] {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            micros,
            self.severity.tag(),
            self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_every_severity_has_a_tag() {
        let tags: Vec<&str> = Severity::ALL.iter().map(|s| s.tag()).collect();
        assert_eq!(tags, ["TRACE", "INFO", "NOTICE", "WARN", "ERROR", "CRITICAL"]);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Notice < Severity::Warning);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("Warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn test_render_format() {
        let timestamp = Local
            .with_ymd_and_hms(2026, 1, 21, 14, 30, 45)
            .unwrap()
            + chrono::Duration::microseconds(123_456);
        let entry = LogEntry {
            timestamp,
            severity: Severity::Notice,
            text: "disk nearly full".to_string(),
        };

        assert_eq!(
            entry.render(),
            "2026-01-21 14:30:45.123.456 [NOTICE] disk nearly full\n"
        );
    }

    #[test]
    fn test_render_keeps_text_verbatim() {
        let entry = LogEntry::new(Severity::Warning, "a [bracketed] message");
        let line = entry.render();
        assert!(line.ends_with(" [WARN] a [bracketed] message\n"));
    }
}
