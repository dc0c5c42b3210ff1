//! Run log domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A log entry recorded against a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
        }
    }

    /// Unknown strings read back from storage fall back to `Info`
    pub fn parse(s: &str) -> LogLevel {
        match s {
            "Debug" => LogLevel::Debug,
            "Warning" => LogLevel::Warning,
            "Error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Append-only log owned by a single run
///
/// Lines record what the run observed from the external system: the start,
/// every status delivery and the final result.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, timestamp: DateTime<Utc>, level: LogLevel, message: impl Into<String>) {
        self.entries.push(LogEntry {
            timestamp,
            level,
            message: message.into(),
        });
    }

    pub fn info(&mut self, timestamp: DateTime<Utc>, message: impl Into<String>) {
        self.push(timestamp, LogLevel::Info, message);
    }

    pub fn warn(&mut self, timestamp: DateTime<Utc>, message: impl Into<String>) {
        self.push(timestamp, LogLevel::Warning, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_appends_in_order() {
        let now = Utc::now();
        let mut log = RunLog::new();
        log.info(now, "Started");
        log.warn(now, "Unknown pipeline status: weird");

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].message, "Started");
        assert_eq!(log.entries()[1].level, LogLevel::Warning);
    }

    #[test]
    fn test_level_parse_falls_back_to_info() {
        assert_eq!(LogLevel::parse("Error"), LogLevel::Error);
        assert_eq!(LogLevel::parse(LogLevel::Debug.as_str()), LogLevel::Debug);
        assert_eq!(LogLevel::parse("verbose"), LogLevel::Info);
    }
}
