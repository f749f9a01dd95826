//! Append-only audit log.
//!
//! One line per event, `<YYYY-MM-DD HH:MM:SS> <LEVEL>: <message>`, local
//! time. Write failures are reported through tracing and otherwise ignored:
//! the audit trail never decides the outcome of a run.

use chrono::{DateTime, Local};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditLevel::Info => "INFO",
            AuditLevel::Warn => "WARN",
            AuditLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.record(AuditLevel::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.record(AuditLevel::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.record(AuditLevel::Error, message.as_ref());
    }

    pub fn record(&self, level: AuditLevel, message: &str) {
        let line = format_line(Local::now(), level, message);
        if let Err(e) = self.append(&line) {
            tracing::warn!(
                audit_log = %self.path.display(),
                error = ?e,
                "Failed to append audit line"
            );
        }
    }

    fn append(&self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

pub fn format_line(at: DateTime<Local>, level: AuditLevel, message: &str) -> String {
    // Multi-line messages would break the one-event-per-line contract.
    let flattened = message.replace(['\r', '\n'], " ");
    format!("{} {}: {}", at.format("%Y-%m-%d %H:%M:%S"), level, flattened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn line_has_timestamp_level_and_message() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            format_line(at, AuditLevel::Error, "trigger rejected"),
            "2024-03-09 07:05:01 ERROR: trigger rejected"
        );
    }

    #[test]
    fn newlines_are_flattened() {
        let at = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let line = format_line(at, AuditLevel::Info, "body:\nline two");
        assert_eq!(line, "2024-01-01 00:00:00 INFO: body: line two");
    }

    #[test]
    fn records_are_appended_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("nested").join("monitor.log"));
        log.info("first");
        log.warn("second");

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" INFO: first"));
        assert!(lines[1].ends_with(" WARN: second"));
    }

    #[test]
    fn unwritable_audit_log_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for append.
        let log = AuditLog::new(dir.path());
        log.error("lost");
    }
}
