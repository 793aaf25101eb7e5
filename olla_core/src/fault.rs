//! Runtime faults and the persistent fault log.
//!
//! Fault reporting never fails outward: if the log file cannot be written,
//! the failure is logged through `tracing` and control continues.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::OllaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A channel kept filling past its `max_fill_time`.
    MaxFillTimeout,
    /// An error was raised while stepping a channel.
    SequenceFault,
}

impl FaultKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::MaxFillTimeout => "MaxFillTimeout",
            Self::SequenceFault => "SequenceFault",
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub channel: usize,
    pub message: String,
}

impl Fault {
    pub fn max_fill_timeout(channel: usize, elapsed_ms: u64) -> Self {
        Self {
            kind: FaultKind::MaxFillTimeout,
            channel,
            message: format!(
                "fill exceeded max_fill_time after {:.1}s",
                elapsed_ms as f64 / 1000.0
            ),
        }
    }

    pub fn sequence(channel: usize, err: &OllaError) -> Self {
        Self {
            kind: FaultKind::SequenceFault,
            channel,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} on channel {}: {}",
            self.kind, self.channel, self.message
        )
    }
}

/// Destination for fault records.
pub trait FaultSink {
    fn report(&mut self, at: NaiveDateTime, fault: &Fault);
}

impl<T: FaultSink + ?Sized> FaultSink for Box<T> {
    fn report(&mut self, at: NaiveDateTime, fault: &Fault) {
        (**self).report(at, fault)
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFaultSink;

impl FaultSink for NullFaultSink {
    fn report(&mut self, _at: NaiveDateTime, _fault: &Fault) {}
}

/// `[YYYY/MM/DD HH:MM:SS] <message>`
pub fn format_fault_line(at: NaiveDateTime, fault: &Fault) -> String {
    format!("[{}] {}", at.format("%Y/%m/%d %H:%M:%S"), fault)
}

/// Appends one line per fault to a text file.
#[derive(Debug, Clone)]
pub struct FileFaultLog {
    path: PathBuf,
}

impl FileFaultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{line}")?;
        f.flush()
    }
}

impl FaultSink for FileFaultLog {
    fn report(&mut self, at: NaiveDateTime, fault: &Fault) {
        let line = format_fault_line(at, fault);
        if let Err(e) = self.append(&line) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "failed to append fault log"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 1)
            .and_then(|d| d.and_hms_opt(8, 1, 2))
            .expect("valid date")
    }

    #[test]
    fn line_format() {
        let f = Fault::max_fill_timeout(0, 60_000);
        assert_eq!(
            format_fault_line(at(), &f),
            "[2025/05/01 08:01:02] MaxFillTimeout on channel 0: fill exceeded max_fill_time after 60.0s"
        );
    }

    #[test]
    fn appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faults.log");
        let mut log = FileFaultLog::new(&path);
        log.report(at(), &Fault::max_fill_timeout(1, 1500));
        let err = OllaError::Sensor {
            channel: 2,
            reason: "hardware error: read failed on pin 3".into(),
        };
        log.report(at(), &Fault::sequence(2, &err));
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[2025/05/01 08:01:02] MaxFillTimeout on channel 1"));
        assert!(lines[1].contains("SequenceFault on channel 2: sensor read failed"));
    }

    #[test]
    fn unwritable_path_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = FileFaultLog::new(dir.path().join("missing").join("faults.log"));
        log.report(at(), &Fault::max_fill_timeout(0, 1));
    }
}
