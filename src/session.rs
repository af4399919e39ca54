//! Run session and audit log
//!
//! Every run is bracketed in the audit log by a start block and a closing
//! block with the totals. The closing block is written by `finish`, or by
//! `Drop` when the session is abandoned early.

use chrono::{DateTime, Local};
use langtag_core::{MediaTrackCandidate, Outcome, Result};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, warn};

const SEPARATOR_WIDTH: usize = 50;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only audit log file
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: File,
}

impl AuditLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line and flush it
    pub fn append(&mut self, line: &str) -> Result<()> {
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    fn separator(&mut self) -> Result<()> {
        self.append(&"=".repeat(SEPARATOR_WIDTH))
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub elapsed: Duration,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }
}

/// One batch invocation
#[derive(Debug)]
pub struct RunSession {
    audit: AuditLog,
    started_at: DateTime<Local>,
    started: Instant,
    processed: usize,
    skipped: usize,
    failed: usize,
    closed: bool,
}

impl RunSession {
    /// Open the audit log and write the start block
    pub fn start(log_path: &Path) -> Result<Self> {
        let mut audit = AuditLog::open(log_path)?;
        let started_at = Local::now();

        audit.separator()?;
        audit.append(&format!("Run started at {}", started_at.format(TIMESTAMP_FORMAT)))?;
        audit.separator()?;

        Ok(Self {
            audit,
            started_at,
            started: Instant::now(),
            processed: 0,
            skipped: 0,
            failed: 0,
            closed: false,
        })
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn log_path(&self) -> &Path {
        self.audit.path()
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Count a candidate that reached its terminal outcome and write its
    /// audit line. The counter is bumped even if the write fails.
    pub fn record(&mut self, candidate: &MediaTrackCandidate) -> Result<()> {
        match candidate.outcome() {
            Outcome::Corrected => self.processed += 1,
            Outcome::SkippedUnsupportedContainer | Outcome::SkippedValidLanguage => {
                self.skipped += 1
            }
            Outcome::DetectionFailed | Outcome::CorrectionFailed => self.failed += 1,
            Outcome::Pending => {
                warn!(
                    "Recording {} without a terminal outcome",
                    candidate.human_label()
                );
            }
        }
        self.audit.append(&candidate.audit_line())
    }

    /// Write the closing block and return the totals
    pub fn finish(mut self) -> Result<RunSummary> {
        let summary = self.summary();
        self.write_closing_block(&summary)?;
        self.closed = true;
        Ok(summary)
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            started_at: self.started_at,
            finished_at: Local::now(),
            elapsed: self.started.elapsed(),
            processed: self.processed,
            skipped: self.skipped,
            failed: self.failed,
        }
    }

    fn write_closing_block(&mut self, summary: &RunSummary) -> Result<()> {
        self.audit.separator()?;
        self.audit.append(&format!(
            "Run completed at {}",
            summary.finished_at.format(TIMESTAMP_FORMAT)
        ))?;
        self.audit.append(&format!(
            "Processed: {}, Skipped: {}, Failed: {}",
            summary.processed, summary.skipped, summary.failed
        ))?;
        self.audit.append(&format!(
            "Total runtime: {:.2} seconds",
            summary.elapsed.as_secs_f64()
        ))?;
        self.audit.separator()?;
        self.audit.append("")
    }
}

impl Drop for RunSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let summary = self.summary();
        if let Err(e) = self.write_closing_block(&summary) {
            error!("Failed to close audit log {}: {}", self.audit.path().display(), e);
        }
    }
}
