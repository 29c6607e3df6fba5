//! CSV session log

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use dms::FrameResult;

use crate::StorageError;

/// Column order is fixed for compatibility with existing logs
pub const HEADER: &str = "Timestamp,EAR,EyeState,EyesDetected,Drowsy,Blinks";

/// Log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Write a CSV log for the session
    pub enabled: bool,
    /// Directory the log file is created in
    pub directory: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("."),
        }
    }
}

/// One row of the session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub ear: f32,
    pub eye_state: String,
    pub eyes_detected: usize,
    pub drowsy: bool,
    pub blinks: u32,
}

impl LogRecord {
    pub fn from_result(result: &FrameResult, timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            ear: result.ear,
            eye_state: result.eye_state.as_str().to_string(),
            eyes_detected: result.eyes_detected,
            drowsy: result.is_drowsy,
            blinks: result.blink_count,
        }
    }

    /// CSV line without the trailing newline
    pub fn to_csv(&self) -> String {
        format!(
            "{},{:.3},{},{},{},{}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.ear,
            self.eye_state,
            self.eyes_detected,
            if self.drowsy { "True" } else { "False" },
            self.blinks
        )
    }
}

/// `drowsiness_YYYYmmdd_HHMMSS.csv`
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("drowsiness_{}.csv", started.format("%Y%m%d_%H%M%S"))
}

/// Append-only CSV writer; every row is flushed before `append` returns
pub struct SessionLog<W: Write> {
    out: W,
    path: Option<PathBuf>,
    rows: u64,
}

impl SessionLog<BufWriter<File>> {
    /// Create a new log file in `directory`
    pub fn create(directory: &Path, started: DateTime<Local>) -> Result<Self, StorageError> {
        let path = directory.join(log_file_name(started));
        let file = File::create(&path)?;
        let mut log = Self::new(BufWriter::new(file))?;
        info!("Log: {}", path.display());
        log.path = Some(path);
        Ok(log)
    }
}

impl<W: Write> SessionLog<W> {
    /// Wrap a writer and emit the header
    pub fn new(mut out: W) -> Result<Self, StorageError> {
        writeln!(out, "{}", HEADER)?;
        out.flush()?;
        Ok(Self {
            out,
            path: None,
            rows: 0,
        })
    }

    pub fn append(&mut self, record: &LogRecord) -> Result<(), StorageError> {
        writeln!(self.out, "{}", record.to_csv())?;
        self.out.flush()?;
        self.rows += 1;
        debug!("Logged row {}", self.rows);
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
