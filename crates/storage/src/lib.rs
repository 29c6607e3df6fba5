//! Storage Layer
//!
//! Provides the append-only per-frame session log and session statistics.

mod session_log;
mod stats;

pub use session_log::{log_file_name, LogConfig, LogRecord, SessionLog, HEADER};
pub use stats::SessionStats;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
