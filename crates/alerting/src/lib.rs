//! Alerting System
//!
//! Drives the drowsiness alarm: sounds it while the DMS trigger flag is set
//! and the driver is drowsy, stops it after the alarm duration or once the
//! driver is awake, and routes it to a sound output.

mod alarm;
mod sink;

pub use alarm::{stop_reason, AlarmConfig, AlarmController, AlarmEvent, StopReason};
pub use sink::{AlarmSink, LogSink, RecordingSink, TerminalBell};

use thiserror::Error;

/// Alarm output errors
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("Alarm output failed: {0}")]
    Output(#[from] std::io::Error),
}
